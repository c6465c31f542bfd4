//! Mock implementations for repository and collaborator traits
//!
//! In-memory implementations usable for unit testing without a real
//! database. `InMemoryRequestRepository::try_assign_provider` performs
//! the check and the write under one lock, so concurrent acceptance
//! tests observe the same mutual exclusion as the Postgres
//! implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use dispatch_domain::entities::{
    NewServiceRequest, Provider, ProviderStatus, RequestStatus, ServiceRequest,
};
use dispatch_domain::ports::{ContractGenerator, SettlementLedger};
use dispatch_domain::repositories::{ProviderRepository, RequestRepository};
use dispatch_errors::{DispatchError, DispatchResult};

/// Mock implementation of RequestRepository for testing
#[derive(Debug, Clone)]
pub struct InMemoryRequestRepository {
    requests: Arc<Mutex<HashMap<i64, ServiceRequest>>>,
    next_id: Arc<Mutex<i64>>,
}

impl InMemoryRequestRepository {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    pub fn with_requests(requests: Vec<ServiceRequest>) -> Self {
        let mut map = HashMap::new();
        let mut max_id = 0;
        for request in requests {
            if request.id > max_id {
                max_id = request.id;
            }
            map.insert(request.id, request);
        }
        Self {
            requests: Arc::new(Mutex::new(map)),
            next_id: Arc::new(Mutex::new(max_id + 1)),
        }
    }

    pub fn insert(&self, request: ServiceRequest) {
        self.requests.lock().unwrap().insert(request.id, request);
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Default for InMemoryRequestRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RequestRepository for InMemoryRequestRepository {
    async fn create(&self, request: &NewServiceRequest) -> DispatchResult<ServiceRequest> {
        let mut requests = self.requests.lock().unwrap();
        let mut next_id = self.next_id.lock().unwrap();

        let now = Utc::now();
        let created = ServiceRequest {
            id: *next_id,
            client_id: request.client_id,
            provider_id: None,
            service_type: request.service_type.clone(),
            description: request.description.clone(),
            address: request.address.clone(),
            lat: request.lat,
            lng: request.lng,
            geohash: request.geohash.clone(),
            urgent: request.urgent,
            status: RequestStatus::Published,
            created_at: now,
            updated_at: now,
        };
        *next_id += 1;
        requests.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> DispatchResult<Option<ServiceRequest>> {
        Ok(self.requests.lock().unwrap().get(&id).cloned())
    }

    async fn list_by_status(
        &self,
        status: RequestStatus,
        limit: i64,
    ) -> DispatchResult<Vec<ServiceRequest>> {
        let requests = self.requests.lock().unwrap();
        let mut matching: Vec<ServiceRequest> = requests
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.id);
        matching.truncate(limit as usize);
        Ok(matching)
    }

    async fn try_assign_provider(
        &self,
        request_id: i64,
        provider_id: i64,
    ) -> DispatchResult<Option<ServiceRequest>> {
        let mut requests = self.requests.lock().unwrap();
        match requests.get_mut(&request_id) {
            Some(request) if request.is_acceptable() => {
                request.provider_id = Some(provider_id);
                request.status = RequestStatus::Accepted;
                request.updated_at = Utc::now();
                Ok(Some(request.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn update_status_from(
        &self,
        request_id: i64,
        from: RequestStatus,
        to: RequestStatus,
    ) -> DispatchResult<Option<ServiceRequest>> {
        let mut requests = self.requests.lock().unwrap();
        match requests.get_mut(&request_id) {
            Some(request) if request.status == from => {
                request.status = to;
                request.updated_at = Utc::now();
                Ok(Some(request.clone()))
            }
            _ => Ok(None),
        }
    }
}

/// Mock implementation of ProviderRepository for testing
#[derive(Debug, Clone)]
pub struct InMemoryProviderRepository {
    providers: Arc<Mutex<HashMap<i64, Provider>>>,
}

impl InMemoryProviderRepository {
    pub fn new() -> Self {
        Self {
            providers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_providers(providers: Vec<Provider>) -> Self {
        let map = providers.into_iter().map(|p| (p.id, p)).collect();
        Self {
            providers: Arc::new(Mutex::new(map)),
        }
    }

    pub fn insert(&self, provider: Provider) {
        self.providers.lock().unwrap().insert(provider.id, provider);
    }

    fn update_with<F>(&self, id: i64, mutate: F) -> DispatchResult<Provider>
    where
        F: FnOnce(&mut Provider),
    {
        let mut providers = self.providers.lock().unwrap();
        let provider = providers
            .get_mut(&id)
            .ok_or_else(|| DispatchError::provider_not_found(id))?;
        mutate(provider);
        provider.updated_at = Utc::now();
        Ok(provider.clone())
    }
}

impl Default for InMemoryProviderRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderRepository for InMemoryProviderRepository {
    async fn get_by_id(&self, id: i64) -> DispatchResult<Option<Provider>> {
        Ok(self.providers.lock().unwrap().get(&id).cloned())
    }

    async fn list_ready(&self, limit: i64) -> DispatchResult<Vec<Provider>> {
        let providers = self.providers.lock().unwrap();
        let mut ready: Vec<Provider> = providers
            .values()
            .filter(|p| p.is_dispatchable())
            .cloned()
            .collect();
        ready.sort_by_key(|p| p.id);
        ready.truncate(limit as usize);
        Ok(ready)
    }

    async fn list_all(&self) -> DispatchResult<Vec<Provider>> {
        let providers = self.providers.lock().unwrap();
        let mut all: Vec<Provider> = providers.values().cloned().collect();
        all.sort_by_key(|p| p.id);
        Ok(all)
    }

    async fn list_ranked(&self, limit: i64) -> DispatchResult<Vec<Provider>> {
        let providers = self.providers.lock().unwrap();
        let mut ranked: Vec<Provider> = providers.values().cloned().collect();
        ranked.sort_by(|a, b| {
            b.rank_score
                .total_cmp(&a.rank_score)
                .then_with(|| a.id.cmp(&b.id))
        });
        ranked.truncate(limit as usize);
        Ok(ranked)
    }

    async fn update_status(&self, id: i64, status: ProviderStatus) -> DispatchResult<Provider> {
        self.update_with(id, |p| p.status = status)
    }

    async fn update_rank_score(&self, id: i64, rank_score: f64) -> DispatchResult<Provider> {
        self.update_with(id, |p| p.rank_score = rank_score)
    }

    async fn record_acceptance(&self, id: i64) -> DispatchResult<Provider> {
        self.update_with(id, |p| {
            p.total_requests += 1;
            p.accepted_requests += 1;
        })
    }

    async fn record_completion(&self, id: i64) -> DispatchResult<Provider> {
        self.update_with(id, |p| p.jobs_completed += 1)
    }

    async fn record_rating(&self, id: i64, rating: f64) -> DispatchResult<Provider> {
        self.update_with(id, |p| {
            let total = p.total_ratings as f64;
            p.avg_rating = (p.avg_rating * total + rating) / (total + 1.0);
            p.total_ratings += 1;
        })
    }
}

/// Recording mock for the contract/invoice port, with optional failure injection
#[derive(Debug, Default)]
pub struct MockContractGenerator {
    contracts_generated: AtomicUsize,
    invoices_generated: AtomicUsize,
    fail: AtomicBool,
}

impl MockContractGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_calls(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn contracts_generated(&self) -> usize {
        self.contracts_generated.load(Ordering::SeqCst)
    }

    pub fn invoices_generated(&self) -> usize {
        self.invoices_generated.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContractGenerator for MockContractGenerator {
    async fn generate_contract(&self, _request: &ServiceRequest) -> DispatchResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DispatchError::Internal("contract service down".to_string()));
        }
        self.contracts_generated.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn generate_invoice(&self, _request: &ServiceRequest) -> DispatchResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DispatchError::Internal("invoice service down".to_string()));
        }
        self.invoices_generated.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Recording mock for the settlement port
#[derive(Debug, Default)]
pub struct MockSettlementLedger {
    settlements: AtomicUsize,
    fail: AtomicBool,
}

impl MockSettlementLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_calls(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn settlements(&self) -> usize {
        self.settlements.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettlementLedger for MockSettlementLedger {
    async fn settle_completion(&self, _request: &ServiceRequest) -> DispatchResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DispatchError::Internal("wallet service down".to_string()));
        }
        self.settlements.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{ProviderBuilder, RequestBuilder};

    #[tokio::test]
    async fn test_try_assign_is_exclusive() {
        let repo = InMemoryRequestRepository::new();
        repo.insert(RequestBuilder::new().with_id(1).build());

        let first = repo.try_assign_provider(1, 10).await.unwrap();
        assert!(first.is_some());
        assert_eq!(first.unwrap().provider_id, Some(10));

        let second = repo.try_assign_provider(1, 11).await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_update_status_from_checks_current() {
        let repo = InMemoryRequestRepository::new();
        repo.insert(RequestBuilder::new().with_id(1).build());

        let miss = repo
            .update_status_from(1, RequestStatus::Accepted, RequestStatus::Ongoing)
            .await
            .unwrap();
        assert!(miss.is_none());

        let hit = repo
            .update_status_from(1, RequestStatus::Published, RequestStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(hit.unwrap().status, RequestStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_record_rating_updates_average() {
        let repo = InMemoryProviderRepository::new();
        repo.insert(ProviderBuilder::new().with_id(1).with_rating(4.0, 1).build());

        let updated = repo.record_rating(1, 5.0).await.unwrap();
        assert_eq!(updated.total_ratings, 2);
        assert!((updated.avg_rating - 4.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_list_ready_filters_and_sorts() {
        let repo = InMemoryProviderRepository::with_providers(vec![
            ProviderBuilder::new().with_id(3).build(),
            ProviderBuilder::new()
                .with_id(1)
                .with_status(ProviderStatus::Busy)
                .build(),
            ProviderBuilder::new().with_id(2).build(),
        ]);

        let ready = repo.list_ready(10).await.unwrap();
        let ids: Vec<i64> = ready.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }
}
