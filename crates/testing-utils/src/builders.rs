//! Test data builders for creating test entities
//!
//! Builder patterns with sensible defaults and easy customization.

use chrono::Utc;
use dispatch_domain::entities::{
    NewServiceRequest, Provider, ProviderStatus, RequestStatus, ServiceRequest,
};

/// Builder for creating test ServiceRequest entities
pub struct RequestBuilder {
    request: ServiceRequest,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            request: ServiceRequest {
                id: 1,
                client_id: 100,
                provider_id: None,
                service_type: "plumbing".to_string(),
                description: "test request".to_string(),
                address: "1 rue de Test".to_string(),
                lat: Some(48.8566),
                lng: Some(2.3522),
                geohash: None,
                urgent: false,
                status: RequestStatus::Published,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.request.id = id;
        self
    }

    pub fn with_client(mut self, client_id: i64) -> Self {
        self.request.client_id = client_id;
        self
    }

    pub fn with_provider(mut self, provider_id: i64) -> Self {
        self.request.provider_id = Some(provider_id);
        self
    }

    pub fn with_service_type(mut self, service_type: &str) -> Self {
        self.request.service_type = service_type.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.request.description = description.to_string();
        self
    }

    pub fn with_location(mut self, lat: f64, lng: f64) -> Self {
        self.request.lat = Some(lat);
        self.request.lng = Some(lng);
        self
    }

    pub fn without_location(mut self) -> Self {
        self.request.lat = None;
        self.request.lng = None;
        self
    }

    pub fn urgent(mut self) -> Self {
        self.request.urgent = true;
        self
    }

    pub fn with_status(mut self, status: RequestStatus) -> Self {
        self.request.status = status;
        self
    }

    pub fn build(self) -> ServiceRequest {
        self.request
    }

    /// Fields only, for exercising repository create paths
    pub fn build_new(self) -> NewServiceRequest {
        NewServiceRequest {
            client_id: self.request.client_id,
            service_type: self.request.service_type,
            description: self.request.description,
            address: self.request.address,
            lat: self.request.lat,
            lng: self.request.lng,
            geohash: self.request.geohash,
            urgent: self.request.urgent,
        }
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating test Provider entities
pub struct ProviderBuilder {
    provider: Provider,
}

impl ProviderBuilder {
    pub fn new() -> Self {
        Self {
            provider: Provider {
                id: 1,
                user_id: 200,
                name: "test_provider".to_string(),
                lat: Some(48.8566),
                lng: Some(2.3522),
                status: ProviderStatus::Ready,
                is_active: true,
                premium: false,
                avg_rating: 4.0,
                total_ratings: 10,
                jobs_completed: 5,
                total_requests: 10,
                accepted_requests: 8,
                declined_requests: 2,
                avg_response_time_sec: 600,
                rank_score: 10.0,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.provider.id = id;
        self
    }

    pub fn with_user(mut self, user_id: i64) -> Self {
        self.provider.user_id = user_id;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.provider.name = name.to_string();
        self
    }

    pub fn with_location(mut self, lat: f64, lng: f64) -> Self {
        self.provider.lat = Some(lat);
        self.provider.lng = Some(lng);
        self
    }

    pub fn without_location(mut self) -> Self {
        self.provider.lat = None;
        self.provider.lng = None;
        self
    }

    pub fn with_status(mut self, status: ProviderStatus) -> Self {
        self.provider.status = status;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.provider.is_active = false;
        self
    }

    pub fn premium(mut self) -> Self {
        self.provider.premium = true;
        self
    }

    pub fn with_rating(mut self, avg_rating: f64, total_ratings: i32) -> Self {
        self.provider.avg_rating = avg_rating;
        self.provider.total_ratings = total_ratings;
        self
    }

    pub fn with_rank_score(mut self, rank_score: f64) -> Self {
        self.provider.rank_score = rank_score;
        self
    }

    pub fn with_response_time(mut self, seconds: i64) -> Self {
        self.provider.avg_response_time_sec = seconds;
        self
    }

    pub fn with_history(
        mut self,
        jobs_completed: i32,
        total_requests: i32,
        accepted_requests: i32,
        declined_requests: i32,
    ) -> Self {
        self.provider.jobs_completed = jobs_completed;
        self.provider.total_requests = total_requests;
        self.provider.accepted_requests = accepted_requests;
        self.provider.declined_requests = declined_requests;
        self
    }

    pub fn build(self) -> Provider {
        self.provider
    }
}

impl Default for ProviderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder_defaults() {
        let request = RequestBuilder::new().build();
        assert_eq!(request.status, RequestStatus::Published);
        assert!(request.provider_id.is_none());
        assert!(request.is_acceptable());
    }

    #[test]
    fn test_provider_builder_customization() {
        let provider = ProviderBuilder::new()
            .with_id(42)
            .with_status(ProviderStatus::Paused)
            .inactive()
            .build();
        assert_eq!(provider.id, 42);
        assert!(!provider.is_dispatchable());
    }
}
