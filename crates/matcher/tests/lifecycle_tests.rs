//! 生命周期集成测试: 状态机、角色守卫、完单联动

use std::sync::Arc;

use dispatch_domain::entities::{Caller, ProviderStatus, RequestStatus};
use dispatch_domain::repositories::{ProviderRepository, RequestRepository};
use dispatch_errors::DispatchError;
use dispatch_matcher::{ConnectionRegistry, RankingFeedback, RequestLifecycle};
use dispatch_testing_utils::{
    InMemoryProviderRepository, InMemoryRequestRepository, MockContractGenerator,
    MockSettlementLedger, ProviderBuilder, RequestBuilder,
};

struct Setup {
    request_repo: Arc<InMemoryRequestRepository>,
    provider_repo: Arc<InMemoryProviderRepository>,
    contracts: Arc<MockContractGenerator>,
    settlement: Arc<MockSettlementLedger>,
    lifecycle: RequestLifecycle,
}

fn setup() -> Setup {
    let request_repo = Arc::new(InMemoryRequestRepository::new());
    let provider_repo = Arc::new(InMemoryProviderRepository::new());
    let registry = Arc::new(ConnectionRegistry::new());
    let ranking = Arc::new(RankingFeedback::new(provider_repo.clone()));
    let contracts = Arc::new(MockContractGenerator::new());
    let settlement = Arc::new(MockSettlementLedger::new());
    let lifecycle = RequestLifecycle::new(
        request_repo.clone(),
        provider_repo.clone(),
        registry,
        ranking,
        contracts.clone(),
        settlement.clone(),
    );
    Setup {
        request_repo,
        provider_repo,
        contracts,
        settlement,
        lifecycle,
    }
}

fn accepted_request(request_id: i64, client_id: i64, provider_id: i64) -> dispatch_domain::entities::ServiceRequest {
    RequestBuilder::new()
        .with_id(request_id)
        .with_client(client_id)
        .with_provider(provider_id)
        .with_status(RequestStatus::Accepted)
        .build()
}

#[tokio::test]
async fn test_start_then_complete_full_path() {
    let s = setup();
    s.request_repo.insert(accepted_request(1, 100, 10));
    s.provider_repo.insert(
        ProviderBuilder::new()
            .with_id(10)
            .with_status(ProviderStatus::Busy)
            .with_history(5, 10, 8, 2)
            .build(),
    );
    let caller = Caller::provider(200, 10);

    let ongoing = s.lifecycle.start(1, &caller).await.unwrap();
    assert_eq!(ongoing.status, RequestStatus::Ongoing);

    let done = s.lifecycle.complete(1, &caller).await.unwrap();
    assert_eq!(done.status, RequestStatus::Done);

    // 完单联动: 统计、回到 READY、排名重算、发票、结算
    let provider = s.provider_repo.get_by_id(10).await.unwrap().unwrap();
    assert_eq!(provider.jobs_completed, 6);
    assert_eq!(provider.status, ProviderStatus::Ready);
    assert!(provider.rank_score > 0.0);
    assert_eq!(s.contracts.invoices_generated(), 1);
    assert_eq!(s.settlement.settlements(), 1);
}

#[tokio::test]
async fn test_start_requires_assigned_provider() {
    let s = setup();
    s.request_repo.insert(accepted_request(1, 100, 10));
    s.provider_repo.insert(ProviderBuilder::new().with_id(10).build());
    s.provider_repo.insert(ProviderBuilder::new().with_id(11).build());

    // 其他服务商
    let err = s.lifecycle.start(1, &Caller::provider(201, 11)).await.unwrap_err();
    assert!(matches!(err, DispatchError::Forbidden(_)));

    // 客户
    let err = s.lifecycle.start(1, &Caller::client(100)).await.unwrap_err();
    assert!(matches!(err, DispatchError::Forbidden(_)));

    // 管理员放行
    let ongoing = s.lifecycle.start(1, &Caller::admin(1)).await.unwrap();
    assert_eq!(ongoing.status, RequestStatus::Ongoing);
}

#[tokio::test]
async fn test_start_from_published_is_invalid() {
    let s = setup();
    s.request_repo.insert(RequestBuilder::new().with_id(1).build());

    let err = s.lifecycle.start(1, &Caller::admin(1)).await.unwrap_err();
    assert!(matches!(err, DispatchError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_complete_requires_ongoing() {
    let s = setup();
    s.request_repo.insert(accepted_request(1, 100, 10));
    s.provider_repo.insert(ProviderBuilder::new().with_id(10).build());

    // ACCEPTED 不能直接 DONE
    let err = s
        .lifecycle
        .complete(1, &Caller::provider(200, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_client_cancels_own_published_request() {
    let s = setup();
    s.request_repo.insert(
        RequestBuilder::new().with_id(1).with_client(100).build(),
    );

    let cancelled = s.lifecycle.cancel(1, &Caller::client(100)).await.unwrap();
    assert_eq!(cancelled.status, RequestStatus::Cancelled);
}

#[tokio::test]
async fn test_client_cannot_cancel_others_request() {
    let s = setup();
    s.request_repo.insert(
        RequestBuilder::new().with_id(1).with_client(100).build(),
    );

    let err = s.lifecycle.cancel(1, &Caller::client(999)).await.unwrap_err();
    assert!(matches!(err, DispatchError::Forbidden(_)));
}

#[tokio::test]
async fn test_assigned_provider_can_cancel_accepted() {
    let s = setup();
    s.request_repo.insert(accepted_request(1, 100, 10));
    s.provider_repo.insert(
        ProviderBuilder::new()
            .with_id(10)
            .with_status(ProviderStatus::Busy)
            .build(),
    );

    let cancelled = s
        .lifecycle
        .cancel(1, &Caller::provider(200, 10))
        .await
        .unwrap();
    assert_eq!(cancelled.status, RequestStatus::Cancelled);

    // 放弃接单后回到 READY
    let provider = s.provider_repo.get_by_id(10).await.unwrap().unwrap();
    assert_eq!(provider.status, ProviderStatus::Ready);
}

#[tokio::test]
async fn test_unassigned_provider_cannot_cancel() {
    let s = setup();
    s.request_repo.insert(accepted_request(1, 100, 10));
    s.provider_repo.insert(ProviderBuilder::new().with_id(11).build());

    let err = s
        .lifecycle
        .cancel(1, &Caller::provider(201, 11))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Forbidden(_)));

    // PUBLISHED 的单还没有分配，服务商同样无权取消
    s.request_repo.insert(
        RequestBuilder::new().with_id(2).with_client(100).build(),
    );
    let err = s
        .lifecycle
        .cancel(2, &Caller::provider(201, 11))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Forbidden(_)));
}

#[tokio::test]
async fn test_provider_cannot_cancel_ongoing() {
    let s = setup();
    s.request_repo.insert(
        RequestBuilder::new()
            .with_id(1)
            .with_client(100)
            .with_provider(10)
            .with_status(RequestStatus::Ongoing)
            .build(),
    );
    s.provider_repo.insert(ProviderBuilder::new().with_id(10).build());

    let err = s
        .lifecycle
        .cancel(1, &Caller::provider(200, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_cancel_accepted_request_frees_provider() {
    let s = setup();
    s.request_repo.insert(accepted_request(1, 100, 10));
    s.provider_repo.insert(
        ProviderBuilder::new()
            .with_id(10)
            .with_status(ProviderStatus::Busy)
            .build(),
    );

    let cancelled = s.lifecycle.cancel(1, &Caller::client(100)).await.unwrap();
    assert_eq!(cancelled.status, RequestStatus::Cancelled);

    let provider = s.provider_repo.get_by_id(10).await.unwrap().unwrap();
    assert_eq!(provider.status, ProviderStatus::Ready);
}

#[tokio::test]
async fn test_client_cannot_cancel_ongoing_but_admin_can() {
    let s = setup();
    s.request_repo.insert(
        RequestBuilder::new()
            .with_id(1)
            .with_client(100)
            .with_provider(10)
            .with_status(RequestStatus::Ongoing)
            .build(),
    );
    s.provider_repo.insert(ProviderBuilder::new().with_id(10).build());

    let err = s.lifecycle.cancel(1, &Caller::client(100)).await.unwrap_err();
    assert!(matches!(err, DispatchError::InvalidTransition { .. }));

    let cancelled = s.lifecycle.cancel(1, &Caller::admin(1)).await.unwrap();
    assert_eq!(cancelled.status, RequestStatus::Cancelled);
}

#[tokio::test]
async fn test_terminal_states_reject_everything() {
    let s = setup();
    for (id, status) in [(1, RequestStatus::Done), (2, RequestStatus::Cancelled)] {
        s.request_repo.insert(
            RequestBuilder::new()
                .with_id(id)
                .with_client(100)
                .with_provider(10)
                .with_status(status)
                .build(),
        );
    }
    s.provider_repo.insert(ProviderBuilder::new().with_id(10).build());
    let admin = Caller::admin(1);

    for id in [1, 2] {
        assert!(matches!(
            s.lifecycle.cancel(id, &admin).await.unwrap_err(),
            DispatchError::InvalidTransition { .. }
        ));
        assert!(matches!(
            s.lifecycle.start(id, &admin).await.unwrap_err(),
            DispatchError::InvalidTransition { .. }
        ));
        assert!(matches!(
            s.lifecycle.complete(id, &admin).await.unwrap_err(),
            DispatchError::InvalidTransition { .. }
        ));
    }
}

#[tokio::test]
async fn test_settlement_failure_does_not_roll_back_done() {
    let s = setup();
    s.request_repo.insert(
        RequestBuilder::new()
            .with_id(1)
            .with_client(100)
            .with_provider(10)
            .with_status(RequestStatus::Ongoing)
            .build(),
    );
    s.provider_repo.insert(ProviderBuilder::new().with_id(10).build());
    s.settlement.fail_next_calls();

    let done = s
        .lifecycle
        .complete(1, &Caller::provider(200, 10))
        .await
        .unwrap();
    assert_eq!(done.status, RequestStatus::Done);

    let stored = s.request_repo.get_by_id(1).await.unwrap().unwrap();
    assert_eq!(stored.status, RequestStatus::Done);
}
