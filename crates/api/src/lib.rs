//! # Dispatch API
//!
//! 服务请求调度匹配系统的HTTP服务模块，基于Axum构建。
//!
//! ## API 端点
//!
//! ### 服务单管理
//! - `POST /api/requests` - 发布服务单并发起派单
//! - `GET /api/requests/open` - 轮询可接单列表
//! - `GET /api/requests/{id}` - 服务单详情
//! - `POST /api/requests/{id}/dispatch` - 手动重派 (管理员)
//! - `POST /api/requests/{id}/accept` - 服务商接单
//! - `POST /api/requests/{id}/start` - 开始服务
//! - `POST /api/requests/{id}/done` - 完成服务
//! - `POST /api/requests/{id}/cancel` - 取消服务单
//! - `POST /api/requests/{id}/rating` - 客户评分
//!
//! ### 服务商管理
//! - `GET /api/providers/{id}` - 服务商详情
//! - `GET /api/providers/ranked` - 排名榜
//! - `POST /api/providers/recompute-ranks` - 全量重算排名 (管理员)
//!
//! ### 实时通道
//! - `GET /ws` - WebSocket，服务商上线/状态上报与派单推送
//!
//! 认证由上游网关完成，身份通过 `X-User-Id` / `X-User-Role` /
//! `X-Provider-Id` 请求头注入，见 [`auth`]。

pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod ws;

use std::sync::Arc;

use axum::Router;
use tower::ServiceBuilder;

use dispatch_config::DispatchTuning;
use dispatch_domain::repositories::{ProviderRepository, RequestRepository};
use dispatch_domain::ports::{ContractGenerator, SettlementLedger};
use dispatch_matcher::{
    AcceptanceArbiter, CandidatePool, ConnectionRegistry, GeoScorer, RankingFeedback,
    RequestDispatcher, RequestLifecycle,
};

use middleware::{cors_layer, request_logging, trace_layer};
use routes::{create_routes, AppState};

/// 组装调度引擎并创建完整的API应用
pub fn create_app(
    request_repo: Arc<dyn RequestRepository>,
    provider_repo: Arc<dyn ProviderRepository>,
    contracts: Arc<dyn ContractGenerator>,
    settlement: Arc<dyn SettlementLedger>,
    tuning: DispatchTuning,
) -> Router {
    let registry = Arc::new(ConnectionRegistry::new());

    let pool = CandidatePool::new(
        provider_repo.clone(),
        GeoScorer::new(tuning.scoring.clone()),
        tuning.max_candidates,
    );
    let dispatcher = Arc::new(RequestDispatcher::new(
        request_repo.clone(),
        pool,
        registry.clone(),
        tuning.top_k,
    ));
    let ranking = Arc::new(RankingFeedback::new(provider_repo.clone()));
    let arbiter = Arc::new(AcceptanceArbiter::new(
        request_repo.clone(),
        provider_repo.clone(),
        registry.clone(),
        ranking.clone(),
        contracts.clone(),
    ));
    let lifecycle = Arc::new(RequestLifecycle::new(
        request_repo.clone(),
        provider_repo.clone(),
        registry.clone(),
        ranking.clone(),
        contracts,
        settlement,
    ));

    let state = AppState {
        request_repo,
        provider_repo,
        registry,
        dispatcher,
        arbiter,
        lifecycle,
        ranking,
    };

    create_routes(state).layer(
        ServiceBuilder::new()
            .layer(trace_layer())
            .layer(cors_layer())
            .layer(axum::middleware::from_fn(request_logging)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use dispatch_testing_utils::{
        InMemoryProviderRepository, InMemoryRequestRepository, MockContractGenerator,
        MockSettlementLedger,
    };
    use tower::ServiceExt;

    fn test_app() -> Router {
        create_app(
            Arc::new(InMemoryRequestRepository::new()),
            Arc::new(InMemoryProviderRepository::new()),
            Arc::new(MockContractGenerator::new()),
            Arc::new(MockSettlementLedger::new()),
            DispatchTuning::default(),
        )
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_open_requests_endpoint() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api/requests/open")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_identity_headers_rejected() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/requests/1/accept")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_request_returns_404() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api/requests/999")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
