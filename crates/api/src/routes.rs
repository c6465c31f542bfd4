use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use dispatch_domain::repositories::{ProviderRepository, RequestRepository};
use dispatch_matcher::{
    AcceptanceArbiter, ConnectionRegistry, RankingFeedback, RequestDispatcher, RequestLifecycle,
};

use crate::handlers::{
    health::health_check,
    providers::{get_provider, list_ranked_providers, recompute_ranks},
    requests::{
        accept_request, cancel_request, complete_request, create_request, dispatch_request,
        get_request, list_open_requests, rate_request, start_request,
    },
};
use crate::ws::ws_handler;

/// API应用状态
#[derive(Clone)]
pub struct AppState {
    pub request_repo: Arc<dyn RequestRepository>,
    pub provider_repo: Arc<dyn ProviderRepository>,
    pub registry: Arc<ConnectionRegistry>,
    pub dispatcher: Arc<RequestDispatcher>,
    pub arbiter: Arc<AcceptanceArbiter>,
    pub lifecycle: Arc<RequestLifecycle>,
    pub ranking: Arc<RankingFeedback>,
}

/// 创建API路由
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // 健康检查
        .route("/health", get(health_check))
        // 服务单管理API
        .route("/api/requests", post(create_request))
        .route("/api/requests/open", get(list_open_requests))
        .route("/api/requests/{id}", get(get_request))
        .route("/api/requests/{id}/dispatch", post(dispatch_request))
        .route("/api/requests/{id}/accept", post(accept_request))
        .route("/api/requests/{id}/start", post(start_request))
        .route("/api/requests/{id}/done", post(complete_request))
        .route("/api/requests/{id}/cancel", post(cancel_request))
        .route("/api/requests/{id}/rating", post(rate_request))
        // 服务商管理API
        .route("/api/providers/ranked", get(list_ranked_providers))
        .route("/api/providers/recompute-ranks", post(recompute_ranks))
        .route("/api/providers/{id}", get(get_provider))
        // 实时通道
        .route("/ws", get(ws_handler))
        .with_state(state)
}
