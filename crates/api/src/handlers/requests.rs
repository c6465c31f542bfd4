use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use validator::Validate;

use dispatch_domain::entities::{CallerRole, NewServiceRequest, RequestStatus};
use dispatch_errors::DispatchError;

use crate::{
    auth::AuthenticatedCaller,
    error::{ApiError, ApiResult},
    response::success,
    routes::AppState,
};

/// 服务单创建请求
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRequestPayload {
    #[validate(length(min = 1, max = 100))]
    pub service_type: String,
    #[validate(length(min = 1, max = 2000))]
    pub description: String,
    #[validate(length(min = 1, max = 500))]
    pub address: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub geohash: Option<String>,
    #[serde(default)]
    pub urgent: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RatingPayload {
    #[validate(range(min = 1.0, max = 5.0))]
    pub rating: f64,
}

/// 候选摘要，面向调试与运营端点，不进入实时通道
#[derive(Debug, Serialize)]
pub struct CandidateView {
    pub provider_id: i64,
    pub distance_km: f64,
    pub score: f64,
}

/// 创建服务单并立即发起一轮派单
pub async fn create_request(
    State(state): State<AppState>,
    caller: AuthenticatedCaller,
    Json(payload): Json<CreateRequestPayload>,
) -> ApiResult<impl axum::response::IntoResponse> {
    if caller.0.role == CallerRole::Provider {
        return Err(ApiError::Dispatch(DispatchError::forbidden(
            "服务商不能发布服务单",
        )));
    }
    payload.validate()?;

    let created = state
        .request_repo
        .create(&NewServiceRequest {
            client_id: caller.0.user_id,
            service_type: payload.service_type,
            description: payload.description,
            address: payload.address,
            lat: payload.lat,
            lng: payload.lng,
            geohash: payload.geohash,
            urgent: payload.urgent,
        })
        .await?;

    // 派单失败不影响创建结果，服务单保持 PUBLISHED 可被轮询发现
    let notified = match state.dispatcher.dispatch(created.id).await {
        Ok(outcome) => outcome.notified.len(),
        Err(e) => {
            warn!("服务单 #{} 创建后派单失败: {}", created.id, e);
            0
        }
    };

    Ok(success(json!({
        "request": created,
        "notified": notified,
    })))
}

/// 轮询入口: 当前可接单的服务单列表
pub async fn list_open_requests(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let requests = state
        .request_repo
        .list_by_status(RequestStatus::Published, limit)
        .await?;
    Ok(success(requests))
}

pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let request = state
        .request_repo
        .get_by_id(id)
        .await?
        .ok_or(DispatchError::RequestNotFound { id })?;
    Ok(success(request))
}

/// 手动重派，运营或定时任务使用
pub async fn dispatch_request(
    State(state): State<AppState>,
    caller: AuthenticatedCaller,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    if caller.0.role != CallerRole::Admin {
        return Err(ApiError::Dispatch(DispatchError::forbidden(
            "仅管理员可以手动派单",
        )));
    }

    let outcome = state.dispatcher.dispatch(id).await?;
    let candidates: Vec<CandidateView> = outcome
        .candidates
        .iter()
        .map(|c| CandidateView {
            provider_id: c.provider.id,
            distance_km: c.distance_km,
            score: c.score,
        })
        .collect();

    Ok(success(json!({
        "request": outcome.request,
        "candidates": candidates,
        "notified": outcome.notified,
    })))
}

/// 服务商接单，竞争失败返回 409
pub async fn accept_request(
    State(state): State<AppState>,
    caller: AuthenticatedCaller,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let provider_id = caller.0.provider_id.ok_or_else(|| {
        ApiError::Dispatch(DispatchError::forbidden("仅限服务商接单"))
    })?;

    let accepted = state.arbiter.accept(id, provider_id).await?;
    Ok(success(accepted))
}

pub async fn start_request(
    State(state): State<AppState>,
    caller: AuthenticatedCaller,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let request = state.lifecycle.start(id, &caller.0).await?;
    Ok(success(request))
}

pub async fn complete_request(
    State(state): State<AppState>,
    caller: AuthenticatedCaller,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let request = state.lifecycle.complete(id, &caller.0).await?;
    Ok(success(request))
}

pub async fn cancel_request(
    State(state): State<AppState>,
    caller: AuthenticatedCaller,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let request = state.lifecycle.cancel(id, &caller.0).await?;
    Ok(success(request))
}

/// 客户给已完成的服务单评分，评分落在接单的服务商头上
pub async fn rate_request(
    State(state): State<AppState>,
    caller: AuthenticatedCaller,
    Path(id): Path<i64>,
    Json(payload): Json<RatingPayload>,
) -> ApiResult<impl axum::response::IntoResponse> {
    payload.validate()?;

    let request = state
        .request_repo
        .get_by_id(id)
        .await?
        .ok_or(DispatchError::RequestNotFound { id })?;

    if caller.0.role == CallerRole::Client && request.client_id != caller.0.user_id {
        return Err(ApiError::Dispatch(DispatchError::forbidden(
            "只能评价自己的服务单",
        )));
    }
    if caller.0.role == CallerRole::Provider {
        return Err(ApiError::Dispatch(DispatchError::forbidden(
            "服务商不能评价服务单",
        )));
    }
    if request.status != RequestStatus::Done {
        return Err(ApiError::Dispatch(DispatchError::invalid_transition(
            request.status.as_str(),
            "RATED",
        )));
    }
    let provider_id = request.provider_id.ok_or_else(|| {
        ApiError::Internal(format!("已完成的服务单 #{id} 没有服务商"))
    })?;

    let provider = state
        .provider_repo
        .record_rating(provider_id, payload.rating)
        .await?;
    // 评分改变排名输入，立即重算
    let rank_score = state.ranking.recompute(provider_id).await?;

    Ok(success(json!({
        "provider_id": provider.id,
        "avg_rating": provider.avg_rating,
        "total_ratings": provider.total_ratings,
        "rank_score": rank_score,
    })))
}
