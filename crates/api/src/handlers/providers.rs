use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::json;

use dispatch_domain::entities::CallerRole;
use dispatch_errors::DispatchError;

use crate::{
    auth::AuthenticatedCaller,
    error::{ApiError, ApiResult},
    response::success,
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RankedQuery {
    pub limit: Option<i64>,
}

pub async fn get_provider(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let provider = state
        .provider_repo
        .get_by_id(id)
        .await?
        .ok_or(DispatchError::ProviderNotFound { id })?;
    Ok(success(provider))
}

/// 按排名分数降序的服务商列表
pub async fn list_ranked_providers(
    State(state): State<AppState>,
    Query(query): Query<RankedQuery>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let providers = state.provider_repo.list_ranked(limit).await?;
    Ok(success(providers))
}

/// 全量重算排名，仅限管理员
pub async fn recompute_ranks(
    State(state): State<AppState>,
    caller: AuthenticatedCaller,
) -> ApiResult<impl axum::response::IntoResponse> {
    if caller.0.role != CallerRole::Admin {
        return Err(ApiError::Dispatch(DispatchError::forbidden(
            "仅管理员可以重算排名",
        )));
    }

    let results = state.ranking.recompute_all().await?;
    let updated: Vec<_> = results
        .into_iter()
        .map(|(id, rank_score)| json!({ "provider_id": id, "rank_score": rank_score }))
        .collect();
    Ok(success(json!({ "updated": updated })))
}
