use axum::extract::State;
use serde_json::json;

use crate::{error::ApiResult, response::success, routes::AppState};

/// 健康检查，附带当前在线服务商数
pub async fn health_check(
    State(state): State<AppState>,
) -> ApiResult<impl axum::response::IntoResponse> {
    Ok(success(json!({
        "status": "ok",
        "connected_providers": state.registry.connected_count(),
    })))
}
