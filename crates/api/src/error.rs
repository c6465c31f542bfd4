use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use dispatch_errors::DispatchError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("调度错误: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("验证错误: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("认证错误: {0}")]
    Authentication(#[from] crate::auth::AuthError),

    #[error("内部服务器错误: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::Dispatch(e) => {
                let status = match e {
                    DispatchError::RequestNotFound { .. }
                    | DispatchError::ProviderNotFound { .. } => StatusCode::NOT_FOUND,
                    DispatchError::AlreadyAssigned { .. }
                    | DispatchError::InvalidTransition { .. } => StatusCode::CONFLICT,
                    DispatchError::Forbidden(_) => StatusCode::FORBIDDEN,
                    DispatchError::ValidationError(_) => StatusCode::BAD_REQUEST,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let error_type = match e {
                    DispatchError::RequestNotFound { .. } => "REQUEST_NOT_FOUND",
                    DispatchError::ProviderNotFound { .. } => "PROVIDER_NOT_FOUND",
                    DispatchError::AlreadyAssigned { .. } => "ALREADY_ASSIGNED",
                    DispatchError::InvalidTransition { .. } => "INVALID_TRANSITION",
                    DispatchError::Forbidden(_) => "FORBIDDEN",
                    DispatchError::ValidationError(_) => "VALIDATION_ERROR",
                    _ => "INTERNAL_ERROR",
                };
                (status, error_type, e.user_message().to_string())
            }
            ApiError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                format!("输入数据验证失败: {e}"),
            ),
            ApiError::Serialization(_) => (
                StatusCode::BAD_REQUEST,
                "SERIALIZATION_ERROR",
                "请求数据格式错误".to_string(),
            ),
            ApiError::Authentication(e) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", e.to_string())
            }
            ApiError::Internal(msg) => {
                error!("内部服务器错误: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "系统繁忙，请稍后重试".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "error": {
                "code": error_type,
                "message": message,
            },
            "timestamp": chrono::Utc::now(),
        }));

        (status, body).into_response()
    }
}
