//! 调用方身份提取
//!
//! 认证由上游网关完成，这里只信任网关注入的身份头:
//! `X-User-Id`、`X-User-Role`、`X-Provider-Id`(角色为 PROVIDER 时必带)。

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use dispatch_domain::entities::{Caller, CallerRole};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("缺少身份头: {0}")]
    MissingHeader(&'static str),
    #[error("身份头格式无效: {0}")]
    InvalidHeader(&'static str),
    #[error("未知角色: {0}")]
    UnknownRole(String),
    #[error("PROVIDER 角色缺少 X-Provider-Id")]
    MissingProviderId,
}

fn header_i64(parts: &Parts, name: &'static str) -> Result<i64, AuthError> {
    let value = parts
        .headers
        .get(name)
        .ok_or(AuthError::MissingHeader(name))?;
    value
        .to_str()
        .map_err(|_| AuthError::InvalidHeader(name))?
        .parse()
        .map_err(|_| AuthError::InvalidHeader(name))
}

/// 从请求头还原调用方身份
#[derive(Debug, Clone)]
pub struct AuthenticatedCaller(pub Caller);

impl<S> FromRequestParts<S> for AuthenticatedCaller
where
    S: Send + Sync,
{
    type Rejection = crate::error::ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_i64(parts, "X-User-Id").map_err(crate::error::ApiError::from)?;

        let role_header = parts
            .headers
            .get("X-User-Role")
            .ok_or(AuthError::MissingHeader("X-User-Role"))
            .map_err(crate::error::ApiError::from)?;
        let role_str = role_header
            .to_str()
            .map_err(|_| AuthError::InvalidHeader("X-User-Role"))
            .map_err(crate::error::ApiError::from)?;
        let role = CallerRole::parse(role_str)
            .ok_or_else(|| AuthError::UnknownRole(role_str.to_string()))
            .map_err(crate::error::ApiError::from)?;

        let provider_id = match role {
            CallerRole::Provider => Some(
                header_i64(parts, "X-Provider-Id")
                    .map_err(|_| AuthError::MissingProviderId)
                    .map_err(crate::error::ApiError::from)?,
            ),
            _ => None,
        };

        Ok(AuthenticatedCaller(Caller {
            user_id,
            role,
            provider_id,
        }))
    }
}
