use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DispatchError {
    #[error("数据库操作失败: {0}")]
    DatabaseOperation(String),
    #[error("服务请求不存在: id={id}")]
    RequestNotFound { id: i64 },
    #[error("服务商不存在: id={id}")]
    ProviderNotFound { id: i64 },
    #[error("请求已被其他服务商接单: request_id={request_id}")]
    AlreadyAssigned { request_id: i64 },
    #[error("非法的状态转换: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("权限不足: {0}")]
    Forbidden(String),
    #[error("数据验证失败: {0}")]
    ValidationError(String),
    #[error("数据序列化错误: {0}")]
    Serialization(String),
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("系统内部错误: {0}")]
    Internal(String),
}

pub type DispatchResult<T> = Result<T, DispatchError>;

impl DispatchError {
    pub fn database_error<S: Into<String>>(msg: S) -> Self {
        Self::DatabaseOperation(msg.into())
    }
    pub fn request_not_found(id: i64) -> Self {
        Self::RequestNotFound { id }
    }
    pub fn provider_not_found(id: i64) -> Self {
        Self::ProviderNotFound { id }
    }
    pub fn already_assigned(request_id: i64) -> Self {
        Self::AlreadyAssigned { request_id }
    }
    pub fn invalid_transition<S: Into<String>, T: Into<String>>(from: S, to: T) -> Self {
        Self::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }
    pub fn forbidden<S: Into<String>>(msg: S) -> Self {
        Self::Forbidden(msg.into())
    }
    pub fn validation_error<S: Into<String>>(msg: S) -> Self {
        Self::ValidationError(msg.into())
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    /// 接单竞争失败属于正常控制流，调用方需要廉价地拿到结果
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            DispatchError::AlreadyAssigned { .. } | DispatchError::InvalidTransition { .. }
        )
    }
    pub fn is_retryable(&self) -> bool {
        matches!(self, DispatchError::DatabaseOperation(_))
    }
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DispatchError::Internal(_) | DispatchError::Configuration(_)
        )
    }
    pub fn user_message(&self) -> &str {
        match self {
            DispatchError::RequestNotFound { .. } => "请求的服务单不存在",
            DispatchError::ProviderNotFound { .. } => "请求的服务商不存在",
            DispatchError::AlreadyAssigned { .. } => "该服务单已被其他服务商接单",
            DispatchError::InvalidTransition { .. } => "当前状态不允许此操作",
            DispatchError::Forbidden(_) => "您没有执行此操作的权限",
            DispatchError::ValidationError(_) => "输入数据验证失败",
            _ => "系统繁忙，请稍后重试",
        }
    }
}

impl From<sqlx::Error> for DispatchError {
    fn from(err: sqlx::Error) -> Self {
        DispatchError::DatabaseOperation(err.to_string())
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(err: serde_json::Error) -> Self {
        DispatchError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for DispatchError {
    fn from(err: anyhow::Error) -> Self {
        DispatchError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests;
