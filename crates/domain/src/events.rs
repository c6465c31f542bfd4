//! 实时事件定义
//!
//! 事件名与载荷字段必须与既有前端保持二进制兼容，字段使用 camelCase。

use serde_json::{json, Value};

use crate::entities::ProviderStatus;

#[derive(Debug, Clone, PartialEq)]
pub enum RequestEvent {
    /// 派单通知，推送给被选中的候选服务商
    NewRequest {
        request_id: i64,
        description: String,
        address: String,
        urgent: bool,
        service_type: String,
    },
    Accepted {
        request_id: i64,
        provider_id: i64,
    },
    Cancelled {
        request_id: i64,
        by: i64,
    },
    Ongoing {
        request_id: i64,
    },
    Done {
        request_id: i64,
    },
    ProviderStatusUpdate {
        provider_id: i64,
        status: ProviderStatus,
    },
}

impl RequestEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RequestEvent::NewRequest { .. } => "new_request",
            RequestEvent::Accepted { .. } => "request:accepted",
            RequestEvent::Cancelled { .. } => "request:cancelled",
            RequestEvent::Ongoing { .. } => "request:ongoing",
            RequestEvent::Done { .. } => "request:done",
            RequestEvent::ProviderStatusUpdate { .. } => "provider:status_update",
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            RequestEvent::NewRequest {
                request_id,
                description,
                address,
                urgent,
                service_type,
            } => json!({
                "requestId": request_id,
                "description": description,
                "address": address,
                "urgent": urgent,
                "serviceType": service_type,
            }),
            RequestEvent::Accepted {
                request_id,
                provider_id,
            } => json!({
                "requestId": request_id,
                "providerId": provider_id,
            }),
            RequestEvent::Cancelled { request_id, by } => json!({
                "requestId": request_id,
                "by": by,
            }),
            RequestEvent::Ongoing { request_id } => json!({
                "requestId": request_id,
            }),
            RequestEvent::Done { request_id } => json!({
                "requestId": request_id,
            }),
            RequestEvent::ProviderStatusUpdate {
                provider_id,
                status,
            } => json!({
                "providerId": provider_id,
                "status": status.as_str(),
            }),
        }
    }

    /// 传输层帧格式: {"event": ..., "data": ...}
    pub fn to_frame(&self) -> Value {
        json!({
            "event": self.name(),
            "data": self.payload(),
        })
    }
}
