use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceRequest {
    pub id: i64,
    pub client_id: i64,
    pub provider_id: Option<i64>,
    pub service_type: String,
    pub description: String,
    pub address: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub geohash: Option<String>,
    pub urgent: bool,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RequestStatus {
    #[serde(rename = "PUBLISHED")]
    Published,
    #[serde(rename = "ACCEPTED")]
    Accepted,
    #[serde(rename = "ONGOING")]
    Ongoing,
    #[serde(rename = "DONE")]
    Done,
    #[serde(rename = "CANCELLED")]
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Published => "PUBLISHED",
            RequestStatus::Accepted => "ACCEPTED",
            RequestStatus::Ongoing => "ONGOING",
            RequestStatus::Done => "DONE",
            RequestStatus::Cancelled => "CANCELLED",
        }
    }
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Done | RequestStatus::Cancelled)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl sqlx::Type<sqlx::Postgres> for RequestStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("VARCHAR")
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for RequestStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        match s {
            "PUBLISHED" => Ok(RequestStatus::Published),
            "ACCEPTED" => Ok(RequestStatus::Accepted),
            "ONGOING" => Ok(RequestStatus::Ongoing),
            "DONE" => Ok(RequestStatus::Done),
            "CANCELLED" => Ok(RequestStatus::Cancelled),
            _ => Err(format!("Invalid request status: {s}").into()),
        }
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for RequestStatus {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
    }
}

impl ServiceRequest {
    pub fn entity_description(&self) -> String {
        format!(
            "服务单 #{} (类型: {}, 状态: {})",
            self.id, self.service_type, self.status
        )
    }
    pub fn is_open(&self) -> bool {
        matches!(self.status, RequestStatus::Published)
    }
    /// PUBLISHED 且未分配服务商的服务单才可被接单
    pub fn is_acceptable(&self) -> bool {
        self.is_open() && self.provider_id.is_none()
    }
}

/// 创建服务单所需的字段，id 与时间戳由存储层生成
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewServiceRequest {
    pub client_id: i64,
    pub service_type: String,
    pub description: String,
    pub address: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub geohash: Option<String>,
    pub urgent: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Provider {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub status: ProviderStatus,
    pub is_active: bool,
    pub premium: bool,
    pub avg_rating: f64,
    pub total_ratings: i32,
    pub jobs_completed: i32,
    pub total_requests: i32,
    pub accepted_requests: i32,
    pub declined_requests: i32,
    pub avg_response_time_sec: i64,
    pub rank_score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ProviderStatus {
    #[serde(rename = "READY")]
    Ready,
    #[serde(rename = "BUSY")]
    Busy,
    #[serde(rename = "PAUSED")]
    Paused,
    #[serde(rename = "OFFLINE")]
    Offline,
}

impl ProviderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderStatus::Ready => "READY",
            ProviderStatus::Busy => "BUSY",
            ProviderStatus::Paused => "PAUSED",
            ProviderStatus::Offline => "OFFLINE",
        }
    }
    /// 历史客户端会发送 ON_MISSION，未知值一律按 OFFLINE 处理
    pub fn normalize(input: &str) -> ProviderStatus {
        match input {
            "READY" => ProviderStatus::Ready,
            "BUSY" | "ON_MISSION" => ProviderStatus::Busy,
            "PAUSED" => ProviderStatus::Paused,
            _ => ProviderStatus::Offline,
        }
    }
}

impl std::fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl sqlx::Type<sqlx::Postgres> for ProviderStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("VARCHAR")
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ProviderStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        match s {
            "READY" => Ok(ProviderStatus::Ready),
            "BUSY" => Ok(ProviderStatus::Busy),
            "PAUSED" => Ok(ProviderStatus::Paused),
            "OFFLINE" => Ok(ProviderStatus::Offline),
            _ => Err(format!("Invalid provider status: {s}").into()),
        }
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for ProviderStatus {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
    }
}

impl Provider {
    pub fn is_dispatchable(&self) -> bool {
        self.is_active && matches!(self.status, ProviderStatus::Ready)
    }
    pub fn acceptance_rate(&self) -> f64 {
        if self.total_requests > 0 {
            self.accepted_requests as f64 / self.total_requests as f64
        } else {
            0.0
        }
    }
    pub fn decline_rate(&self) -> f64 {
        if self.total_requests > 0 {
            self.declined_requests as f64 / self.total_requests as f64
        } else {
            0.0
        }
    }
    pub fn entity_description(&self) -> String {
        format!("服务商 '{}' (ID: {}, 状态: {})", self.name, self.id, self.status)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CallerRole {
    #[serde(rename = "CLIENT")]
    Client,
    #[serde(rename = "PROVIDER")]
    Provider,
    #[serde(rename = "ADMIN")]
    Admin,
}

impl CallerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallerRole::Client => "CLIENT",
            CallerRole::Provider => "PROVIDER",
            CallerRole::Admin => "ADMIN",
        }
    }
    pub fn parse(input: &str) -> Option<CallerRole> {
        match input {
            "CLIENT" => Some(CallerRole::Client),
            "PROVIDER" => Some(CallerRole::Provider),
            "ADMIN" => Some(CallerRole::Admin),
            _ => None,
        }
    }
}

/// 上游认证中间件注入的调用方身份
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: i64,
    pub role: CallerRole,
    /// 角色为 PROVIDER 时携带的服务商 ID
    pub provider_id: Option<i64>,
}

impl Caller {
    pub fn client(user_id: i64) -> Self {
        Self {
            user_id,
            role: CallerRole::Client,
            provider_id: None,
        }
    }
    pub fn provider(user_id: i64, provider_id: i64) -> Self {
        Self {
            user_id,
            role: CallerRole::Provider,
            provider_id: Some(provider_id),
        }
    }
    pub fn admin(user_id: i64) -> Self {
        Self {
            user_id,
            role: CallerRole::Admin,
            provider_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_status_roundtrip() {
        for status in [
            RequestStatus::Published,
            RequestStatus::Accepted,
            RequestStatus::Ongoing,
            RequestStatus::Done,
            RequestStatus::Cancelled,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            let back: RequestStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(status, back);
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(RequestStatus::Done.is_terminal());
        assert!(RequestStatus::Cancelled.is_terminal());
        assert!(!RequestStatus::Published.is_terminal());
        assert!(!RequestStatus::Accepted.is_terminal());
        assert!(!RequestStatus::Ongoing.is_terminal());
    }

    #[test]
    fn test_provider_status_normalize() {
        assert_eq!(ProviderStatus::normalize("READY"), ProviderStatus::Ready);
        assert_eq!(ProviderStatus::normalize("ON_MISSION"), ProviderStatus::Busy);
        assert_eq!(ProviderStatus::normalize("PAUSED"), ProviderStatus::Paused);
        assert_eq!(ProviderStatus::normalize("whatever"), ProviderStatus::Offline);
    }

    #[test]
    fn test_provider_rates() {
        let mut provider = Provider {
            id: 1,
            user_id: 1,
            name: "test".to_string(),
            lat: None,
            lng: None,
            status: ProviderStatus::Ready,
            is_active: true,
            premium: false,
            avg_rating: 0.0,
            total_ratings: 0,
            jobs_completed: 0,
            total_requests: 10,
            accepted_requests: 8,
            declined_requests: 2,
            avg_response_time_sec: 0,
            rank_score: 0.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!((provider.acceptance_rate() - 0.8).abs() < f64::EPSILON);
        assert!((provider.decline_rate() - 0.2).abs() < f64::EPSILON);

        provider.total_requests = 0;
        assert_eq!(provider.acceptance_rate(), 0.0);
        assert_eq!(provider.decline_rate(), 0.0);
    }

    #[test]
    fn test_is_dispatchable() {
        let mut provider = Provider {
            id: 1,
            user_id: 1,
            name: "test".to_string(),
            lat: None,
            lng: None,
            status: ProviderStatus::Ready,
            is_active: true,
            premium: false,
            avg_rating: 0.0,
            total_ratings: 0,
            jobs_completed: 0,
            total_requests: 0,
            accepted_requests: 0,
            declined_requests: 0,
            avg_response_time_sec: 0,
            rank_score: 0.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(provider.is_dispatchable());

        provider.status = ProviderStatus::Busy;
        assert!(!provider.is_dispatchable());

        provider.status = ProviderStatus::Ready;
        provider.is_active = false;
        assert!(!provider.is_dispatchable());
    }
}
