//! 领域仓储抽象
//!
//! 定义数据访问的抽象接口，遵循依赖倒置原则

use async_trait::async_trait;

use dispatch_errors::DispatchResult;

use crate::entities::{NewServiceRequest, Provider, ProviderStatus, RequestStatus, ServiceRequest};

/// 服务单仓储抽象
#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn create(&self, request: &NewServiceRequest) -> DispatchResult<ServiceRequest>;
    async fn get_by_id(&self, id: i64) -> DispatchResult<Option<ServiceRequest>>;
    async fn list_by_status(
        &self,
        status: RequestStatus,
        limit: i64,
    ) -> DispatchResult<Vec<ServiceRequest>>;

    /// 接单的原子条件更新。
    ///
    /// 仅当服务单仍为 PUBLISHED 且未分配服务商时才写入 provider_id 并置为
    /// ACCEPTED；条件不满足返回 None。并发调用同一服务单时恰好一个成功，
    /// 简单的先读后写在这里不被接受。
    async fn try_assign_provider(
        &self,
        request_id: i64,
        provider_id: i64,
    ) -> DispatchResult<Option<ServiceRequest>>;

    /// 条件状态迁移，当前状态不等于 from 时返回 None
    async fn update_status_from(
        &self,
        request_id: i64,
        from: RequestStatus,
        to: RequestStatus,
    ) -> DispatchResult<Option<ServiceRequest>>;
}

/// 服务商仓储抽象
#[async_trait]
pub trait ProviderRepository: Send + Sync {
    async fn get_by_id(&self, id: i64) -> DispatchResult<Option<Provider>>;
    /// READY 且 is_active 的候选池，最多 limit 条
    async fn list_ready(&self, limit: i64) -> DispatchResult<Vec<Provider>>;
    async fn list_all(&self) -> DispatchResult<Vec<Provider>>;
    async fn list_ranked(&self, limit: i64) -> DispatchResult<Vec<Provider>>;
    async fn update_status(&self, id: i64, status: ProviderStatus) -> DispatchResult<Provider>;
    /// rank_score 只允许通过排名反馈回写
    async fn update_rank_score(&self, id: i64, rank_score: f64) -> DispatchResult<Provider>;
    /// 接单成功后累加 accepted_requests / total_requests
    async fn record_acceptance(&self, id: i64) -> DispatchResult<Provider>;
    /// 完成服务单后累加 jobs_completed
    async fn record_completion(&self, id: i64) -> DispatchResult<Provider>;
    /// 追加一条评分并更新加权平均
    async fn record_rating(&self, id: i64, rating: f64) -> DispatchResult<Provider>;
}
