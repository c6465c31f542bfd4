//! 服务单生命周期
//!
//! 显式状态机: PUBLISHED -> ACCEPTED -> ONGOING -> DONE，
//! PUBLISHED/ACCEPTED 可取消。终态不可再迁移。
//! 状态写入走仓储的条件更新，表之外的迁移一律拒绝。

use std::sync::Arc;

use tracing::{error, info};

use dispatch_domain::entities::{Caller, CallerRole, ProviderStatus, RequestStatus, ServiceRequest};
use dispatch_domain::events::RequestEvent;
use dispatch_domain::ports::{ContractGenerator, SettlementLedger};
use dispatch_domain::repositories::{ProviderRepository, RequestRepository};
use dispatch_errors::{DispatchError, DispatchResult};

use crate::ranking::RankingFeedback;
use crate::registry::ConnectionRegistry;

/// 状态迁移表。表中没有的组合不允许，无论调用方角色。
pub fn transition_allowed(from: RequestStatus, to: RequestStatus) -> bool {
    use RequestStatus::*;
    matches!(
        (from, to),
        (Published, Accepted)
            | (Published, Cancelled)
            | (Accepted, Ongoing)
            | (Accepted, Cancelled)
            | (Ongoing, Done)
    )
}

pub struct RequestLifecycle {
    request_repo: Arc<dyn RequestRepository>,
    provider_repo: Arc<dyn ProviderRepository>,
    registry: Arc<ConnectionRegistry>,
    ranking: Arc<RankingFeedback>,
    contracts: Arc<dyn ContractGenerator>,
    settlement: Arc<dyn SettlementLedger>,
}

impl RequestLifecycle {
    pub fn new(
        request_repo: Arc<dyn RequestRepository>,
        provider_repo: Arc<dyn ProviderRepository>,
        registry: Arc<ConnectionRegistry>,
        ranking: Arc<RankingFeedback>,
        contracts: Arc<dyn ContractGenerator>,
        settlement: Arc<dyn SettlementLedger>,
    ) -> Self {
        Self {
            request_repo,
            provider_repo,
            registry,
            ranking,
            contracts,
            settlement,
        }
    }

    /// 服务商开工: ACCEPTED -> ONGOING，仅限被分配的服务商或管理员
    pub async fn start(&self, request_id: i64, caller: &Caller) -> DispatchResult<ServiceRequest> {
        let request = self.load(request_id).await?;
        self.require_assigned_provider(&request, caller)?;

        let updated = self
            .transition(request_id, RequestStatus::Accepted, RequestStatus::Ongoing)
            .await?;

        self.registry
            .broadcast(RequestEvent::Ongoing { request_id });
        info!("服务单 #{} 开始服务", request_id);
        Ok(updated)
    }

    /// 服务商完单: ONGOING -> DONE。
    ///
    /// 落库后触发完单统计、服务商回到 READY、排名重算、发票与结算。
    /// 这些联动失败只记录日志，状态迁移不回滚。
    pub async fn complete(
        &self,
        request_id: i64,
        caller: &Caller,
    ) -> DispatchResult<ServiceRequest> {
        let request = self.load(request_id).await?;
        self.require_assigned_provider(&request, caller)?;

        let updated = self
            .transition(request_id, RequestStatus::Ongoing, RequestStatus::Done)
            .await?;

        if let Some(provider_id) = updated.provider_id {
            if let Err(e) = self.provider_repo.record_completion(provider_id).await {
                error!("累加服务商 {} 完单统计失败: {}", provider_id, e);
            }
            if let Err(e) = self
                .provider_repo
                .update_status(provider_id, ProviderStatus::Ready)
                .await
            {
                error!("恢复服务商 {} 为 READY 失败: {}", provider_id, e);
            }
            if let Err(e) = self.ranking.recompute(provider_id).await {
                error!("重算服务商 {} 排名失败: {}", provider_id, e);
            }
        }

        if let Err(e) = self.contracts.generate_invoice(&updated).await {
            error!("服务单 #{} 生成发票失败: {}", request_id, e);
        }
        if let Err(e) = self.settlement.settle_completion(&updated).await {
            error!("服务单 #{} 结算失败: {}", request_id, e);
        }

        self.registry.broadcast(RequestEvent::Done { request_id });
        info!("服务单 #{} 已完成", request_id);
        Ok(updated)
    }

    /// 取消服务单。客户只能取消自己的单，被分配的服务商只能在
    /// ACCEPTED 阶段放弃，两者都受迁移表约束 (PUBLISHED/ACCEPTED 可取消)；
    /// 管理员可以取消任何非终态的单。
    pub async fn cancel(&self, request_id: i64, caller: &Caller) -> DispatchResult<ServiceRequest> {
        let request = self.load(request_id).await?;

        match caller.role {
            CallerRole::Client => {
                if request.client_id != caller.user_id {
                    return Err(DispatchError::forbidden("只能取消自己的服务单"));
                }
            }
            CallerRole::Admin => {}
            CallerRole::Provider => {
                let caller_provider = caller
                    .provider_id
                    .ok_or_else(|| DispatchError::forbidden("仅限服务商操作"))?;
                if request.provider_id != Some(caller_provider) {
                    return Err(DispatchError::forbidden("只有接单的服务商可以取消此服务单"));
                }
            }
        }

        if request.status.is_terminal() {
            return Err(DispatchError::invalid_transition(
                request.status.as_str(),
                RequestStatus::Cancelled.as_str(),
            ));
        }
        if caller.role != CallerRole::Admin && !transition_allowed(request.status, RequestStatus::Cancelled) {
            return Err(DispatchError::invalid_transition(
                request.status.as_str(),
                RequestStatus::Cancelled.as_str(),
            ));
        }

        // 管理员可越过迁移表取消非终态单，普通迁移表检查已在上面完成
        let updated = self
            .apply_transition(request_id, request.status, RequestStatus::Cancelled)
            .await?;

        if let Some(provider_id) = updated.provider_id {
            if let Err(e) = self
                .provider_repo
                .update_status(provider_id, ProviderStatus::Ready)
                .await
            {
                error!("恢复服务商 {} 为 READY 失败: {}", provider_id, e);
            }
            if let Err(e) = self.ranking.recompute(provider_id).await {
                error!("重算服务商 {} 排名失败: {}", provider_id, e);
            }
        }

        self.registry.broadcast(RequestEvent::Cancelled {
            request_id,
            by: caller.user_id,
        });
        info!("服务单 #{} 已被用户 {} 取消", request_id, caller.user_id);
        Ok(updated)
    }

    async fn load(&self, request_id: i64) -> DispatchResult<ServiceRequest> {
        self.request_repo
            .get_by_id(request_id)
            .await?
            .ok_or_else(|| DispatchError::request_not_found(request_id))
    }

    /// 开工/完单要求调用方就是被分配的服务商，管理员放行
    fn require_assigned_provider(
        &self,
        request: &ServiceRequest,
        caller: &Caller,
    ) -> DispatchResult<()> {
        if caller.role == CallerRole::Admin {
            return Ok(());
        }
        let caller_provider = caller
            .provider_id
            .ok_or_else(|| DispatchError::forbidden("仅限服务商操作"))?;
        match request.provider_id {
            Some(assigned) if assigned == caller_provider => Ok(()),
            _ => Err(DispatchError::forbidden("只有接单的服务商可以操作此服务单")),
        }
    }

    /// 条件更新失败时重读一次，用当前状态报错
    async fn transition(
        &self,
        request_id: i64,
        from: RequestStatus,
        to: RequestStatus,
    ) -> DispatchResult<ServiceRequest> {
        if !transition_allowed(from, to) {
            return Err(DispatchError::invalid_transition(from.as_str(), to.as_str()));
        }
        self.apply_transition(request_id, from, to).await
    }

    async fn apply_transition(
        &self,
        request_id: i64,
        from: RequestStatus,
        to: RequestStatus,
    ) -> DispatchResult<ServiceRequest> {
        match self
            .request_repo
            .update_status_from(request_id, from, to)
            .await?
        {
            Some(updated) => Ok(updated),
            None => {
                let current = self.request_repo.get_by_id(request_id).await?;
                Err(match current {
                    None => DispatchError::request_not_found(request_id),
                    Some(r) => DispatchError::invalid_transition(r.status.as_str(), to.as_str()),
                })
            }
        }
    }
}
