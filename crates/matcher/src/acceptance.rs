//! 接单仲裁
//!
//! 多个服务商同时抢同一张服务单时，恰好一个成功。互斥由仓储层的
//! 原子条件更新保证，这里负责失败原因的归类和成功后的联动:
//! 服务商状态置 BUSY、接单统计累加、排名重算、广播事件、生成合同。

use std::sync::Arc;

use tracing::{error, info, warn};

use dispatch_domain::entities::{ProviderStatus, RequestStatus, ServiceRequest};
use dispatch_domain::events::RequestEvent;
use dispatch_domain::ports::ContractGenerator;
use dispatch_domain::repositories::{ProviderRepository, RequestRepository};
use dispatch_errors::{DispatchError, DispatchResult};

use crate::ranking::RankingFeedback;
use crate::registry::ConnectionRegistry;

pub struct AcceptanceArbiter {
    request_repo: Arc<dyn RequestRepository>,
    provider_repo: Arc<dyn ProviderRepository>,
    registry: Arc<ConnectionRegistry>,
    ranking: Arc<RankingFeedback>,
    contracts: Arc<dyn ContractGenerator>,
}

impl AcceptanceArbiter {
    pub fn new(
        request_repo: Arc<dyn RequestRepository>,
        provider_repo: Arc<dyn ProviderRepository>,
        registry: Arc<ConnectionRegistry>,
        ranking: Arc<RankingFeedback>,
        contracts: Arc<dyn ContractGenerator>,
    ) -> Self {
        Self {
            request_repo,
            provider_repo,
            registry,
            ranking,
            contracts,
        }
    }

    /// 服务商尝试接单。
    ///
    /// 返回更新后的服务单；竞争失败返回 [`DispatchError::AlreadyAssigned`]，
    /// 服务单已取消返回 [`DispatchError::InvalidTransition`]。
    pub async fn accept(
        &self,
        request_id: i64,
        provider_id: i64,
    ) -> DispatchResult<ServiceRequest> {
        let provider = self
            .provider_repo
            .get_by_id(provider_id)
            .await?
            .ok_or_else(|| DispatchError::provider_not_found(provider_id))?;

        if !provider.is_active {
            return Err(DispatchError::forbidden("服务商账号未激活"));
        }

        let assigned = self
            .request_repo
            .try_assign_provider(request_id, provider_id)
            .await?;

        let request = match assigned {
            Some(request) => request,
            None => return Err(self.classify_rejection(request_id).await?),
        };

        info!("服务单 #{} 被服务商 {} 接下", request_id, provider_id);

        // 接单已经落库，后续联动失败只记录，不回滚状态
        if let Err(e) = self.provider_repo.record_acceptance(provider_id).await {
            error!("累加服务商 {} 接单统计失败: {}", provider_id, e);
        }
        if let Err(e) = self
            .provider_repo
            .update_status(provider_id, ProviderStatus::Busy)
            .await
        {
            error!("更新服务商 {} 状态为 BUSY 失败: {}", provider_id, e);
        }
        // 接单改变接单率，排名输入随之变化
        if let Err(e) = self.ranking.recompute(provider_id).await {
            error!("重算服务商 {} 排名失败: {}", provider_id, e);
        }

        let delivered = self.registry.broadcast(RequestEvent::Accepted {
            request_id,
            provider_id,
        });
        if delivered == 0 {
            warn!("服务单 #{} 的接单事件没有任何在线接收方", request_id);
        }

        if let Err(e) = self.contracts.generate_contract(&request).await {
            error!("服务单 #{} 生成合同失败: {}", request_id, e);
        }

        Ok(request)
    }

    /// 条件更新落空后重读一次，区分不存在 / 已取消 / 已被抢
    async fn classify_rejection(&self, request_id: i64) -> DispatchResult<DispatchError> {
        let current = self.request_repo.get_by_id(request_id).await?;
        Ok(match current {
            None => DispatchError::request_not_found(request_id),
            Some(request) if request.status == RequestStatus::Cancelled => {
                DispatchError::invalid_transition(
                    RequestStatus::Cancelled.as_str(),
                    RequestStatus::Accepted.as_str(),
                )
            }
            Some(_) => DispatchError::already_assigned(request_id),
        })
    }
}
