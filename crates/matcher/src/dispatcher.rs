//! 派单器
//!
//! 编排一次派单: 加载服务单、候选池排序、向前 top_k 名候选
//! 推送实时通知。通知是尽力而为的，不改变服务单状态，
//! 真正的分配发生在接单仲裁。

use std::sync::Arc;

use tracing::{debug, info, warn};

use dispatch_domain::entities::{RequestStatus, ServiceRequest};
use dispatch_domain::events::RequestEvent;
use dispatch_domain::repositories::RequestRepository;
use dispatch_errors::{DispatchError, DispatchResult};

use crate::candidates::{CandidatePool, ScoredCandidate};
use crate::registry::ConnectionRegistry;

/// 一次派单的结果，含推送成功的服务商 ID 列表
#[derive(Debug)]
pub struct DispatchOutcome {
    pub request: ServiceRequest,
    pub candidates: Vec<ScoredCandidate>,
    pub notified: Vec<i64>,
}

pub struct RequestDispatcher {
    request_repo: Arc<dyn RequestRepository>,
    pool: CandidatePool,
    registry: Arc<ConnectionRegistry>,
    top_k: usize,
}

impl RequestDispatcher {
    pub fn new(
        request_repo: Arc<dyn RequestRepository>,
        pool: CandidatePool,
        registry: Arc<ConnectionRegistry>,
        top_k: usize,
    ) -> Self {
        Self {
            request_repo,
            pool,
            registry,
            top_k,
        }
    }

    pub async fn dispatch(&self, request_id: i64) -> DispatchResult<DispatchOutcome> {
        let request = self
            .request_repo
            .get_by_id(request_id)
            .await?
            .ok_or_else(|| DispatchError::request_not_found(request_id))?;

        if request.status != RequestStatus::Published {
            return Err(DispatchError::invalid_transition(
                request.status.as_str(),
                RequestStatus::Published.as_str(),
            ));
        }

        let candidates = self.pool.rank(&request).await?;
        if candidates.is_empty() {
            // 没有候选不是失败，服务单保持 PUBLISHED 等待轮询或重派
            info!("服务单 #{} 当前没有可用服务商, 保持等待", request_id);
            return Ok(DispatchOutcome {
                request,
                candidates,
                notified: Vec::new(),
            });
        }

        let selected: Vec<ScoredCandidate> =
            candidates.into_iter().take(self.top_k).collect();

        let event = RequestEvent::NewRequest {
            request_id: request.id,
            description: request.description.clone(),
            address: request.address.clone(),
            urgent: request.urgent,
            service_type: request.service_type.clone(),
        };

        let mut notified = Vec::with_capacity(selected.len());
        for candidate in &selected {
            let provider_id = candidate.provider.id;
            // 单个候选推送失败不影响其他候选
            if self.registry.notify(provider_id, event.clone()) {
                notified.push(provider_id);
            } else {
                debug!(
                    "服务商 {} 不在线, 跳过服务单 #{} 的推送",
                    provider_id, request_id
                );
            }
        }

        if notified.is_empty() {
            warn!("服务单 #{} 的 {} 个候选都不在线", request_id, selected.len());
        } else {
            info!(
                "服务单 #{} 已推送给 {}/{} 个候选服务商",
                request_id,
                notified.len(),
                selected.len()
            );
        }

        Ok(DispatchOutcome {
            request,
            candidates: selected,
            notified,
        })
    }
}
