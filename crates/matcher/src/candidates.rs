//! 候选池
//!
//! 查询可派单的服务商并按评分排序。空候选池不是错误，
//! 由派单器决定如何处理。

use std::sync::Arc;

use tracing::debug;

use dispatch_domain::entities::{Provider, ServiceRequest};
use dispatch_domain::repositories::ProviderRepository;
use dispatch_errors::DispatchResult;

use crate::scoring::{GeoPoint, GeoScorer};

#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub provider: Provider,
    pub distance_km: f64,
    pub score: f64,
}

pub struct CandidatePool {
    provider_repo: Arc<dyn ProviderRepository>,
    scorer: GeoScorer,
    max_candidates: i64,
}

impl CandidatePool {
    pub fn new(
        provider_repo: Arc<dyn ProviderRepository>,
        scorer: GeoScorer,
        max_candidates: i64,
    ) -> Self {
        Self {
            provider_repo,
            scorer,
            max_candidates,
        }
    }

    /// 返回按期望度降序的候选列表。
    ///
    /// 排序必须可复现: 分数相同按距离升序，距离仍相同按服务商 ID 升序。
    pub async fn rank(&self, request: &ServiceRequest) -> DispatchResult<Vec<ScoredCandidate>> {
        let providers = self.provider_repo.list_ready(self.max_candidates).await?;
        if providers.is_empty() {
            debug!("没有READY状态的可用服务商");
            return Ok(Vec::new());
        }

        let request_location = GeoPoint::from_optional(request.lat, request.lng);

        let mut scored: Vec<ScoredCandidate> = providers
            .into_iter()
            .map(|provider| {
                let metrics = self.scorer.score(request_location, &provider);
                ScoredCandidate {
                    provider,
                    distance_km: metrics.distance_km,
                    score: metrics.score,
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.distance_km.total_cmp(&b.distance_km))
                .then_with(|| a.provider.id.cmp(&b.provider.id))
        });

        debug!(
            "服务单 #{} 的候选池排序完成, 共 {} 个候选",
            request.id,
            scored.len()
        );
        Ok(scored)
    }
}
