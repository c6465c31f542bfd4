//! 排名反馈
//!
//! 服务商排名分数的计算与回写。分数综合完单量、评分、接单率、
//! 响应速度和会员加成；计算本身是纯函数，回写走仓储。
//! 同一输入重复计算得到同一分数。

use std::sync::Arc;

use tracing::{debug, info};

use dispatch_domain::entities::Provider;
use dispatch_domain::repositories::ProviderRepository;
use dispatch_errors::{DispatchError, DispatchResult};

/// 根据历史表现计算排名分数，结果不小于0
pub fn compute_rank_score(provider: &Provider) -> f64 {
    let mut score = 0.0;

    score += provider.jobs_completed as f64 * 2.0;

    if provider.total_ratings > 0 {
        // 评价超过50条后权重封顶
        let rating_weight = provider.total_ratings.min(50) as f64 / 50.0;
        score += provider.avg_rating * 20.0 * rating_weight;
    }

    if provider.total_requests > 0 {
        score += provider.acceptance_rate() * 15.0;
        score -= provider.decline_rate() * 10.0;
    }

    if provider.avg_response_time_sec > 0 {
        if provider.avg_response_time_sec <= 3600 {
            score += 10.0;
        } else if provider.avg_response_time_sec <= 4 * 3600 {
            score += 5.0;
        } else if provider.avg_response_time_sec > 24 * 3600 {
            score -= 10.0;
        }
    }

    if provider.premium {
        score += 20.0;
    }

    score.max(0.0)
}

pub struct RankingFeedback {
    provider_repo: Arc<dyn ProviderRepository>,
}

impl RankingFeedback {
    pub fn new(provider_repo: Arc<dyn ProviderRepository>) -> Self {
        Self { provider_repo }
    }

    /// 重算单个服务商的排名分数并回写，返回新分数
    pub async fn recompute(&self, provider_id: i64) -> DispatchResult<f64> {
        let provider = self
            .provider_repo
            .get_by_id(provider_id)
            .await?
            .ok_or_else(|| DispatchError::provider_not_found(provider_id))?;

        let score = compute_rank_score(&provider);
        self.provider_repo
            .update_rank_score(provider_id, score)
            .await?;

        debug!("服务商 {} 排名分数更新为 {:.2}", provider_id, score);
        Ok(score)
    }

    /// 全量重算，返回 (服务商ID, 新分数) 列表
    pub async fn recompute_all(&self) -> DispatchResult<Vec<(i64, f64)>> {
        let providers = self.provider_repo.list_all().await?;
        let mut results = Vec::with_capacity(providers.len());

        for provider in providers {
            let score = compute_rank_score(&provider);
            self.provider_repo
                .update_rank_score(provider.id, score)
                .await?;
            results.push((provider.id, score));
        }

        info!("批量重算完成, 共 {} 个服务商", results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dispatch_domain::entities::ProviderStatus;

    fn base_provider() -> Provider {
        Provider {
            id: 1,
            user_id: 1,
            name: "test".to_string(),
            lat: Some(48.85),
            lng: Some(2.35),
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
        }
    }

    #[test]
    fn test_empty_history_scores_zero() {
        assert_eq!(compute_rank_score(&base_provider()), 0.0);
    }

    #[test]
    fn test_jobs_completed_contribution() {
        let mut p = base_provider();
        p.jobs_completed = 7;
        assert!((compute_rank_score(&p) - 14.0).abs() < 1e-9);
    }

    #[test]
    fn test_rating_weight_caps_at_fifty_reviews() {
        let mut p = base_provider();
        p.avg_rating = 4.0;
        p.total_ratings = 25;
        // 4.0 * 20 * (25/50) = 40
        assert!((compute_rank_score(&p) - 40.0).abs() < 1e-9);

        p.total_ratings = 200;
        // 封顶: 4.0 * 20 * 1.0 = 80
        assert!((compute_rank_score(&p) - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_acceptance_and_decline_rates() {
        let mut p = base_provider();
        p.total_requests = 10;
        p.accepted_requests = 8;
        p.declined_requests = 2;
        // 0.8*15 - 0.2*10 = 12 - 2 = 10
        assert!((compute_rank_score(&p) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_response_time_tiers() {
        let mut p = base_provider();
        p.jobs_completed = 10; // 基线20, 避免被下限截断

        p.avg_response_time_sec = 1800;
        assert!((compute_rank_score(&p) - 30.0).abs() < 1e-9);

        p.avg_response_time_sec = 2 * 3600;
        assert!((compute_rank_score(&p) - 25.0).abs() < 1e-9);

        p.avg_response_time_sec = 12 * 3600;
        assert!((compute_rank_score(&p) - 20.0).abs() < 1e-9);

        p.avg_response_time_sec = 48 * 3600;
        assert!((compute_rank_score(&p) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_premium_bonus() {
        let mut p = base_provider();
        p.premium = true;
        assert!((compute_rank_score(&p) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_never_negative() {
        let mut p = base_provider();
        p.total_requests = 10;
        p.declined_requests = 10;
        p.avg_response_time_sec = 48 * 3600;
        assert_eq!(compute_rank_score(&p), 0.0);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let mut p = base_provider();
        p.jobs_completed = 3;
        p.premium = true;
        let first = compute_rank_score(&p);
        p.rank_score = first; // rank_score 不参与自身计算
        let second = compute_rank_score(&p);
        assert_eq!(first, second);
    }
}
