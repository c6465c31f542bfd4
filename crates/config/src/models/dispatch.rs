use anyhow::Result;
use serde::{Deserialize, Serialize};

/// 派单调优参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchTuning {
    /// 候选池最大容量
    pub max_candidates: i64,
    /// 每次派单实际通知的服务商数量
    pub top_k: usize,
    pub scoring: ScoringWeights,
}

impl Default for DispatchTuning {
    fn default() -> Self {
        Self {
            max_candidates: 50,
            top_k: 3,
            scoring: ScoringWeights::default(),
        }
    }
}

impl DispatchTuning {
    pub fn validate(&self) -> Result<()> {
        if self.max_candidates <= 0 {
            anyhow::bail!("候选池容量必须大于0");
        }
        if self.top_k == 0 {
            anyhow::bail!("top_k必须大于0");
        }
        if self.top_k as i64 > self.max_candidates {
            anyhow::bail!("top_k不能大于候选池容量");
        }
        self.scoring.validate()
    }
}

/// 评分权重，线性加权组合:
/// score = rating_weight * avg_rating + rank_weight * rank_score
///       - avg_response_time_sec / response_time_divisor
///       - distance_km / distance_divisor
///
/// 权重通过配置注入，调整打分策略不需要改动评分器代码。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoringWeights {
    pub rating_weight: f64,
    pub rank_weight: f64,
    pub response_time_divisor: f64,
    pub distance_divisor: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            rating_weight: 1.0,
            rank_weight: 1.0,
            response_time_divisor: 60.0,
            distance_divisor: 10.0,
        }
    }
}

impl ScoringWeights {
    pub fn validate(&self) -> Result<()> {
        if self.response_time_divisor <= 0.0 {
            anyhow::bail!("response_time_divisor必须大于0");
        }
        if self.distance_divisor <= 0.0 {
            anyhow::bail!("distance_divisor必须大于0");
        }
        Ok(())
    }
}
