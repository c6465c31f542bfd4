//! 地理评分器
//!
//! 纯函数，给定输入输出确定，没有副作用。

use dispatch_config::ScoringWeights;
use dispatch_domain::entities::Provider;

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// 缺失坐标按 (0,0) 处理而不是剔除该服务商。
    /// 这是从旧系统继承的行为，保留以保证排序结果一致。
    pub fn from_optional(lat: Option<f64>, lng: Option<f64>) -> Self {
        Self {
            lat: lat.unwrap_or(0.0),
            lng: lng.unwrap_or(0.0),
        }
    }
}

/// Haversine 大圆距离，单位公里
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + (d_lng / 2.0).sin().powi(2) * lat1.cos() * lat2.cos();
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredMetrics {
    pub distance_km: f64,
    pub score: f64,
}

/// 综合期望度评分: 评分与排名加分，响应时间与距离减分。
/// 权重由配置注入，见 [`ScoringWeights`]。
#[derive(Debug, Clone)]
pub struct GeoScorer {
    weights: ScoringWeights,
}

impl GeoScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn score(&self, request_location: GeoPoint, provider: &Provider) -> ScoredMetrics {
        let provider_location = GeoPoint::from_optional(provider.lat, provider.lng);
        let distance_km = haversine_km(request_location, provider_location);

        let score = self.weights.rating_weight * provider.avg_rating
            + self.weights.rank_weight * provider.rank_score
            - provider.avg_response_time_sec as f64 / self.weights.response_time_divisor
            - distance_km / self.weights.distance_divisor;

        ScoredMetrics { distance_km, score }
    }
}

impl Default for GeoScorer {
    fn default() -> Self {
        Self::new(ScoringWeights::default())
    }
}
