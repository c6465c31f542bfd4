//! 调度匹配引擎
//!
//! 负责候选服务商评分排序、实时派单通知、竞态安全的接单仲裁、
//! 服务单生命周期状态机以及完单后的排名反馈。

pub mod acceptance;
pub mod candidates;
pub mod dispatcher;
pub mod lifecycle;
pub mod ranking;
pub mod registry;
pub mod scoring;

pub use acceptance::AcceptanceArbiter;
pub use candidates::{CandidatePool, ScoredCandidate};
pub use dispatcher::{DispatchOutcome, RequestDispatcher};
pub use lifecycle::{transition_allowed, RequestLifecycle};
pub use ranking::{compute_rank_score, RankingFeedback};
pub use registry::ConnectionRegistry;
pub use scoring::{haversine_km, GeoPoint, GeoScorer, ScoredMetrics};
