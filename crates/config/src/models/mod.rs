mod api;
mod app_config;
mod database;
mod dispatch;

pub use api::{ApiConfig, ObservabilityConfig};
pub use app_config::AppConfig;
pub use database::DatabaseConfig;
pub use dispatch::{DispatchTuning, ScoringWeights};
