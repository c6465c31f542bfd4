pub mod models;

pub use models::{
    ApiConfig, AppConfig, DatabaseConfig, DispatchTuning, ObservabilityConfig, ScoringWeights,
};
