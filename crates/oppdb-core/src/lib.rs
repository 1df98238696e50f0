//! Shared domain records and configuration for the oppdb workspace.

mod app_config;
mod config;
mod submission;
mod weights;

use thiserror::Error;

pub use app_config::{
    AppConfig, Environment, PipelineConfig, QualityFilterConfig, ReuseConfig, ServiceToggles,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use submission::{ResolvedConcept, Submission};
pub use weights::{ScoringWeights, WEIGHT_SUM_TOLERANCE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("scoring weights must sum to 1.0 (got {sum})")]
    InvalidWeights { sum: f64 },
}
