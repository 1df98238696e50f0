use thiserror::Error;

use crate::scorer::IntegrityError;
use crate::types::AnalysisKind;

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM API returned status {status}: {body}")]
    LlmStatus { status: u16, body: String },

    #[error("LLM API error: {0}")]
    Llm(String),

    #[error("could not normalize {kind} payload: {reason}")]
    Normalization { kind: AnalysisKind, reason: String },

    #[error("{kind} analysis failed: {reason}")]
    Service { kind: AnalysisKind, reason: String },

    #[error("{kind} service is not available: {reason}")]
    Unavailable { kind: AnalysisKind, reason: String },

    #[error("concept store error: {0}")]
    ConceptStore(String),

    #[error("sink error: {0}")]
    Sink(String),

    #[error("source error: {0}")]
    Source(String),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error(transparent)]
    Config(#[from] oppdb_core::ConfigError),
}

impl EnrichmentError {
    pub(crate) fn normalization(kind: AnalysisKind, reason: impl Into<String>) -> Self {
        Self::Normalization {
            kind,
            reason: reason.into(),
        }
    }
}
