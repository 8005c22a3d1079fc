//! Error types for survey-synth.
//!
//! Taxonomy:
//! - Configuration defects: malformed distributions, broken survey structure
//! - Record failures: a single respondent could not be built
//! - Infrastructure failures: filesystem, serialization

use thiserror::Error;

/// Top-level error type for survey-synth.
#[derive(Debug, Error)]
pub enum SynthError {
    // ═══════════════════════════════════════════════════════════════════
    // CONFIGURATION: defect in the survey definition, never retried
    // ═══════════════════════════════════════════════════════════════════

    #[error("Configuration error: {0}")]
    Config(#[from] super::ConfigError),

    #[error("Sampling error: {0}")]
    Sampler(#[from] SamplerError),

    // ═══════════════════════════════════════════════════════════════════
    // RECORD: one respondent failed; the failure policy decides the run
    // ═══════════════════════════════════════════════════════════════════

    #[error("Record {respondent} failed: {source}")]
    RecordFailed {
        respondent: usize,
        #[source]
        source: SamplerError,
    },

    // ═══════════════════════════════════════════════════════════════════
    // INFRASTRUCTURE
    // ═══════════════════════════════════════════════════════════════════

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised by the weighted sampler.
///
/// Both variants indicate a configuration defect. Retrying cannot help.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SamplerError {
    #[error("Invalid distribution for '{question}': {reason}")]
    InvalidDistribution { question: String, reason: String },

    #[error("Question '{question}' is not a {expected}-choice question")]
    ModeMismatch {
        question: String,
        expected: &'static str,
    },
}

impl SamplerError {
    pub(crate) fn invalid(question: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDistribution {
            question: question.to_string(),
            reason: reason.into(),
        }
    }
}

impl SynthError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type alias for survey-synth.
pub type Result<T> = std::result::Result<T, SynthError>;
