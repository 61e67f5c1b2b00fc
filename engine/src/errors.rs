//! Engine error types
//!
//! A run fails as a whole only when no further progress is possible: bad
//! configuration, today's page or Timeline block missing, nothing to format,
//! the model call failing, or an undecodable edit plan. Failures local to one
//! day or one batch are recorded in the apply report instead.

use daybook_store::StoreError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::decode::DecodeError;
use crate::model::ModelError;

/// Error category for structured logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Environment missing or malformed
    ConfigError,
    /// Today's page or Timeline block does not exist, or holds no entries
    ResolutionMiss,
    /// Graph store unreachable after host fallback
    StoreError,
    /// Completion request failed
    ModelError,
    /// Model output is not a usable edit plan
    DecodeError,
}

impl ErrorCategory {
    /// Machine-readable code for logging
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConfigError => "CONFIG_ERROR",
            Self::ResolutionMiss => "RESOLUTION_MISS",
            Self::StoreError => "STORE_ERROR",
            Self::ModelError => "MODEL_ERROR",
            Self::DecodeError => "DECODE_ERROR",
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("today's page not found: {title}")]
    PageNotFound { title: String },

    #[error("Timeline block not found on {title}")]
    TimelineNotFound { title: String },

    #[error("no entries to format on {title}")]
    NoEntries { title: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("model call failed: {0}")]
    Model(#[from] ModelError),

    #[error("model response has no text content")]
    EmptyResponse,

    #[error("could not parse actions from response: {source}")]
    Decode {
        #[source]
        source: DecodeError,
        /// Untouched model output, kept for manual recovery.
        raw: String,
    },
}

impl EngineError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::ConfigError,
            Self::PageNotFound { .. } | Self::TimelineNotFound { .. } | Self::NoEntries { .. } => {
                ErrorCategory::ResolutionMiss
            }
            Self::Store(_) => ErrorCategory::StoreError,
            Self::Model(_) | Self::EmptyResponse => ErrorCategory::ModelError,
            Self::Decode { .. } => ErrorCategory::DecodeError,
        }
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
