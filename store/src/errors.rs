//! Store error types
//!
//! Every failure that crosses the graph boundary ends up here. Host-level
//! failures (timeouts, 404s, refused connections) are absorbed by the host
//! fallback in [`crate::client`]; only an exhausted host list surfaces as
//! [`StoreError::Remote`].

use thiserror::Error;

/// Errors from graph store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Every host was tried and none accepted the request.
    #[error("Roam API error: {last_error}")]
    Remote {
        /// Body (or transport error text) of the last failed attempt.
        last_error: String,
    },

    /// The store answered, but not with the shape we asked for.
    #[error("unexpected store response: {0}")]
    Response(String),

    /// Client could not be constructed from the given settings.
    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),
}

impl StoreError {
    pub fn remote(last_error: impl Into<String>) -> Self {
        Self::Remote {
            last_error: last_error.into(),
        }
    }

    pub fn response(message: impl Into<String>) -> Self {
        Self::Response(message.into())
    }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
