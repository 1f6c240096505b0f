use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned by a [`ResourceApi`](crate::ResourceApi) call.
///
/// Provider SDKs behind this boundary do not expose a stable error taxonomy,
/// so every variant is essentially a message. Callers that need a category
/// derive it from the [`Display`](std::fmt::Display) text.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum ProviderError {
    /// The remote API rejected the request. `message` is the provider's
    /// human-readable text, verbatim.
    #[error("[{provider}] {message}")]
    Api {
        /// Provider that produced the error.
        provider: String,
        /// Original error message from the provider API.
        message: String,
    },

    /// A network-level error occurred (DNS resolution failure, connection refused, etc.).
    #[error("[{provider}] Network error: {detail}")]
    Network {
        /// Provider that produced the error.
        provider: String,
        /// Error details.
        detail: String,
    },

    /// The request did not complete in time.
    #[error("[{provider}] Request timeout: {detail}")]
    Timeout {
        /// Provider that produced the error.
        provider: String,
        /// Error details.
        detail: String,
    },
}

impl ProviderError {
    /// Shorthand for [`ProviderError::Api`].
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// Result alias used throughout the provider boundary.
pub type Result<T> = std::result::Result<T, ProviderError>;
