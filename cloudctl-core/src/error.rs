//! Unified error type definition

use serde::Serialize;
use thiserror::Error;

// Re-export library error type
pub use cloudctl_provider::ProviderError;

/// Category inferred from a failure's message text.
///
/// The provider APIs expose no structured error codes, so this is a
/// best-effort reading of the message (see [`crate::retry::classify`]).
/// It drives exit codes, operator hints and the optional
/// [`RetryOn::TransientOnly`](crate::retry::RetryOn) policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCategory {
    Auth,
    NotFound,
    Conflict,
    RateLimit,
    Network,
    Validation,
    Permission,
    Unknown,
}

impl ErrorCategory {
    /// Process exit code for a failure of this category.
    ///
    /// Authentication and permission problems share `3`, remote/API
    /// trouble (network, rate limiting) is `4`, bad parameters `5`, and
    /// everything else the generic `1`.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Auth | Self::Permission => 3,
            Self::Network | Self::RateLimit => 4,
            Self::Validation => 5,
            Self::NotFound | Self::Conflict | Self::Unknown => 1,
        }
    }

    /// Short operator-facing hint for this category.
    pub fn hint(self) -> &'static str {
        match self {
            Self::Auth => "check that the API token is configured correctly",
            Self::NotFound => "list the available resources and check the name or id",
            Self::Conflict => "the resource may already exist",
            Self::RateLimit => "retry later or lower the concurrency",
            Self::Network => "check the network connection",
            Self::Validation => "check the request parameters",
            Self::Permission => "check the API token's permissions",
            Self::Unknown => "see the error message for details",
        }
    }

    /// Whether a retry has any chance of succeeding.
    ///
    /// Rate limiting and network trouble are transient; `Unknown` is given
    /// the benefit of the doubt.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::RateLimit | Self::Network | Self::Unknown)
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Auth => "auth",
            Self::NotFound => "not found",
            Self::Conflict => "conflict",
            Self::RateLimit => "rate limit",
            Self::Network => "network",
            Self::Validation => "validation",
            Self::Permission => "permission",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// What actually went wrong underneath a [`ClassifiedError`].
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "error")]
pub enum FailureCause {
    /// The provider call failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The run was cancelled before or while waiting to retry.
    #[error("operation cancelled")]
    Cancelled,
}

/// A failed call, with its inferred category.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("{operation}: {message}")]
pub struct ClassifiedError {
    pub category: ErrorCategory,
    /// Name of the operation that failed (e.g. `resolve:example.com`).
    pub operation: String,
    pub message: String,
    #[source]
    pub cause: FailureCause,
}

impl ClassifiedError {
    /// Whether this failure is a cancellation rather than a provider error.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.cause, FailureCause::Cancelled)
    }
}

/// Core layer error type
///
/// Only raised for inputs the batch engine cannot run at all; provider
/// failures never surface here, they end up in the batch report.
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum CoreError {
    /// The execution plan is structurally unusable
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    /// The retry policy violates its bounds
    #[error("Invalid retry policy: {0}")]
    InvalidPolicy(String),
}

/// Core layer Result type alias
pub type CoreResult<T> = std::result::Result<T, CoreError>;
