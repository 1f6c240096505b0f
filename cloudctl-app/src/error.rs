//! Application error type

use cloudctl_core::error::ErrorCategory;
use cloudctl_core::CoreError;
use thiserror::Error;

/// Errors raised while preparing a run: reading and checking configuration
/// and batch files. Provider failures never end up here; they are reported
/// per item in the batch report.
#[derive(Error, Debug)]
pub enum AppError {
    /// A file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A file is not valid YAML for its format
    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    /// The content parsed but is not usable
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The core rejected the resulting plan or policy
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl AppError {
    pub(crate) fn parse(path: &str, error: &serde_yaml::Error) -> Self {
        Self::Parse {
            path: path.to_string(),
            message: error.to_string(),
        }
    }

    /// Process exit code: bad input exits like a validation failure,
    /// anything else with the generic code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) | Self::Core(_) => ErrorCategory::Validation.exit_code(),
            Self::Io { .. } | Self::Parse { .. } => 1,
        }
    }
}

/// Application Result type alias
pub type AppResult<T> = std::result::Result<T, AppError>;
