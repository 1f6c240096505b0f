//! Application configuration
//!
//! Loaded from YAML. Every section is optional and falls back to the
//! defaults below:
//!
//! ```yaml
//! api:
//!   timeout: 30
//!   concurrency: 1
//!   retry:
//!     enabled: true
//!     max_attempts: 3
//!     initial_delay: 1
//!     max_delay: 30
//!     transient_only: false
//! log:
//!   level: info
//!   format: text
//!   output: stderr      # stdout, stderr or a file path
//!   add_source: false
//! dry_run: false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use cloudctl_core::batch::MAX_CONCURRENCY;
use cloudctl_core::retry::{RetryOn, RetryPolicy};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub log: LogConfig,
    /// Preview runs against the dry-run provider.
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Per-attempt time limit, in seconds.
    pub timeout: u64,
    /// Groups processed at the same time, clamped to `1..=10`.
    pub concurrency: usize,
    pub retry: RetryConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            concurrency: 1,
            retry: RetryConfig::default(),
        }
    }
}

/// Delays are in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub enabled: bool,
    pub max_attempts: u32,
    pub initial_delay: u64,
    pub max_delay: u64,
    /// Only retry rate limiting, network and unclassified failures.
    pub transient_only: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            initial_delay: 1,
            max_delay: 30,
            transient_only: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Include the source file and line of each event.
    pub add_source: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Where log lines are written. Any value other than `stdout` or `stderr`
/// is a file path, opened for appending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogOutput {
    Stdout,
    #[default]
    Stderr,
    File(PathBuf),
}

impl From<String> for LogOutput {
    fn from(value: String) -> Self {
        match value.as_str() {
            "stdout" => Self::Stdout,
            "stderr" | "" => Self::Stderr,
            _ => Self::File(PathBuf::from(value)),
        }
    }
}

impl From<LogOutput> for String {
    fn from(output: LogOutput) -> Self {
        match output {
            LogOutput::Stdout => "stdout".to_string(),
            LogOutput::Stderr => "stderr".to_string(),
            LogOutput::File(path) => path.display().to_string(),
        }
    }
}

impl AppConfig {
    /// Read, parse and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| AppError::Io {
            path: display.clone(),
            source,
        })?;
        let config = Self::parse(&display, &content)?;
        log::debug!("Loaded configuration from {display}");
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml_str(content: &str) -> AppResult<Self> {
        Self::parse("<inline>", content)
    }

    fn parse(path: &str, content: &str) -> AppResult<Self> {
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| AppError::parse(path, &e))?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.api.timeout == 0 {
            return Err(AppError::Validation(
                "api.timeout must be greater than 0".to_string(),
            ));
        }

        let retry = &self.api.retry;
        if retry.enabled {
            if retry.max_attempts == 0 {
                return Err(AppError::Validation(
                    "api.retry.max_attempts must be greater than 0".to_string(),
                ));
            }
            if retry.initial_delay == 0 {
                return Err(AppError::Validation(
                    "api.retry.initial_delay must be greater than 0".to_string(),
                ));
            }
            if retry.max_delay == 0 {
                return Err(AppError::Validation(
                    "api.retry.max_delay must be greater than 0".to_string(),
                ));
            }
            if retry.initial_delay > retry.max_delay {
                return Err(AppError::Validation(format!(
                    "api.retry.initial_delay ({}) must not exceed api.retry.max_delay ({})",
                    retry.initial_delay, retry.max_delay
                )));
            }
        }
        Ok(())
    }

    /// The core retry policy this configuration describes.
    pub fn retry_policy(&self) -> RetryPolicy {
        let retry = &self.api.retry;
        RetryPolicy {
            enabled: retry.enabled,
            max_attempts: retry.max_attempts.max(1),
            initial_delay: Duration::from_secs(retry.initial_delay),
            max_delay: Duration::from_secs(retry.max_delay),
            retry_on: if retry.transient_only {
                RetryOn::TransientOnly
            } else {
                RetryOn::AllErrors
            },
            attempt_timeout: Some(Duration::from_secs(self.api.timeout)),
        }
    }

    /// Concurrency clamped to what the coordinator supports.
    pub fn effective_concurrency(&self) -> usize {
        let clamped = self.api.concurrency.clamp(1, MAX_CONCURRENCY);
        if clamped != self.api.concurrency {
            log::warn!(
                "api.concurrency {} is out of range, using {clamped}",
                self.api.concurrency
            );
        }
        clamped
    }
}
