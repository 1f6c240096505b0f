//! Logging initialisation
//!
//! The libraries log through the `log` facade; this installs a
//! `tracing-subscriber` registry that also picks those records up and writes
//! them to the configured output.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing::Subscriber;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::config::{LogConfig, LogFormat, LogOutput};
use crate::error::{AppError, AppResult};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level when set. Returns `Ok(false)`
/// if a global subscriber (or `log` logger) was already installed, in which
/// case nothing changes. A log file that cannot be opened is an error.
pub fn init_logging(config: &LogConfig) -> AppResult<bool> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));
    let registry = tracing_subscriber::registry().with(filter);
    let layer = fmt_layer::<Layered<EnvFilter, Registry>>(config)?;

    if registry.with(layer).try_init().is_err() {
        return Ok(false);
    }
    tracing::debug!(
        "Logging initialised (level {}, format {:?}, output {:?})",
        config.level.as_str(),
        config.format,
        config.output
    );
    Ok(true)
}

/// The formatting layer for `config`, writing to its output.
pub(crate) fn fmt_layer<S>(config: &LogConfig) -> AppResult<Box<dyn Layer<S> + Send + Sync>>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    let writer = make_writer(&config.output)?;

    let layer = tracing_subscriber::fmt::layer()
        .with_file(config.add_source)
        .with_line_number(config.add_source)
        .with_writer(writer);

    Ok(match config.format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Text => layer.with_ansi(false).boxed(),
    })
}

fn make_writer(output: &LogOutput) -> AppResult<BoxMakeWriter> {
    Ok(match output {
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogOutput::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| AppError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
            BoxMakeWriter::new(Mutex::new(file))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    fn file_config(path: &std::path::Path, format: LogFormat, add_source: bool) -> LogConfig {
        LogConfig {
            level: LogLevel::Info,
            format,
            output: LogOutput::File(path.to_path_buf()),
            add_source,
        }
    }

    fn write_event(config: &LogConfig, message: &str) {
        let subscriber = tracing_subscriber::registry().with(fmt_layer::<Registry>(config).unwrap());
        tracing::subscriber::with_default(subscriber, || tracing::warn!("{message}"));
    }

    #[test]
    fn file_output_appends_with_source_location() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloudctl.log");
        let config = file_config(&path, LogFormat::Text, true);

        write_event(&config, "first run");
        write_event(&config, "second run");

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("first run"));
        assert!(content.contains("second run"));
        assert!(content.contains("logging.rs:"));
        assert!(!content.contains('\u{1b}'));
    }

    #[test]
    fn source_location_is_off_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloudctl.log");

        write_event(&file_config(&path, LogFormat::Text, false), "no location");

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("no location"));
        assert!(!content.contains("logging.rs"));
    }

    #[test]
    fn json_file_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloudctl.json");

        write_event(&file_config(&path, LogFormat::Json, true), "structured");

        let content = std::fs::read_to_string(&path).unwrap();
        let line: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(line["level"], "WARN");
        assert_eq!(line["fields"]["message"], "structured");
        assert!(line["filename"].as_str().unwrap().ends_with("logging.rs"));
    }

    #[test]
    fn unwritable_log_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = file_config(&dir.path().join("missing").join("x.log"), LogFormat::Text, false);
        let err = make_writer(&config.output).unwrap_err();
        assert!(matches!(err, AppError::Io { .. }));
    }
}
