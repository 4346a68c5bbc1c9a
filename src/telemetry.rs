//! Logging setup
//!
//! Logs go to stderr, or to the configured file, so stdout stays free for
//! the dashboard.

use std::fs::OpenOptions;
use std::sync::Mutex;
use thiserror::Error;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::LoggingConfig;

/// Filter used when `RUST_LOG` is not set
pub fn default_directive(config: &LoggingConfig) -> String {
    format!("waitline={}", config.level)
}

/// Install the global subscriber
pub fn init_logging(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config)));

    let to_file = config.file.is_some();
    let writer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| TelemetryError::LogFile {
                    path: path.clone(),
                    error: e,
                })?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format.as_str() {
        "json" => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(writer)
            .boxed(),
        "pretty" => tracing_subscriber::fmt::layer()
            .pretty()
            .with_ansi(!to_file)
            .with_writer(writer)
            .boxed(),
        _ => tracing_subscriber::fmt::layer()
            .compact()
            .with_ansi(!to_file)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
        .map_err(|e| TelemetryError::Init(e.to_string()))
}

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to open log file {path}: {error}")]
    LogFile {
        path: String,
        #[source]
        error: std::io::Error,
    },

    #[error("Failed to install log subscriber: {0}")]
    Init(String),
}
