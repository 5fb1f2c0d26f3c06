//! Tracing subscriber setup.
//!
//! Console and file sinks share one filter and a local-time timer with
//! millisecond precision.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LogConfig;

/// `yyyy/MM/dd HH:mm:ss.fff`
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.3f";

/// Always appended unless `RUST_LOG` overrides the filter.
const LIBRARY_DIRECTIVES: &[&str] = &["serenity=warn", "tungstenite=warn"];

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to open log file {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("failed to install tracing subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Build the filter: `RUST_LOG` if set, otherwise the configured directives.
pub fn build_filter(directives: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let mut filter = EnvFilter::try_new(directives)?;
    for directive in LIBRARY_DIRECTIVES {
        filter = filter.add_directive(directive.parse()?);
    }
    Ok(filter)
}

/// Install the global subscriber. Returns the log file in use, if any.
pub fn init(config: &LogConfig) -> Result<Option<PathBuf>, LoggingError> {
    let filter = build_filter(&config.filter)?;

    let console = config.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()))
            .with_writer(std::io::stderr)
    });

    let log_file = config.resolve_file();
    let file = match &log_file {
        Some(path) => {
            let writer = open_log_file(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()))
                    .with_ansi(false)
                    .with_writer(Mutex::new(writer)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()?;

    Ok(log_file)
}

fn open_log_file(path: &Path) -> Result<std::fs::File, LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::File {
            path: path.to_path_buf(),
            source,
        })
}
