/// Structured logging for the reservoir storage proxy
///
/// Installs a `tracing` subscriber (console, plus an optional append-only
/// log file for daemon operation) and provides helpers that tag events
/// with their data source and classify upstream failures by severity.

use std::fmt;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::model::SafetyDataError;

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    SafetyData,
    Server,
    Config,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::SafetyData => write!(f, "SAFETYDATA"),
            DataSource::Server => write!(f, "HTTP"),
            DataSource::Config => write!(f, "CONFIG"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - missing configuration or a bad client request
    Expected,
    /// Unexpected failure - indicates service degradation or an API change
    Unexpected,
    /// Unknown - the upstream refused the request for its own reasons
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Classify a SafetyData fetch failure.
pub fn classify_failure(err: &SafetyDataError) -> FailureType {
    match err {
        SafetyDataError::MissingServiceKey
        | SafetyDataError::InvalidDate(_)
        | SafetyDataError::InvalidUrl(_) => FailureType::Expected,
        SafetyDataError::Http(_) | SafetyDataError::Parse(_) => FailureType::Unexpected,
        SafetyDataError::UpstreamStatus(code) if *code >= 500 => FailureType::Unexpected,
        SafetyDataError::UpstreamStatus(_) | SafetyDataError::UpstreamApi { .. } => {
            FailureType::Unknown
        }
    }
}

// ---------------------------------------------------------------------------
// Subscriber setup
// ---------------------------------------------------------------------------

/// Install the global subscriber. `RUST_LOG` controls filtering (default
/// `info`). When `log_file` is given, events are also appended there
/// without ANSI colouring.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init_logging(log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            ),
            Err(e) => {
                eprintln!("Failed to open log file {}: {}", path.display(), e);
                None
            }
        }
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init();
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a SafetyData failure with automatic classification
pub fn log_fetch_failure(target_dt: &str, operation: &str, err: &SafetyDataError) {
    let failure_type = classify_failure(err);
    let source = DataSource::SafetyData;

    match failure_type {
        FailureType::Expected => {
            debug!(%source, target_dt, %failure_type, error = %err, "{} failed", operation)
        }
        FailureType::Unexpected => {
            error!(%source, target_dt, %failure_type, error = %err, "{} failed", operation)
        }
        FailureType::Unknown => {
            warn!(%source, target_dt, %failure_type, error = %err, "{} failed", operation)
        }
    }
}

// ---------------------------------------------------------------------------
// Fetch Summary Logging
// ---------------------------------------------------------------------------

/// Log how many upstream rows survived the region filter.
///
/// An upstream table with rows but none for the configured region usually
/// means the prefix or province name is wrong, so it is raised to a warning.
pub fn log_fetch_summary(target_dt: &str, total: usize, kept: usize) {
    let source = DataSource::SafetyData;
    if total > 0 && kept == 0 {
        warn!(%source, target_dt, total, kept, "no rows matched the region filter");
    } else {
        info!(%source, target_dt, total, kept, "fetch complete: {}/{} rows kept", kept, total);
    }
}
