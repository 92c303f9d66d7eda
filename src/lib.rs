//! Case-management core for a small legal practice: case lifecycle and
//! access control, attached documents and calendar events, and the
//! nightly inactivity sweep. Transport, auth token handling, object
//! storage and mail delivery are external collaborators consumed through
//! the narrow contracts in [`storage`] and [`notify`].

pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod notify;
pub mod policy;
pub mod service;
pub mod storage;
pub mod sweeper;

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Structured JSON logs to a daily-rolling file, filter from
/// `RUST_LOG` with an `info` default.
pub fn init_tracing(data_dir: &Path) -> Result<(), String> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "causas.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}
