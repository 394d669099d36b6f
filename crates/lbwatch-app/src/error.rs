//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source error: {0}")]
    Source(#[from] lbwatch_source::SourceError),

    #[error("Monitor error: {0}")]
    Monitor(#[from] lbwatch_monitor::MonitorError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] lbwatch_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
