//! Monitor error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Source error: {0}")]
    Source(#[from] lbwatch_source::SourceError),

    #[error("Monitoring identifier is required")]
    MissingIdentifier,
}

pub type MonitorResult<T> = Result<T, MonitorError>;
