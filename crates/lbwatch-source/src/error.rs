//! Source error types.
//!
//! The first three kinds are fatal to a monitoring session and
//! user-actionable; the messages must stay distinguishable because the
//! remedies differ (log into the venue vs. check the identifier).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Positions are private; the trader has not shared them")]
    PrivatePositions,

    #[error("User not found or position sharing is disabled")]
    UserNotFound,

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SourceError {
    /// Short machine-readable kind label, used by the notification sink
    /// and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::PrivatePositions => "private_positions",
            Self::UserNotFound => "user_not_found",
            Self::MalformedPayload(_) => "malformed_payload",
            Self::Json(_) => "malformed_payload",
        }
    }
}

pub type SourceResult<T> = Result<T, SourceError>;
