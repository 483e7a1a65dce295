//! Error types for the eventsite crates.

use thiserror::Error;

/// Errors that can occur while fetching, persisting or rendering events.
#[derive(Error, Debug)]
pub enum EventSiteError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Could not reach calendar provider: {0}")]
    Transport(String),

    #[error("Calendar provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Unexpected response from calendar provider: {0}")]
    MalformedResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for EventSiteError {
    fn from(err: serde_json::Error) -> Self {
        EventSiteError::Serialization(err.to_string())
    }
}

/// Result type alias for eventsite operations.
pub type EventSiteResult<T> = Result<T, EventSiteError>;
