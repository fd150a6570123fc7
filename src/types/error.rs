//! Unified error type for the messaging feature
//!
//! Errors are cloneable so a single failed database open can be handed to
//! every caller that was waiting on it, and serializable so a UI layer can
//! display them as-is.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for the store, the feed client and the sync service
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum MessagingError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Collection not supported: {0}")]
    UnknownCollection(String),

    #[error("Index not supported: {0}")]
    UnknownIndex(String),

    #[error("Message not found: {0}")]
    MessageNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for MessagingError {
    fn from(err: std::io::Error) -> Self {
        MessagingError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for MessagingError {
    fn from(err: toml::de::Error) -> Self {
        MessagingError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for MessagingError {
    fn from(err: serde_json::Error) -> Self {
        MessagingError::Parse(err.to_string())
    }
}

impl From<rusqlite::Error> for MessagingError {
    fn from(err: rusqlite::Error) -> Self {
        MessagingError::Database(err.to_string())
    }
}

impl From<r2d2::Error> for MessagingError {
    fn from(err: r2d2::Error) -> Self {
        MessagingError::Database(err.to_string())
    }
}

impl From<reqwest::Error> for MessagingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            MessagingError::Parse(err.to_string())
        } else {
            MessagingError::Network(err.to_string())
        }
    }
}

impl From<tokio::task::JoinError> for MessagingError {
    fn from(err: tokio::task::JoinError) -> Self {
        MessagingError::Other(format!("Background task failed: {}", err))
    }
}

impl From<String> for MessagingError {
    fn from(err: String) -> Self {
        MessagingError::Other(err)
    }
}

impl From<&str> for MessagingError {
    fn from(err: &str) -> Self {
        MessagingError::Other(err.to_string())
    }
}

/// Result type alias using MessagingError
pub type Result<T> = std::result::Result<T, MessagingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serializes_tagged() {
        let err = MessagingError::MessageNotFound("abc".to_string());
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["type"], "MessageNotFound");
        assert_eq!(json["message"], "abc");
    }

    #[test]
    fn test_sqlite_error_maps_to_database() {
        let err: MessagingError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, MessagingError::Database(_)));
    }
}
