//! Error taxonomy for Blindstick.
//!
//! None of these errors is fatal to the monitor loop. Store failures fall back
//! to default data, malformed fields fall back to per-field defaults, and
//! delivery failures are reported but never retried inside a cooldown window.

use thiserror::Error;

/// Errors produced by the store, normalizer and notification layers.
#[derive(Debug, Error)]
pub enum Error {
    /// Every section of the backend failed to load (network or auth failure).
    #[error("store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    /// A single read or write against one store path failed.
    #[error("store request for '{path}' failed: {message}")]
    Store { path: String, message: String },

    /// A backend value had the wrong type or shape for its field.
    #[error("malformed field {section}.{field}, using default")]
    MalformedField {
        section: &'static str,
        field: &'static str,
    },

    /// The outbound notification channel was unreachable or rejected the message.
    #[error("notification delivery failed: {0}")]
    DeliveryFailure(String),

    /// Local SQLite store error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored section body could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn store(path: &str, message: impl ToString) -> Self {
        Error::Store {
            path: path.to_string(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
