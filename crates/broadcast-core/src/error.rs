//! Error types shared across all Broadcast crates.

use thiserror::Error;

/// Unified error for campaign setup, transport and ledger operations.
#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The backend answered with a non-2xx status. `body` is the raw response.
    #[error("received non-OK response status: {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Malformed backend response: {0}")]
    Decode(String),

    #[error("file not found: {0}")]
    AssetNotFound(String),

    #[error("message source '{0}' produced no variants")]
    EmptyMessages(String),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BroadcastError>;
