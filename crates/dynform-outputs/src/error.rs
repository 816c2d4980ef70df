//! Port error types

use thiserror::Error;

/// Outbound mail failure
#[derive(Error, Debug)]
pub enum MailError {
    #[error("document \"{0}\" not found")]
    DocumentNotFound(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("mail API returned HTTP {0}")]
    Rejected(u16),
}

/// Asset or record storage failure
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("invalid path \"{0}\"")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
