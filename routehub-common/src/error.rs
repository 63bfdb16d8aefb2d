//! Common error types for RouteHub admin tooling

use thiserror::Error;

/// Common result type for RouteHub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across RouteHub crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Named association type could not be resolved upstream.
    ///
    /// Fatal to a reconciliation run: raised before any write is issued.
    #[error("Association type not found: {0}")]
    LookupFailure(String),

    /// Invalid input or value rejected at ingestion
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Backend answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Request never produced a response (connect, timeout, TLS)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}

impl Error {
    /// Short cause string recorded against a failed batch
    pub fn cause(&self) -> String {
        match self {
            Error::Http { status, body } if body.is_empty() => format!("HTTP {}", status),
            other => other.to_string(),
        }
    }
}
