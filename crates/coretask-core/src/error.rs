//! Error types for CoreTask

use thiserror::Error;

/// Result type alias using CoreTask's Error
pub type Result<T> = std::result::Result<T, Error>;

/// CoreTask error types
///
/// "Not found" on reads, updates and deletes is never an error: those paths
/// return `Option`/`bool`. The variants here are the genuinely exceptional
/// conditions that propagate out of the storage layer.
#[derive(Error, Debug)]
pub enum Error {
    /// Underlying key/value store fault (quota, corruption, locked file).
    #[error("storage error: {0}")]
    Store(#[from] rusqlite::Error),

    /// A value could not be serialized for persistence.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Import payload missing required list-typed collections or otherwise
    /// malformed; nothing is applied.
    #[error("invalid import format: {0}")]
    ImportFormat(String),

    /// Caller-side input problem that storage still checks (e.g. email shape).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Login rejected: unknown email or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Login rejected: account exists but is inactive.
    #[error("account disabled")]
    AccountDisabled,
}
