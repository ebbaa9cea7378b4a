//! Error types for pitystat
//!
//! All errors are derived from `thiserror` for convenient error handling
//! and automatic `From` implementations. Persistence failures are usually
//! collected into lists (see [`crate::storage::LoadReport`]) rather than
//! propagated, so the in-memory state stays usable even when a file on
//! disk is damaged.

use thiserror::Error;

/// Main error type for pitystat operations
#[derive(Error, Debug)]
pub enum PitystatError {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The remote log API answered with a non-zero retcode
    #[error("Remote response error: {0}")]
    Remote(String),

    /// A response field could not be interpreted
    #[error("Malformed response field: {0}")]
    MalformedResponse(String),

    /// The run was cancelled cooperatively; partial progress is retained
    #[error("Operation cancelled")]
    Cancelled,

    /// A synchronization or counting run is already in flight
    #[error("Another task is already running")]
    Busy,

    /// Player URL is missing or unparseable
    #[error("Invalid player URL: {0}")]
    InvalidUrl(String),

    /// Item type string from the remote API was not recognised
    #[error("Unknown item category: {0}")]
    UnknownItemCategory(String),

    /// Rarity outside the 3..=5 range
    #[error("Invalid rarity: {0}")]
    InvalidRarity(u8),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Convenience type alias for Results in pitystat
pub type Result<T> = std::result::Result<T, PitystatError>;
