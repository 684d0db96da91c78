//! Shared error type for the FWIP engine
//!
//! The engine's failure surface is deliberately narrow: malformed scoring
//! input is absorbed by documented factor defaults, insufficient accuracy
//! data makes the rollback monitor a no-op rather than an error, and
//! duplicate queue/pattern writes resolve through upserts. What remains
//! here is storage failure, rejected requests, and stored state that no
//! longer reads back.

use thiserror::Error;

/// Shared result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the engine's storage and service layers
#[derive(Error, Debug)]
pub enum Error {
    /// Storage failure; fatal to the current operation. Transactional
    /// boundaries ensure no partial routing or rollback state commits.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O failure resolving the root folder or TOML configuration
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or startup validation failure, e.g. scoring
    /// weights that do not sum to 1.0 or inverted routing thresholds
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested document, pattern, rule, or queue entry does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rejected request parameter or an illegal lifecycle transition
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Stored state failed to parse back or is internally inconsistent
    #[error("Corrupt stored state: {0}")]
    Corrupt(String),
}
