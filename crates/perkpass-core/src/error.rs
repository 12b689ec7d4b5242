//! Error types for the PerkPass system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PerkpassError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Verification failed: {reason}")]
    VerificationFailed { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    /// The storage layer rejected a write with a conflict. Safe to
    /// retry after re-reading the current state.
    #[error("Write conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type PerkpassResult<T> = Result<T, PerkpassError>;
