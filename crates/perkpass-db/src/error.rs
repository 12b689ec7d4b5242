//! Database-specific error types and conversions.

use perkpass_core::error::PerkpassError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl From<DbError> for PerkpassError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => PerkpassError::NotFound { entity, id },
            DbError::Surreal(e) => {
                let message = e.to_string();
                // Unique-index rejections are safe for the caller to
                // retry after re-reading state.
                if message.contains("already contains") {
                    PerkpassError::Conflict(message)
                } else {
                    PerkpassError::Database(message)
                }
            }
            other => PerkpassError::Database(other.to_string()),
        }
    }
}
