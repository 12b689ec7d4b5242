//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints; monetary amounts are stored as decimal strings
//! and parsed back at the repository layer.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Members
-- =======================================================================
DEFINE TABLE member SCHEMAFULL;
DEFINE FIELD membership_ref ON TABLE member TYPE string;
DEFINE FIELD first_name ON TABLE member TYPE string;
DEFINE FIELD last_name ON TABLE member TYPE string;
DEFINE FIELD membership_type ON TABLE member TYPE string \
    ASSERT $value IN ['Standard', 'Premium', 'Lifetime'];
DEFINE FIELD status ON TABLE member TYPE string \
    ASSERT $value IN ['Active', 'Inactive'];
DEFINE FIELD account_active ON TABLE member TYPE bool DEFAULT true;
DEFINE FIELD credential ON TABLE member TYPE option<string>;
DEFINE FIELD credential_expires_at ON TABLE member \
    TYPE option<datetime>;
DEFINE FIELD joined_at ON TABLE member TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD created_at ON TABLE member TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE member TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_member_membership_ref ON TABLE member \
    COLUMNS membership_ref UNIQUE;

-- =======================================================================
-- Partners
-- =======================================================================
DEFINE TABLE partner SCHEMAFULL;
DEFINE FIELD business_name ON TABLE partner TYPE string;
DEFINE FIELD contact_email ON TABLE partner TYPE string;
DEFINE FIELD status ON TABLE partner TYPE string \
    ASSERT $value IN ['Active', 'Inactive'];
DEFINE FIELD created_at ON TABLE partner TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE partner TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_partner_contact_email ON TABLE partner \
    COLUMNS contact_email UNIQUE;

-- =======================================================================
-- Partnership Agreements (partner scope)
-- =======================================================================
DEFINE TABLE agreement SCHEMAFULL;
DEFINE FIELD partner_id ON TABLE agreement TYPE string;
DEFINE FIELD discount_type ON TABLE agreement TYPE string \
    ASSERT $value IN ['Percentage', 'FixedAmount', 'FreeItem', \
    'SpecialOffer'];
DEFINE FIELD discount_value ON TABLE agreement TYPE string;
DEFINE FIELD description ON TABLE agreement TYPE option<string>;
DEFINE FIELD terms ON TABLE agreement TYPE option<string>;
DEFINE FIELD start_date ON TABLE agreement TYPE datetime;
DEFINE FIELD end_date ON TABLE agreement TYPE option<datetime>;
DEFINE FIELD is_active ON TABLE agreement TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE agreement TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE agreement TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_agreement_partner ON TABLE agreement \
    COLUMNS partner_id;

-- =======================================================================
-- Transactions (append-only ledger fact)
-- =======================================================================
DEFINE TABLE transaction SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD member_id ON TABLE transaction TYPE string;
DEFINE FIELD partner_id ON TABLE transaction TYPE string;
DEFINE FIELD agreement_id ON TABLE transaction TYPE string;
DEFINE FIELD original_amount ON TABLE transaction TYPE string;
DEFINE FIELD discount_amount ON TABLE transaction TYPE string;
DEFINE FIELD final_amount ON TABLE transaction TYPE string;
DEFINE FIELD description ON TABLE transaction TYPE option<string>;
DEFINE FIELD status ON TABLE transaction TYPE string \
    ASSERT $value IN ['Approved', 'Reversed'];
DEFINE FIELD processed_at ON TABLE transaction TYPE datetime;
DEFINE FIELD created_at ON TABLE transaction TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_transaction_partner ON TABLE transaction \
    COLUMNS partner_id, created_at;
DEFINE INDEX idx_transaction_member ON TABLE transaction \
    COLUMNS member_id, created_at;

-- =======================================================================
-- Usage History (member-facing mirror, append-only)
-- =======================================================================
DEFINE TABLE usage_history SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD member_id ON TABLE usage_history TYPE string;
DEFINE FIELD partner_id ON TABLE usage_history TYPE string;
DEFINE FIELD agreement_id ON TABLE usage_history TYPE string;
DEFINE FIELD original_amount ON TABLE usage_history TYPE string;
DEFINE FIELD discount_amount ON TABLE usage_history TYPE string;
DEFINE FIELD final_amount ON TABLE usage_history TYPE string;
DEFINE FIELD description ON TABLE usage_history TYPE option<string>;
DEFINE FIELD used_at ON TABLE usage_history TYPE datetime;
DEFINE INDEX idx_usage_member ON TABLE usage_history \
    COLUMNS member_id, used_at;
DEFINE INDEX idx_usage_partner ON TABLE usage_history \
    COLUMNS partner_id, used_at;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
