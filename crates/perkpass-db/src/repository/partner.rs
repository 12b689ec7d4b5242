//! SurrealDB implementation of [`PartnerRepository`].

use chrono::{DateTime, Utc};
use perkpass_core::error::PerkpassResult;
use perkpass_core::models::partner::{CreatePartner, Partner, PartnerStatus};
use perkpass_core::repository::{PaginatedResult, Pagination, PartnerRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct PartnerRow {
    business_name: String,
    contact_email: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct PartnerRowWithId {
    record_id: String,
    business_name: String,
    contact_email: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_status(s: &str) -> Result<PartnerStatus, DbError> {
    match s {
        "Active" => Ok(PartnerStatus::Active),
        "Inactive" => Ok(PartnerStatus::Inactive),
        other => Err(DbError::Migration(format!(
            "unknown partner status: {other}"
        ))),
    }
}

impl PartnerRow {
    fn into_partner(self, id: Uuid) -> Result<Partner, DbError> {
        Ok(Partner {
            id,
            business_name: self.business_name,
            contact_email: self.contact_email,
            status: parse_status(&self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl PartnerRowWithId {
    fn try_into_partner(self) -> Result<Partner, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        Ok(Partner {
            id,
            business_name: self.business_name,
            contact_email: self.contact_email,
            status: parse_status(&self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Partner repository.
#[derive(Clone)]
pub struct SurrealPartnerRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPartnerRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> PartnerRepository for SurrealPartnerRepository<C> {
    async fn create(&self, input: CreatePartner) -> PerkpassResult<Partner> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('partner', $id) SET \
                 business_name = $business_name, \
                 contact_email = $contact_email, \
                 status = 'Active'",
            )
            .bind(("id", id_str.clone()))
            .bind(("business_name", input.business_name))
            .bind(("contact_email", input.contact_email))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from)?;

        let rows: Vec<PartnerRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "partner".into(),
            id: id_str,
        })?;

        Ok(row.into_partner(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> PerkpassResult<Partner> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('partner', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PartnerRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "partner".into(),
            id: id_str,
        })?;

        Ok(row.into_partner(id)?)
    }

    async fn deactivate(&self, id: Uuid) -> PerkpassResult<()> {
        self.db
            .query(
                "UPDATE type::record('partner', $id) SET \
                 status = 'Inactive', updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> PerkpassResult<PaginatedResult<Partner>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM partner GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM partner \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PartnerRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_partner())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
