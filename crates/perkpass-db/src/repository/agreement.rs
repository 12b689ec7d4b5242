//! SurrealDB implementation of [`AgreementRepository`].
//!
//! Discount values are stored as decimal strings; the repository
//! parses them back into `rust_decimal::Decimal` so no floating-point
//! representation ever touches a monetary term.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use perkpass_core::error::PerkpassResult;
use perkpass_core::models::agreement::{Agreement, CreateAgreement, DiscountType};
use perkpass_core::repository::{AgreementRepository, PaginatedResult, Pagination};
use rust_decimal::Decimal;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct AgreementRow {
    partner_id: String,
    discount_type: String,
    discount_value: String,
    description: Option<String>,
    terms: Option<String>,
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct AgreementRowWithId {
    record_id: String,
    partner_id: String,
    discount_type: String,
    discount_value: String,
    description: Option<String>,
    terms: Option<String>,
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_discount_type(s: &str) -> Result<DiscountType, DbError> {
    match s {
        "Percentage" => Ok(DiscountType::Percentage),
        "FixedAmount" => Ok(DiscountType::FixedAmount),
        "FreeItem" => Ok(DiscountType::FreeItem),
        "SpecialOffer" => Ok(DiscountType::SpecialOffer),
        other => Err(DbError::Migration(format!(
            "unknown discount type: {other}"
        ))),
    }
}

fn discount_type_to_string(t: &DiscountType) -> &'static str {
    match t {
        DiscountType::Percentage => "Percentage",
        DiscountType::FixedAmount => "FixedAmount",
        DiscountType::FreeItem => "FreeItem",
        DiscountType::SpecialOffer => "SpecialOffer",
    }
}

fn parse_amount(s: &str) -> Result<Decimal, DbError> {
    Decimal::from_str(s).map_err(|e| DbError::Migration(format!("invalid decimal '{s}': {e}")))
}

impl AgreementRow {
    fn into_agreement(self, id: Uuid) -> Result<Agreement, DbError> {
        let partner_id = Uuid::parse_str(&self.partner_id)
            .map_err(|e| DbError::Migration(format!("invalid partner UUID: {e}")))?;
        Ok(Agreement {
            id,
            partner_id,
            discount_type: parse_discount_type(&self.discount_type)?,
            discount_value: parse_amount(&self.discount_value)?,
            description: self.description,
            terms: self.terms,
            start_date: self.start_date,
            end_date: self.end_date,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl AgreementRowWithId {
    fn try_into_agreement(self) -> Result<Agreement, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        let partner_id = Uuid::parse_str(&self.partner_id)
            .map_err(|e| DbError::Migration(format!("invalid partner UUID: {e}")))?;
        Ok(Agreement {
            id,
            partner_id,
            discount_type: parse_discount_type(&self.discount_type)?,
            discount_value: parse_amount(&self.discount_value)?,
            description: self.description,
            terms: self.terms,
            start_date: self.start_date,
            end_date: self.end_date,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Agreement repository.
#[derive(Clone)]
pub struct SurrealAgreementRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAgreementRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AgreementRepository for SurrealAgreementRepository<C> {
    async fn create(&self, input: CreateAgreement) -> PerkpassResult<Agreement> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('agreement', $id) SET \
                 partner_id = $partner_id, \
                 discount_type = $discount_type, \
                 discount_value = $discount_value, \
                 description = $description, \
                 terms = $terms, \
                 start_date = $start_date, \
                 end_date = $end_date, \
                 is_active = true",
            )
            .bind(("id", id_str.clone()))
            .bind(("partner_id", input.partner_id.to_string()))
            .bind((
                "discount_type",
                discount_type_to_string(&input.discount_type).to_string(),
            ))
            .bind(("discount_value", input.discount_value.to_string()))
            .bind(("description", input.description))
            .bind(("terms", input.terms))
            .bind(("start_date", input.start_date))
            .bind(("end_date", input.end_date))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from)?;

        let rows: Vec<AgreementRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "agreement".into(),
            id: id_str,
        })?;

        Ok(row.into_agreement(id)?)
    }

    async fn get_for_partner(&self, partner_id: Uuid, id: Uuid) -> PerkpassResult<Agreement> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('agreement', $id) \
                 WHERE partner_id = $partner_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("partner_id", partner_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AgreementRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "agreement".into(),
            id: id_str,
        })?;

        Ok(row.into_agreement(id)?)
    }

    async fn current_for_partner(
        &self,
        partner_id: Uuid,
        now: DateTime<Utc>,
    ) -> PerkpassResult<Option<Agreement>> {
        // Most recently created wins when several agreements qualify.
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM agreement \
                 WHERE partner_id = $partner_id \
                 AND is_active = true \
                 AND start_date <= $now \
                 AND (end_date IS NONE OR end_date >= $now) \
                 ORDER BY created_at DESC \
                 LIMIT 1",
            )
            .bind(("partner_id", partner_id.to_string()))
            .bind(("now", now))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AgreementRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_agreement()?)),
            None => Ok(None),
        }
    }

    async fn deactivate(&self, partner_id: Uuid, id: Uuid) -> PerkpassResult<()> {
        // Soft-deactivate — agreement terms are never rewritten.
        self.db
            .query(
                "UPDATE type::record('agreement', $id) SET \
                 is_active = false, updated_at = time::now() \
                 WHERE partner_id = $partner_id",
            )
            .bind(("id", id.to_string()))
            .bind(("partner_id", partner_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list_by_partner(
        &self,
        partner_id: Uuid,
        pagination: Pagination,
    ) -> PerkpassResult<PaginatedResult<Agreement>> {
        let partner_id_str = partner_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM agreement \
                 WHERE partner_id = $partner_id GROUP ALL",
            )
            .bind(("partner_id", partner_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM agreement \
                 WHERE partner_id = $partner_id \
                 ORDER BY created_at DESC \
                 LIMIT $limit START $offset",
            )
            .bind(("partner_id", partner_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AgreementRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_agreement())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
