//! SurrealDB implementation of [`LedgerRepository`].
//!
//! The transaction fact and its usage-history mirror are written in a
//! single `BEGIN TRANSACTION .. COMMIT` block: a failure in either
//! statement rolls back the other, so a reader can never observe one
//! half of the pair.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use perkpass_core::error::PerkpassResult;
use perkpass_core::models::transaction::{Transaction, TransactionStatus};
use perkpass_core::models::usage::UsageRecord;
use perkpass_core::repository::{
    LedgerRepository, NewDiscountRecord, PaginatedResult, Pagination,
};
use rust_decimal::Decimal;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct TransactionRow {
    member_id: String,
    partner_id: String,
    agreement_id: String,
    original_amount: String,
    discount_amount: String,
    final_amount: String,
    description: Option<String>,
    status: String,
    processed_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct TransactionRowWithId {
    record_id: String,
    member_id: String,
    partner_id: String,
    agreement_id: String,
    original_amount: String,
    discount_amount: String,
    final_amount: String,
    description: Option<String>,
    status: String,
    processed_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct UsageRow {
    member_id: String,
    partner_id: String,
    agreement_id: String,
    original_amount: String,
    discount_amount: String,
    final_amount: String,
    description: Option<String>,
    used_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct UsageRowWithId {
    record_id: String,
    member_id: String,
    partner_id: String,
    agreement_id: String,
    original_amount: String,
    discount_amount: String,
    final_amount: String,
    description: Option<String>,
    used_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_status(s: &str) -> Result<TransactionStatus, DbError> {
    match s {
        "Approved" => Ok(TransactionStatus::Approved),
        "Reversed" => Ok(TransactionStatus::Reversed),
        other => Err(DbError::Migration(format!(
            "unknown transaction status: {other}"
        ))),
    }
}

fn parse_amount(s: &str) -> Result<Decimal, DbError> {
    Decimal::from_str(s).map_err(|e| DbError::Migration(format!("invalid decimal '{s}': {e}")))
}

fn parse_uuid(s: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(s).map_err(|e| DbError::Migration(format!("invalid {what} UUID: {e}")))
}

impl TransactionRow {
    fn into_transaction(self, id: Uuid) -> Result<Transaction, DbError> {
        Ok(Transaction {
            id,
            member_id: parse_uuid(&self.member_id, "member")?,
            partner_id: parse_uuid(&self.partner_id, "partner")?,
            agreement_id: parse_uuid(&self.agreement_id, "agreement")?,
            original_amount: parse_amount(&self.original_amount)?,
            discount_amount: parse_amount(&self.discount_amount)?,
            final_amount: parse_amount(&self.final_amount)?,
            description: self.description,
            status: parse_status(&self.status)?,
            processed_at: self.processed_at,
            created_at: self.created_at,
        })
    }
}

impl TransactionRowWithId {
    fn try_into_transaction(self) -> Result<Transaction, DbError> {
        let id = parse_uuid(&self.record_id, "transaction")?;
        Ok(Transaction {
            id,
            member_id: parse_uuid(&self.member_id, "member")?,
            partner_id: parse_uuid(&self.partner_id, "partner")?,
            agreement_id: parse_uuid(&self.agreement_id, "agreement")?,
            original_amount: parse_amount(&self.original_amount)?,
            discount_amount: parse_amount(&self.discount_amount)?,
            final_amount: parse_amount(&self.final_amount)?,
            description: self.description,
            status: parse_status(&self.status)?,
            processed_at: self.processed_at,
            created_at: self.created_at,
        })
    }
}

impl UsageRow {
    fn into_usage(self, id: Uuid) -> Result<UsageRecord, DbError> {
        Ok(UsageRecord {
            id,
            member_id: parse_uuid(&self.member_id, "member")?,
            partner_id: parse_uuid(&self.partner_id, "partner")?,
            agreement_id: parse_uuid(&self.agreement_id, "agreement")?,
            original_amount: parse_amount(&self.original_amount)?,
            discount_amount: parse_amount(&self.discount_amount)?,
            final_amount: parse_amount(&self.final_amount)?,
            description: self.description,
            used_at: self.used_at,
        })
    }
}

impl UsageRowWithId {
    fn try_into_usage(self) -> Result<UsageRecord, DbError> {
        let id = parse_uuid(&self.record_id, "usage")?;
        Ok(UsageRecord {
            id,
            member_id: parse_uuid(&self.member_id, "member")?,
            partner_id: parse_uuid(&self.partner_id, "partner")?,
            agreement_id: parse_uuid(&self.agreement_id, "agreement")?,
            original_amount: parse_amount(&self.original_amount)?,
            discount_amount: parse_amount(&self.discount_amount)?,
            final_amount: parse_amount(&self.final_amount)?,
            description: self.description,
            used_at: self.used_at,
        })
    }
}

/// SurrealDB implementation of the Ledger repository.
#[derive(Clone)]
pub struct SurrealLedgerRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealLedgerRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> LedgerRepository for SurrealLedgerRepository<C> {
    async fn record_discount(
        &self,
        input: NewDiscountRecord,
    ) -> PerkpassResult<(Transaction, UsageRecord)> {
        let transaction_id = Uuid::new_v4();
        let usage_id = Uuid::new_v4();
        let transaction_id_str = transaction_id.to_string();
        let usage_id_str = usage_id.to_string();

        let result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 CREATE type::record('transaction', $transaction_id) SET \
                 member_id = $member_id, \
                 partner_id = $partner_id, \
                 agreement_id = $agreement_id, \
                 original_amount = $original_amount, \
                 discount_amount = $discount_amount, \
                 final_amount = $final_amount, \
                 description = $description, \
                 status = 'Approved', \
                 processed_at = $occurred_at; \
                 CREATE type::record('usage_history', $usage_id) SET \
                 member_id = $member_id, \
                 partner_id = $partner_id, \
                 agreement_id = $agreement_id, \
                 original_amount = $original_amount, \
                 discount_amount = $discount_amount, \
                 final_amount = $final_amount, \
                 description = $description, \
                 used_at = $occurred_at; \
                 COMMIT TRANSACTION;",
            )
            .bind(("transaction_id", transaction_id_str.clone()))
            .bind(("usage_id", usage_id_str.clone()))
            .bind(("member_id", input.member_id.to_string()))
            .bind(("partner_id", input.partner_id.to_string()))
            .bind(("agreement_id", input.agreement_id.to_string()))
            .bind(("original_amount", input.original_amount.to_string()))
            .bind(("discount_amount", input.discount_amount.to_string()))
            .bind(("final_amount", input.final_amount.to_string()))
            .bind(("description", input.description))
            .bind(("occurred_at", input.occurred_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from)?;

        // BEGIN/COMMIT each occupy a statement slot, so the CREATE
        // results sit at indices 1 and 2.
        let transaction_rows: Vec<TransactionRow> = result.take(1).map_err(DbError::from)?;
        let usage_rows: Vec<UsageRow> = result.take(2).map_err(DbError::from)?;

        let transaction = transaction_rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::NotFound {
                entity: "transaction".into(),
                id: transaction_id_str,
            })?
            .into_transaction(transaction_id)?;

        let usage = usage_rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::NotFound {
                entity: "usage_history".into(),
                id: usage_id_str,
            })?
            .into_usage(usage_id)?;

        Ok((transaction, usage))
    }

    async fn list_transactions_by_partner(
        &self,
        partner_id: Uuid,
        pagination: Pagination,
    ) -> PerkpassResult<PaginatedResult<Transaction>> {
        let partner_id_str = partner_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM transaction \
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
                "SELECT meta::id(id) AS record_id, * FROM transaction \
                 WHERE partner_id = $partner_id \
                 ORDER BY created_at DESC \
                 LIMIT $limit START $offset",
            )
            .bind(("partner_id", partner_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TransactionRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_transaction())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_usage_by_member(
        &self,
        member_id: Uuid,
        pagination: Pagination,
    ) -> PerkpassResult<PaginatedResult<UsageRecord>> {
        let member_id_str = member_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM usage_history \
                 WHERE member_id = $member_id GROUP ALL",
            )
            .bind(("member_id", member_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM usage_history \
                 WHERE member_id = $member_id \
                 ORDER BY used_at DESC \
                 LIMIT $limit START $offset",
            )
            .bind(("member_id", member_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UsageRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_usage())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
