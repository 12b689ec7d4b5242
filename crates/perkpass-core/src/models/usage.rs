//! Usage-history domain model.
//!
//! The member-facing mirror of a [`Transaction`]: one usage record is
//! created atomically with each transaction so a member's audit trail
//! can never diverge from the partner-facing ledger.
//!
//! [`Transaction`]: super::transaction::Transaction

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: Uuid,
    pub member_id: Uuid,
    pub partner_id: Uuid,
    pub agreement_id: Uuid,
    pub original_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub description: Option<String>,
    pub used_at: DateTime<Utc>,
}
