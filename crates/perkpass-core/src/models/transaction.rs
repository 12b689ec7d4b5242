//! Transaction domain model.
//!
//! A transaction is an append-only fact recorded exactly once per
//! successful discount application. After creation only the terminal
//! `status` field may change.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionStatus {
    Approved,
    Reversed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub member_id: Uuid,
    pub partner_id: Uuid,
    pub agreement_id: Uuid,
    pub original_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub description: Option<String>,
    pub status: TransactionStatus,
    pub processed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
