//! Partnership agreement domain model.
//!
//! An agreement is a partner-scoped, time-bounded discount rule. It is
//! soft-deactivated rather than deleted, and its terms are never mutated
//! once transactions reference it — a replacement agreement is created
//! instead.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    Percentage,
    FixedAmount,
    FreeItem,
    SpecialOffer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agreement {
    pub id: Uuid,
    pub partner_id: Uuid,
    pub discount_type: DiscountType,
    /// Percentage points for `Percentage`, a monetary amount otherwise.
    pub discount_value: Decimal,
    pub description: Option<String>,
    pub terms: Option<String>,
    pub start_date: DateTime<Utc>,
    /// `None` means open-ended.
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agreement {
    /// Whether the agreement authorizes discounts at `now`: it must be
    /// active and `now` must fall inside its validity window.
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.start_date <= now
            && self.end_date.is_none_or(|end| end >= now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAgreement {
    pub partner_id: Uuid,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub description: Option<String>,
    pub terms: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}
