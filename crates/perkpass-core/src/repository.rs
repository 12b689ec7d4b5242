//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. The verification and discount
//! engine is generic over these traits so it carries no dependency on
//! the database crate.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::PerkpassResult;
use crate::models::{
    agreement::{Agreement, CreateAgreement},
    member::{CreateMember, Member, UpdateMember},
    partner::{CreatePartner, Partner},
    transaction::Transaction,
    usage::UsageRecord,
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Members
// ---------------------------------------------------------------------------

pub trait MemberRepository: Send + Sync {
    fn create(&self, input: CreateMember) -> impl Future<Output = PerkpassResult<Member>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = PerkpassResult<Member>> + Send;
    fn get_by_membership_ref(
        &self,
        membership_ref: &str,
    ) -> impl Future<Output = PerkpassResult<Member>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateMember,
    ) -> impl Future<Output = PerkpassResult<Member>> + Send;
    /// Soft-delete: sets status to Inactive.
    fn deactivate(&self, id: Uuid) -> impl Future<Output = PerkpassResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = PerkpassResult<PaginatedResult<Member>>> + Send;
}

// ---------------------------------------------------------------------------
// Partners
// ---------------------------------------------------------------------------

pub trait PartnerRepository: Send + Sync {
    fn create(&self, input: CreatePartner)
    -> impl Future<Output = PerkpassResult<Partner>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = PerkpassResult<Partner>> + Send;
    /// Soft-delete: sets status to Inactive.
    fn deactivate(&self, id: Uuid) -> impl Future<Output = PerkpassResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = PerkpassResult<PaginatedResult<Partner>>> + Send;
}

// ---------------------------------------------------------------------------
// Agreements (partner-scoped)
// ---------------------------------------------------------------------------

pub trait AgreementRepository: Send + Sync {
    fn create(
        &self,
        input: CreateAgreement,
    ) -> impl Future<Output = PerkpassResult<Agreement>> + Send;

    /// Fetch one agreement scoped to the named partner. An agreement id
    /// belonging to a different partner is NotFound.
    fn get_for_partner(
        &self,
        partner_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = PerkpassResult<Agreement>> + Send;

    /// Resolve the partner's currently applicable agreement: active,
    /// `start_date <= now`, and `end_date` absent or `>= now`. When
    /// several qualify the most recently created one wins.
    fn current_for_partner(
        &self,
        partner_id: Uuid,
        now: DateTime<Utc>,
    ) -> impl Future<Output = PerkpassResult<Option<Agreement>>> + Send;

    /// Soft-deactivate. Terms are never edited retroactively; a
    /// replacement agreement is created instead.
    fn deactivate(&self, partner_id: Uuid, id: Uuid)
    -> impl Future<Output = PerkpassResult<()>> + Send;

    fn list_by_partner(
        &self,
        partner_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = PerkpassResult<PaginatedResult<Agreement>>> + Send;
}

// ---------------------------------------------------------------------------
// Ledger (append-only)
// ---------------------------------------------------------------------------

/// Input for recording one discount application in the ledger.
#[derive(Debug, Clone)]
pub struct NewDiscountRecord {
    pub member_id: Uuid,
    pub partner_id: Uuid,
    pub agreement_id: Uuid,
    pub original_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

pub trait LedgerRepository: Send + Sync {
    /// Append one transaction fact and its member-facing usage-history
    /// mirror. The two writes happen under a single storage transaction:
    /// either both rows become visible or neither does.
    fn record_discount(
        &self,
        input: NewDiscountRecord,
    ) -> impl Future<Output = PerkpassResult<(Transaction, UsageRecord)>> + Send;

    fn list_transactions_by_partner(
        &self,
        partner_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = PerkpassResult<PaginatedResult<Transaction>>> + Send;

    fn list_usage_by_member(
        &self,
        member_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = PerkpassResult<PaginatedResult<UsageRecord>>> + Send;
}
