//! Member domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum MemberStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum MembershipType {
    Standard,
    Premium,
    Lifetime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    /// Human-facing membership identifier (e.g. `PM482913K7QX2M`).
    /// Used for display and audit, never for trust decisions.
    pub membership_ref: String,
    pub first_name: String,
    pub last_name: String,
    pub membership_type: MembershipType,
    pub status: MemberStatus,
    /// Mirror of the external account layer's active flag. A member is
    /// only verifiable while both this and `status` are active.
    pub account_active: bool,
    /// Cached serialized credential payload, if one has been minted.
    pub credential: Option<String>,
    /// Expiry of the cached credential; past this instant a fresh
    /// credential is minted on next access.
    pub credential_expires_at: Option<DateTime<Utc>>,
    pub joined_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    /// Whether this member currently passes the verification check.
    pub fn is_verifiable(&self) -> bool {
        self.status == MemberStatus::Active && self.account_active
    }

    /// Display name shown to partners on successful verification.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMember {
    pub membership_ref: String,
    pub first_name: String,
    pub last_name: String,
    pub membership_type: MembershipType,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateMember {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub membership_type: Option<MembershipType>,
    pub status: Option<MemberStatus>,
    pub account_active: Option<bool>,
    /// `Some(Some(val))` = set, `Some(None)` = clear, `None` = no change.
    pub credential: Option<Option<String>>,
    pub credential_expires_at: Option<Option<DateTime<Utc>>>,
}
