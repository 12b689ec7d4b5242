//! SurrealDB implementation of [`MemberRepository`].

use chrono::{DateTime, Utc};
use perkpass_core::error::PerkpassResult;
use perkpass_core::models::member::{
    CreateMember, Member, MemberStatus, MembershipType, UpdateMember,
};
use perkpass_core::repository::{MemberRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct MemberRow {
    membership_ref: String,
    first_name: String,
    last_name: String,
    membership_type: String,
    status: String,
    account_active: bool,
    credential: Option<String>,
    credential_expires_at: Option<DateTime<Utc>>,
    joined_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct MemberRowWithId {
    record_id: String,
    membership_ref: String,
    first_name: String,
    last_name: String,
    membership_type: String,
    status: String,
    account_active: bool,
    credential: Option<String>,
    credential_expires_at: Option<DateTime<Utc>>,
    joined_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_status(s: &str) -> Result<MemberStatus, DbError> {
    match s {
        "Active" => Ok(MemberStatus::Active),
        "Inactive" => Ok(MemberStatus::Inactive),
        other => Err(DbError::Migration(format!("unknown member status: {other}"))),
    }
}

fn status_to_string(s: &MemberStatus) -> &'static str {
    match s {
        MemberStatus::Active => "Active",
        MemberStatus::Inactive => "Inactive",
    }
}

fn parse_membership_type(s: &str) -> Result<MembershipType, DbError> {
    match s {
        "Standard" => Ok(MembershipType::Standard),
        "Premium" => Ok(MembershipType::Premium),
        "Lifetime" => Ok(MembershipType::Lifetime),
        other => Err(DbError::Migration(format!(
            "unknown membership type: {other}"
        ))),
    }
}

fn membership_type_to_string(t: &MembershipType) -> &'static str {
    match t {
        MembershipType::Standard => "Standard",
        MembershipType::Premium => "Premium",
        MembershipType::Lifetime => "Lifetime",
    }
}

impl MemberRow {
    fn into_member(self, id: Uuid) -> Result<Member, DbError> {
        Ok(Member {
            id,
            membership_ref: self.membership_ref,
            first_name: self.first_name,
            last_name: self.last_name,
            membership_type: parse_membership_type(&self.membership_type)?,
            status: parse_status(&self.status)?,
            account_active: self.account_active,
            credential: self.credential,
            credential_expires_at: self.credential_expires_at,
            joined_at: self.joined_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl MemberRowWithId {
    fn try_into_member(self) -> Result<Member, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        Ok(Member {
            id,
            membership_ref: self.membership_ref,
            first_name: self.first_name,
            last_name: self.last_name,
            membership_type: parse_membership_type(&self.membership_type)?,
            status: parse_status(&self.status)?,
            account_active: self.account_active,
            credential: self.credential,
            credential_expires_at: self.credential_expires_at,
            joined_at: self.joined_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Member repository.
#[derive(Clone)]
pub struct SurrealMemberRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMemberRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> MemberRepository for SurrealMemberRepository<C> {
    async fn create(&self, input: CreateMember) -> PerkpassResult<Member> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('member', $id) SET \
                 membership_ref = $membership_ref, \
                 first_name = $first_name, \
                 last_name = $last_name, \
                 membership_type = $membership_type, \
                 status = 'Active', \
                 account_active = true, \
                 credential = NONE, \
                 credential_expires_at = NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("membership_ref", input.membership_ref))
            .bind(("first_name", input.first_name))
            .bind(("last_name", input.last_name))
            .bind((
                "membership_type",
                membership_type_to_string(&input.membership_type).to_string(),
            ))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from)?;

        let rows: Vec<MemberRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "member".into(),
            id: id_str,
        })?;

        Ok(row.into_member(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> PerkpassResult<Member> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('member', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MemberRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "member".into(),
            id: id_str,
        })?;

        Ok(row.into_member(id)?)
    }

    async fn get_by_membership_ref(&self, membership_ref: &str) -> PerkpassResult<Member> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM member \
                 WHERE membership_ref = $membership_ref",
            )
            .bind(("membership_ref", membership_ref.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MemberRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "member".into(),
            id: format!("membership_ref={membership_ref}"),
        })?;

        Ok(row.try_into_member()?)
    }

    async fn update(&self, id: Uuid, input: UpdateMember) -> PerkpassResult<Member> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.first_name.is_some() {
            sets.push("first_name = $first_name");
        }
        if input.last_name.is_some() {
            sets.push("last_name = $last_name");
        }
        if input.membership_type.is_some() {
            sets.push("membership_type = $membership_type");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        if input.account_active.is_some() {
            sets.push("account_active = $account_active");
        }
        if input.credential.is_some() {
            sets.push("credential = $credential");
        }
        if input.credential_expires_at.is_some() {
            sets.push("credential_expires_at = $credential_expires_at");
        }
        sets.push("updated_at = time::now()");

        let query = format!("UPDATE type::record('member', $id) SET {}", sets.join(", "));

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(first_name) = input.first_name {
            builder = builder.bind(("first_name", first_name));
        }
        if let Some(last_name) = input.last_name {
            builder = builder.bind(("last_name", last_name));
        }
        if let Some(ref membership_type) = input.membership_type {
            builder = builder.bind((
                "membership_type",
                membership_type_to_string(membership_type).to_string(),
            ));
        }
        if let Some(ref status) = input.status {
            builder = builder.bind(("status", status_to_string(status).to_string()));
        }
        if let Some(account_active) = input.account_active {
            builder = builder.bind(("account_active", account_active));
        }
        if let Some(credential) = input.credential {
            // credential is Option<Option<String>>:
            // Some(Some(v)) = set, Some(None) = clear
            builder = builder.bind(("credential", credential));
        }
        if let Some(credential_expires_at) = input.credential_expires_at {
            builder = builder.bind(("credential_expires_at", credential_expires_at));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(DbError::from)?;

        let rows: Vec<MemberRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "member".into(),
            id: id_str,
        })?;

        Ok(row.into_member(id)?)
    }

    async fn deactivate(&self, id: Uuid) -> PerkpassResult<()> {
        // Soft-delete: sets status to Inactive, nothing is removed.
        self.db
            .query(
                "UPDATE type::record('member', $id) SET \
                 status = 'Inactive', updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> PerkpassResult<PaginatedResult<Member>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM member GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM member \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MemberRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_member())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
