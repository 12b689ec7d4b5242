//! Verification & discount engine — request orchestration.
//!
//! Stateless between requests: all live state is read from the
//! repositories on every call. Within one `apply_discount` call the
//! member/agreement re-validation completes before any monetary
//! computation, and the ledger pair is written under a single storage
//! transaction.

use chrono::{DateTime, Utc};
use perkpass_core::error::PerkpassError;
use perkpass_core::models::agreement::DiscountType;
use perkpass_core::models::member::{Member, MembershipType, UpdateMember};
use perkpass_core::repository::{
    AgreementRepository, LedgerRepository, MemberRepository, NewDiscountRecord,
};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::codec;
use crate::config::AccessConfig;
use crate::error::AccessError;

/// Successful read-only verification of a presented credential.
#[derive(Debug, Clone)]
pub struct Verification {
    pub member_id: Uuid,
    pub membership_ref: String,
    pub member_name: String,
    pub membership_type: MembershipType,
    pub agreement_id: Uuid,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub agreement_description: Option<String>,
}

/// Input for the discount-application flow.
#[derive(Debug, Clone)]
pub struct ApplyDiscountInput {
    pub member_id: Uuid,
    pub agreement_id: Uuid,
    pub partner_id: Uuid,
    pub original_amount: Decimal,
    pub description: Option<String>,
}

/// Result of one recorded discount application.
#[derive(Debug, Clone)]
pub struct DiscountOutcome {
    pub transaction_id: Uuid,
    pub original_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
}

/// A credential payload handed to the member side for display.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    /// Serialized wire form — this string is what gets rendered as a
    /// QR image by the presentation layer.
    pub payload: String,
    pub expires_at: DateTime<Utc>,
}

/// Verification & discount engine.
///
/// Generic over repository implementations so the engine carries no
/// dependency on the database crate.
pub struct AccessService<M, A, L>
where
    M: MemberRepository,
    A: AgreementRepository,
    L: LedgerRepository,
{
    members: M,
    agreements: A,
    ledger: L,
    config: AccessConfig,
}

impl<M, A, L> AccessService<M, A, L>
where
    M: MemberRepository,
    A: AgreementRepository,
    L: LedgerRepository,
{
    pub fn new(members: M, agreements: A, ledger: L, config: AccessConfig) -> Self {
        Self {
            members,
            agreements,
            ledger,
            config,
        }
    }

    /// Read-only check that a presented credential and partner
    /// combination currently authorizes a discount. No side effects.
    pub async fn verify_member(
        &self,
        raw_credential: &str,
        partner_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Verification, AccessError> {
        // 1. Structural decode.
        let credential = codec::parse(raw_credential)?;

        // 2. Expiry + signature. The two causes collapse into one
        //    outward code; only the log distinguishes them.
        let ttl = self.config.credential_ttl();
        if credential.is_expired(now, ttl) {
            debug!(subject_id = %credential.subject_id, "credential expired");
            return Err(AccessError::InvalidCredential);
        }
        if !credential.signature_matches(self.config.secret_bytes()) {
            warn!(subject_id = %credential.subject_id, "credential signature mismatch");
            return Err(AccessError::InvalidCredential);
        }

        // 3. Resolve the subject against live state.
        let member = self.resolve_member(credential.subject_id).await?;

        // 4. Resolve the partner's current agreement.
        let agreement = self
            .agreements
            .current_for_partner(partner_id, now)
            .await?
            .ok_or(AccessError::NoActiveAgreement)?;

        info!(
            member_id = %member.id,
            partner_id = %partner_id,
            agreement_id = %agreement.id,
            membership_ref = %member.membership_ref,
            "member verified"
        );

        Ok(Verification {
            member_id: member.id,
            membership_ref: member.membership_ref.clone(),
            member_name: member.display_name(),
            membership_type: member.membership_type.clone(),
            agreement_id: agreement.id,
            discount_type: agreement.discount_type,
            discount_value: agreement.discount_value,
            agreement_description: agreement.description,
        })
    }

    /// Compute and permanently record a discount event.
    ///
    /// Member and agreement are re-resolved and re-validated here even
    /// when a prior `verify_member` call succeeded — the agreement may
    /// have expired or been deactivated in between. Each successful
    /// call appends a fresh ledger pair: the operation is deliberately
    /// not idempotent.
    pub async fn apply_discount(
        &self,
        input: ApplyDiscountInput,
        now: DateTime<Utc>,
    ) -> Result<DiscountOutcome, AccessError> {
        if input.original_amount.is_sign_negative() {
            return Err(AccessError::InvalidAmount(format!(
                "original amount must not be negative, got {}",
                input.original_amount
            )));
        }

        let member = self.resolve_member(input.member_id).await?;

        // Never trust a caller-supplied agreement id: re-fetch it
        // scoped to the partner and re-check the validity window.
        let agreement = self
            .agreements
            .get_for_partner(input.partner_id, input.agreement_id)
            .await
            .map_err(|e| match e {
                PerkpassError::NotFound { .. } => AccessError::NoActiveAgreement,
                other => AccessError::Repository(other),
            })?;
        if !agreement.is_current(now) {
            return Err(AccessError::NoActiveAgreement);
        }

        let breakdown =
            crate::discount::compute(agreement.discount_type, agreement.discount_value, input.original_amount);

        let (transaction, _usage) = self
            .ledger
            .record_discount(NewDiscountRecord {
                member_id: member.id,
                partner_id: input.partner_id,
                agreement_id: agreement.id,
                original_amount: input.original_amount,
                discount_amount: breakdown.discount_amount,
                final_amount: breakdown.final_amount,
                description: input.description,
                occurred_at: now,
            })
            .await
            .map_err(|e| match e {
                // A storage conflict is retryable by the caller.
                PerkpassError::Conflict(_) => AccessError::Repository(e),
                other => AccessError::Recording(other.to_string()),
            })?;

        info!(
            transaction_id = %transaction.id,
            member_id = %member.id,
            partner_id = %input.partner_id,
            agreement_id = %agreement.id,
            original_amount = %input.original_amount,
            discount_amount = %breakdown.discount_amount,
            final_amount = %breakdown.final_amount,
            "discount applied"
        );

        Ok(DiscountOutcome {
            transaction_id: transaction.id,
            original_amount: input.original_amount,
            discount_amount: breakdown.discount_amount,
            final_amount: breakdown.final_amount,
            discount_type: agreement.discount_type,
            discount_value: agreement.discount_value,
        })
    }

    /// Return the member's cached credential if still inside its expiry
    /// window, otherwise mint and cache a fresh one.
    pub async fn current_credential(
        &self,
        member_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<IssuedCredential, AccessError> {
        let member = self.resolve_member(member_id).await?;

        if let (Some(payload), Some(expires_at)) =
            (member.credential.clone(), member.credential_expires_at)
            && expires_at > now
        {
            return Ok(IssuedCredential {
                payload,
                expires_at,
            });
        }

        self.mint_and_cache(&member, now).await
    }

    /// Mint a fresh credential unconditionally, superseding any cached
    /// one. Old payloads are never reissued with extended life.
    pub async fn regenerate_credential(
        &self,
        member_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<IssuedCredential, AccessError> {
        let member = self.resolve_member(member_id).await?;
        self.mint_and_cache(&member, now).await
    }

    async fn mint_and_cache(
        &self,
        member: &Member,
        now: DateTime<Utc>,
    ) -> Result<IssuedCredential, AccessError> {
        let credential = codec::mint(member.id, &member.membership_ref, now, &self.config)?;
        let payload = codec::serialize(&credential)?;
        let expires_at = now + self.config.credential_ttl();

        self.members
            .update(
                member.id,
                UpdateMember {
                    credential: Some(Some(payload.clone())),
                    credential_expires_at: Some(Some(expires_at)),
                    ..Default::default()
                },
            )
            .await?;

        info!(
            member_id = %member.id,
            %expires_at,
            "credential minted"
        );

        Ok(IssuedCredential {
            payload,
            expires_at,
        })
    }

    /// Look up a member and require it to be verifiable (member row
    /// active AND owning account active).
    async fn resolve_member(&self, member_id: Uuid) -> Result<Member, AccessError> {
        let member = self
            .members
            .get_by_id(member_id)
            .await
            .map_err(|e| match e {
                PerkpassError::NotFound { .. } => AccessError::SubjectNotFound,
                other => AccessError::Repository(other),
            })?;

        if !member.is_verifiable() {
            return Err(AccessError::SubjectInactive);
        }

        Ok(member)
    }
}
