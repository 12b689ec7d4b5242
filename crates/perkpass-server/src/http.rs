//! Axum HTTP handlers for the PerkPass server.
//!
//! Exposes the partner-side verification/discount endpoints, the
//! member-side credential endpoints, and a health check.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use perkpass_access::{AccessError, AccessService, ApplyDiscountInput};
use perkpass_core::error::PerkpassError;
use perkpass_core::models::agreement::DiscountType;
use perkpass_core::models::member::MembershipType;
use perkpass_db::repository::{
    SurrealAgreementRepository, SurrealLedgerRepository, SurrealMemberRepository,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use surrealdb::engine::remote::ws::Client;
use uuid::Uuid;

/// Shared application state for Axum handlers.
pub struct AppState {
    pub access: AccessService<
        SurrealMemberRepository<Client>,
        SurrealAgreementRepository<Client>,
        SurrealLedgerRepository<Client>,
    >,
}

/// Build the Axum router with all endpoints.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/partners/{partner_id}/verify-member", post(handle_verify_member))
        .route("/partners/{partner_id}/apply-discount", post(handle_apply_discount))
        .route("/members/{member_id}/credential", get(handle_current_credential))
        .route(
            "/members/{member_id}/credential/regenerate",
            post(handle_regenerate_credential),
        )
        .route("/health", get(handle_health))
        .with_state(state)
}

/// Map an engine error to the HTTP status it surfaces as.
fn status_for(err: &AccessError) -> StatusCode {
    match err {
        AccessError::MalformedCredential
        | AccessError::InvalidCredential
        | AccessError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
        AccessError::SubjectNotFound
        | AccessError::SubjectInactive
        | AccessError::NoActiveAgreement => StatusCode::NOT_FOUND,
        AccessError::Repository(PerkpassError::Conflict(_)) => StatusCode::CONFLICT,
        AccessError::Recording(_) | AccessError::Crypto(_) | AccessError::Repository(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_body(err: &AccessError) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "error": err.to_string() }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyMemberRequest {
    qr_code: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifiedMember {
    id: Uuid,
    name: String,
    membership_id: String,
    membership_type: MembershipType,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifiedDiscount {
    agreement_id: Uuid,
    #[serde(rename = "type")]
    discount_type: DiscountType,
    value: Decimal,
    description: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyMemberResponse {
    is_valid: bool,
    member: VerifiedMember,
    discount: VerifiedDiscount,
}

/// POST /partners/{partner_id}/verify-member -- read-only credential check
async fn handle_verify_member(
    State(state): State<Arc<AppState>>,
    Path(partner_id): Path<Uuid>,
    Json(req): Json<VerifyMemberRequest>,
) -> impl IntoResponse {
    match state
        .access
        .verify_member(&req.qr_code, partner_id, Utc::now())
        .await
    {
        Ok(v) => (
            StatusCode::OK,
            Json(serde_json::json!(VerifyMemberResponse {
                is_valid: true,
                member: VerifiedMember {
                    id: v.member_id,
                    name: v.member_name,
                    membership_id: v.membership_ref,
                    membership_type: v.membership_type,
                },
                discount: VerifiedDiscount {
                    agreement_id: v.agreement_id,
                    discount_type: v.discount_type,
                    value: v.discount_value,
                    description: v.agreement_description,
                },
            })),
        ),
        Err(e) => (
            status_for(&e),
            Json(serde_json::json!({
                "isValid": false,
                "error": e.to_string(),
            })),
        ),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplyDiscountRequest {
    member_id: Uuid,
    agreement_id: Uuid,
    original_amount: Decimal,
    description: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordedTransaction {
    id: Uuid,
    original_amount: Decimal,
    discount_amount: Decimal,
    final_amount: Decimal,
    discount_type: DiscountType,
    discount_value: Decimal,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApplyDiscountResponse {
    success: bool,
    transaction: RecordedTransaction,
}

/// POST /partners/{partner_id}/apply-discount -- record a discount event
async fn handle_apply_discount(
    State(state): State<Arc<AppState>>,
    Path(partner_id): Path<Uuid>,
    Json(req): Json<ApplyDiscountRequest>,
) -> impl IntoResponse {
    let input = ApplyDiscountInput {
        member_id: req.member_id,
        agreement_id: req.agreement_id,
        partner_id,
        original_amount: req.original_amount,
        description: req.description,
    };

    match state.access.apply_discount(input, Utc::now()).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(serde_json::json!(ApplyDiscountResponse {
                success: true,
                transaction: RecordedTransaction {
                    id: outcome.transaction_id,
                    original_amount: outcome.original_amount,
                    discount_amount: outcome.discount_amount,
                    final_amount: outcome.final_amount,
                    discount_type: outcome.discount_type,
                    discount_value: outcome.discount_value,
                },
            })),
        ),
        Err(e) => (status_for(&e), error_body(&e)),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CredentialResponse {
    qr_code: String,
    expiry: DateTime<Utc>,
}

/// GET /members/{member_id}/credential -- cached-or-fresh credential
async fn handle_current_credential(
    State(state): State<Arc<AppState>>,
    Path(member_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.access.current_credential(member_id, Utc::now()).await {
        Ok(issued) => (
            StatusCode::OK,
            Json(serde_json::json!(CredentialResponse {
                qr_code: issued.payload,
                expiry: issued.expires_at,
            })),
        ),
        Err(e) => (status_for(&e), error_body(&e)),
    }
}

/// POST /members/{member_id}/credential/regenerate -- force a fresh credential
async fn handle_regenerate_credential(
    State(state): State<Arc<AppState>>,
    Path(member_id): Path<Uuid>,
) -> impl IntoResponse {
    match state
        .access
        .regenerate_credential(member_id, Utc::now())
        .await
    {
        Ok(issued) => (
            StatusCode::OK,
            Json(serde_json::json!(CredentialResponse {
                qr_code: issued.payload,
                expiry: issued.expires_at,
            })),
        ),
        Err(e) => (status_for(&e), error_body(&e)),
    }
}

/// GET /health -- server info
async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
