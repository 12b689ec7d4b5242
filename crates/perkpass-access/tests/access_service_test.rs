//! End-to-end engine tests over in-memory SurrealDB repositories.

use chrono::{DateTime, Duration, Utc};
use perkpass_access::{AccessConfig, AccessError, AccessService, ApplyDiscountInput};
use perkpass_core::models::agreement::{CreateAgreement, DiscountType};
use perkpass_core::models::member::{CreateMember, MembershipType};
use perkpass_core::models::partner::CreatePartner;
use perkpass_core::repository::{
    AgreementRepository, MemberRepository, PartnerRepository,
};
use perkpass_db::repository::{
    SurrealAgreementRepository, SurrealLedgerRepository, SurrealMemberRepository,
    SurrealPartnerRepository,
};
use rust_decimal::Decimal;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

type Conn = surrealdb::engine::local::Db;
type Db = Surreal<Conn>;
type Engine = AccessService<
    SurrealMemberRepository<Conn>,
    SurrealAgreementRepository<Conn>,
    SurrealLedgerRepository<Conn>,
>;

struct Fixture {
    db: Db,
    engine: Engine,
    member_id: Uuid,
    partner_id: Uuid,
    agreement_id: Uuid,
}

/// One member, one partner, one live 15%-off agreement.
async fn setup(now: DateTime<Utc>) -> Fixture {
    let db: Db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    perkpass_db::run_migrations(&db).await.unwrap();

    let member = SurrealMemberRepository::new(db.clone())
        .create(CreateMember {
            membership_ref: "PM900000TESTAA".into(),
            first_name: "Mai".into(),
            last_name: "Pham".into(),
            membership_type: MembershipType::Premium,
        })
        .await
        .unwrap();

    let partner = SurrealPartnerRepository::new(db.clone())
        .create(CreatePartner {
            business_name: "Noodle House".into(),
            contact_email: "hello@noodles.example".into(),
        })
        .await
        .unwrap();

    let agreement = SurrealAgreementRepository::new(db.clone())
        .create(CreateAgreement {
            partner_id: partner.id,
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::new(15, 0),
            description: Some("15% off meals".into()),
            terms: None,
            start_date: now - Duration::days(1),
            end_date: None,
        })
        .await
        .unwrap();

    let config = AccessConfig::new("test-signing-secret").unwrap();
    let engine = AccessService::new(
        SurrealMemberRepository::new(db.clone()),
        SurrealAgreementRepository::new(db.clone()),
        SurrealLedgerRepository::new(db.clone()),
        config,
    );

    Fixture {
        db,
        engine,
        member_id: member.id,
        partner_id: partner.id,
        agreement_id: agreement.id,
    }
}

#[tokio::test]
async fn credential_verifies_within_lifetime_and_expires_after() {
    let t0 = Utc::now();
    let fx = setup(t0).await;

    let issued = fx.engine.current_credential(fx.member_id, t0).await.unwrap();

    // One hour in: still good.
    let verification = fx
        .engine
        .verify_member(&issued.payload, fx.partner_id, t0 + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(verification.member_id, fx.member_id);
    assert_eq!(verification.membership_ref, "PM900000TESTAA");
    assert_eq!(verification.member_name, "Mai Pham");
    assert_eq!(verification.membership_type, MembershipType::Premium);
    assert_eq!(verification.agreement_id, fx.agreement_id);
    assert_eq!(verification.discount_type, DiscountType::Percentage);
    assert_eq!(verification.discount_value, Decimal::new(15, 0));

    // Twenty-five hours in: past the 24h lifetime.
    let expired = fx
        .engine
        .verify_member(&issued.payload, fx.partner_id, t0 + Duration::hours(25))
        .await;
    assert!(matches!(expired, Err(AccessError::InvalidCredential)));
}

#[tokio::test]
async fn tampered_credential_is_rejected() {
    let t0 = Utc::now();
    let fx = setup(t0).await;

    let issued = fx.engine.current_credential(fx.member_id, t0).await.unwrap();
    let tampered = issued
        .payload
        .replace("PM900000TESTAA", "PM900000TESTAB");

    let result = fx
        .engine
        .verify_member(&tampered, fx.partner_id, t0 + Duration::minutes(1))
        .await;
    assert!(matches!(result, Err(AccessError::InvalidCredential)));
}

#[tokio::test]
async fn garbage_payload_is_malformed() {
    let t0 = Utc::now();
    let fx = setup(t0).await;

    let result = fx
        .engine
        .verify_member("not a credential at all", fx.partner_id, t0)
        .await;
    assert!(matches!(result, Err(AccessError::MalformedCredential)));
}

#[tokio::test]
async fn inactive_member_fails_verification() {
    let t0 = Utc::now();
    let fx = setup(t0).await;

    let issued = fx.engine.current_credential(fx.member_id, t0).await.unwrap();
    SurrealMemberRepository::new(fx.db.clone())
        .deactivate(fx.member_id)
        .await
        .unwrap();

    let result = fx
        .engine
        .verify_member(&issued.payload, fx.partner_id, t0 + Duration::minutes(1))
        .await;
    assert!(matches!(result, Err(AccessError::SubjectInactive)));
}

#[tokio::test]
async fn partner_without_agreement_fails_verification() {
    let t0 = Utc::now();
    let fx = setup(t0).await;

    let bare_partner = SurrealPartnerRepository::new(fx.db.clone())
        .create(CreatePartner {
            business_name: "No Deal Diner".into(),
            contact_email: "nodeal@example.com".into(),
        })
        .await
        .unwrap();

    let issued = fx.engine.current_credential(fx.member_id, t0).await.unwrap();
    let result = fx
        .engine
        .verify_member(&issued.payload, bare_partner.id, t0)
        .await;
    assert!(matches!(result, Err(AccessError::NoActiveAgreement)));
}

#[tokio::test]
async fn apply_discount_computes_and_records() {
    let t0 = Utc::now();
    let fx = setup(t0).await;

    let outcome = fx
        .engine
        .apply_discount(
            ApplyDiscountInput {
                member_id: fx.member_id,
                agreement_id: fx.agreement_id,
                partner_id: fx.partner_id,
                original_amount: Decimal::new(30000, 2), // 300.00
                description: Some("dinner for two".into()),
            },
            t0,
        )
        .await
        .unwrap();

    // 15% of 300.00.
    assert_eq!(outcome.discount_amount, Decimal::new(4500, 2));
    assert_eq!(outcome.final_amount, Decimal::new(25500, 2));
    assert_eq!(outcome.discount_type, DiscountType::Percentage);
}

#[tokio::test]
async fn repeated_applications_append_distinct_transactions() {
    let t0 = Utc::now();
    let fx = setup(t0).await;

    let input = ApplyDiscountInput {
        member_id: fx.member_id,
        agreement_id: fx.agreement_id,
        partner_id: fx.partner_id,
        original_amount: Decimal::new(10000, 2),
        description: None,
    };

    let first = fx.engine.apply_discount(input.clone(), t0).await.unwrap();
    let second = fx
        .engine
        .apply_discount(input, t0 + Duration::seconds(30))
        .await
        .unwrap();

    assert_ne!(first.transaction_id, second.transaction_id);
}

#[tokio::test]
async fn stale_agreement_is_rechecked_at_application() {
    let t0 = Utc::now();
    let fx = setup(t0).await;

    // Verification succeeds while the agreement is live...
    let issued = fx.engine.current_credential(fx.member_id, t0).await.unwrap();
    fx.engine
        .verify_member(&issued.payload, fx.partner_id, t0)
        .await
        .unwrap();

    // ...but the agreement is deactivated before the sale is rung up.
    SurrealAgreementRepository::new(fx.db.clone())
        .deactivate(fx.partner_id, fx.agreement_id)
        .await
        .unwrap();

    let result = fx
        .engine
        .apply_discount(
            ApplyDiscountInput {
                member_id: fx.member_id,
                agreement_id: fx.agreement_id,
                partner_id: fx.partner_id,
                original_amount: Decimal::new(5000, 2),
                description: None,
            },
            t0 + Duration::minutes(5),
        )
        .await;
    assert!(matches!(result, Err(AccessError::NoActiveAgreement)));
}

#[tokio::test]
async fn negative_amount_is_rejected_before_any_lookup() {
    let t0 = Utc::now();
    let fx = setup(t0).await;

    let result = fx
        .engine
        .apply_discount(
            ApplyDiscountInput {
                member_id: fx.member_id,
                agreement_id: fx.agreement_id,
                partner_id: fx.partner_id,
                original_amount: Decimal::new(-100, 2),
                description: None,
            },
            t0,
        )
        .await;
    assert!(matches!(result, Err(AccessError::InvalidAmount(_))));
}

#[tokio::test]
async fn current_credential_is_cached_until_expiry() {
    let t0 = Utc::now();
    let fx = setup(t0).await;

    let first = fx.engine.current_credential(fx.member_id, t0).await.unwrap();
    let second = fx
        .engine
        .current_credential(fx.member_id, t0 + Duration::hours(2))
        .await
        .unwrap();

    // Inside the window the cached payload is returned unchanged.
    assert_eq!(first.payload, second.payload);
    assert_eq!(first.expires_at, second.expires_at);

    // Past the window a fresh one is minted.
    let third = fx
        .engine
        .current_credential(fx.member_id, t0 + Duration::hours(25))
        .await
        .unwrap();
    assert_ne!(first.payload, third.payload);
    assert!(third.expires_at > first.expires_at);
}

#[tokio::test]
async fn regenerate_supersedes_the_cached_credential() {
    let t0 = Utc::now();
    let fx = setup(t0).await;

    let original = fx.engine.current_credential(fx.member_id, t0).await.unwrap();
    let regenerated = fx
        .engine
        .regenerate_credential(fx.member_id, t0 + Duration::minutes(10))
        .await
        .unwrap();

    assert_ne!(original.payload, regenerated.payload);

    // The cache now serves the regenerated credential.
    let cached = fx
        .engine
        .current_credential(fx.member_id, t0 + Duration::minutes(11))
        .await
        .unwrap();
    assert_eq!(cached.payload, regenerated.payload);
}

#[tokio::test]
async fn unknown_member_is_not_found() {
    let t0 = Utc::now();
    let fx = setup(t0).await;

    let result = fx.engine.current_credential(Uuid::new_v4(), t0).await;
    assert!(matches!(result, Err(AccessError::SubjectNotFound)));
}
