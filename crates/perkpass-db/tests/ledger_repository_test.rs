//! Integration tests for the append-only ledger using in-memory SurrealDB.

use chrono::Utc;
use perkpass_core::models::agreement::{CreateAgreement, DiscountType};
use perkpass_core::models::member::{CreateMember, MembershipType};
use perkpass_core::models::partner::CreatePartner;
use perkpass_core::models::transaction::TransactionStatus;
use perkpass_core::repository::{
    AgreementRepository, LedgerRepository, MemberRepository, NewDiscountRecord, Pagination,
    PartnerRepository,
};
use perkpass_db::repository::{
    SurrealAgreementRepository, SurrealLedgerRepository, SurrealMemberRepository,
    SurrealPartnerRepository,
};
use rust_decimal::Decimal;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use surrealdb_types::SurrealValue;
use uuid::Uuid;

/// Helper: in-memory DB with one member, partner, and live agreement.
async fn setup() -> (Surreal<surrealdb::engine::local::Db>, Uuid, Uuid, Uuid) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    perkpass_db::run_migrations(&db).await.unwrap();

    let member = SurrealMemberRepository::new(db.clone())
        .create(CreateMember {
            membership_ref: "PM700000GGGGGG".into(),
            first_name: "Bao".into(),
            last_name: "Le".into(),
            membership_type: MembershipType::Standard,
        })
        .await
        .unwrap();

    let partner = SurrealPartnerRepository::new(db.clone())
        .create(CreatePartner {
            business_name: "Bookstore".into(),
            contact_email: "books@example.com".into(),
        })
        .await
        .unwrap();

    let agreement = SurrealAgreementRepository::new(db.clone())
        .create(CreateAgreement {
            partner_id: partner.id,
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::new(10, 0),
            description: None,
            terms: None,
            start_date: Utc::now(),
            end_date: None,
        })
        .await
        .unwrap();

    (db, member.id, partner.id, agreement.id)
}

fn record(member_id: Uuid, partner_id: Uuid, agreement_id: Uuid) -> NewDiscountRecord {
    NewDiscountRecord {
        member_id,
        partner_id,
        agreement_id,
        original_amount: Decimal::new(30000, 2), // 300.00
        discount_amount: Decimal::new(3000, 2),  // 30.00
        final_amount: Decimal::new(27000, 2),    // 270.00
        description: Some("two paperbacks".into()),
        occurred_at: Utc::now(),
    }
}

#[tokio::test]
async fn record_discount_writes_both_rows() {
    let (db, member_id, partner_id, agreement_id) = setup().await;
    let repo = SurrealLedgerRepository::new(db);

    let (transaction, usage) = repo
        .record_discount(record(member_id, partner_id, agreement_id))
        .await
        .unwrap();

    assert_eq!(transaction.member_id, member_id);
    assert_eq!(transaction.partner_id, partner_id);
    assert_eq!(transaction.agreement_id, agreement_id);
    assert_eq!(transaction.original_amount, Decimal::new(30000, 2));
    assert_eq!(transaction.discount_amount, Decimal::new(3000, 2));
    assert_eq!(transaction.final_amount, Decimal::new(27000, 2));
    assert_eq!(transaction.status, TransactionStatus::Approved);

    // Usage mirror carries the same monetary figures.
    assert_eq!(usage.member_id, member_id);
    assert_eq!(usage.original_amount, transaction.original_amount);
    assert_eq!(usage.discount_amount, transaction.discount_amount);
    assert_eq!(usage.final_amount, transaction.final_amount);
}

#[tokio::test]
async fn repeated_records_get_distinct_ids() {
    let (db, member_id, partner_id, agreement_id) = setup().await;
    let repo = SurrealLedgerRepository::new(db);

    let (first, _) = repo
        .record_discount(record(member_id, partner_id, agreement_id))
        .await
        .unwrap();
    let (second, _) = repo
        .record_discount(record(member_id, partner_id, agreement_id))
        .await
        .unwrap();

    // Identical inputs still append fresh facts.
    assert_ne!(first.id, second.id);
}

#[tokio::test]
async fn failed_pair_write_leaves_no_transaction_behind() {
    let (db, member_id, partner_id, agreement_id) = setup().await;

    // Same write shape the ledger uses, but the usage-history half
    // omits required schema fields so its CREATE is rejected. The
    // transaction row created by the first statement must roll back.
    let result = db
        .query(
            "BEGIN TRANSACTION; \
             CREATE type::record('transaction', $transaction_id) SET \
             member_id = $member_id, \
             partner_id = $partner_id, \
             agreement_id = $agreement_id, \
             original_amount = '100.00', \
             discount_amount = '10.00', \
             final_amount = '90.00', \
             description = NONE, \
             status = 'Approved', \
             processed_at = time::now(); \
             CREATE type::record('usage_history', $usage_id) SET \
             member_id = $member_id; \
             COMMIT TRANSACTION;",
        )
        .bind(("transaction_id", Uuid::new_v4().to_string()))
        .bind(("usage_id", Uuid::new_v4().to_string()))
        .bind(("member_id", member_id.to_string()))
        .bind(("partner_id", partner_id.to_string()))
        .bind(("agreement_id", agreement_id.to_string()))
        .await
        .unwrap()
        .check();
    assert!(result.is_err(), "incomplete usage row should be rejected");

    // Neither half of the pair is visible.
    #[derive(Debug, SurrealValue)]
    struct CountRow {
        total: u64,
    }

    let mut count = db
        .query("SELECT count() AS total FROM transaction GROUP ALL")
        .await
        .unwrap();
    let rows: Vec<CountRow> = count.take(0).unwrap();
    assert_eq!(
        rows.first().map(|r| r.total).unwrap_or(0),
        0,
        "transaction half must roll back with the failed usage write"
    );

    let mut usage_count = db
        .query("SELECT count() AS total FROM usage_history GROUP ALL")
        .await
        .unwrap();
    let usage_rows: Vec<CountRow> = usage_count.take(0).unwrap();
    assert_eq!(usage_rows.first().map(|r| r.total).unwrap_or(0), 0);
}

#[tokio::test]
async fn list_transactions_by_partner() {
    let (db, member_id, partner_id, agreement_id) = setup().await;
    let repo = SurrealLedgerRepository::new(db);

    for _ in 0..3 {
        repo.record_discount(record(member_id, partner_id, agreement_id))
            .await
            .unwrap();
    }

    let page = repo
        .list_transactions_by_partner(partner_id, Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.items.len(), 3);
    assert_eq!(page.total, 3);

    // Nothing recorded under an unrelated partner.
    let empty = repo
        .list_transactions_by_partner(Uuid::new_v4(), Pagination::default())
        .await
        .unwrap();
    assert!(empty.items.is_empty());
}

#[tokio::test]
async fn list_usage_by_member() {
    let (db, member_id, partner_id, agreement_id) = setup().await;
    let repo = SurrealLedgerRepository::new(db);

    repo.record_discount(record(member_id, partner_id, agreement_id))
        .await
        .unwrap();
    repo.record_discount(record(member_id, partner_id, agreement_id))
        .await
        .unwrap();

    let page = repo
        .list_usage_by_member(member_id, Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total, 2);
}
