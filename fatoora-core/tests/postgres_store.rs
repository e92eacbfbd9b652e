//! Store tests against a real database.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -- --ignored`.

use rust_decimal::Decimal;
use sqlx::PgPool;

use fatoora_core::db;
use fatoora_core::models::{InvoiceChanges, NewInvoice, NewUser};
use fatoora_core::store::{IdentityStore, InvoiceStore, PgStore, StoreError};

async fn connect() -> PgStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for ignored tests");
    let pool = db::create_pool(&url, 2).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    PgStore::new(pool)
}

/// Inserts a fresh team with one client, returning their ids.
async fn seed_team(pool: &PgPool) -> (i64, i64) {
    let (team_id,): (i64,) = sqlx::query_as("INSERT INTO teams (name) VALUES ('Test Team') RETURNING id")
        .fetch_one(pool)
        .await
        .unwrap();
    let (client_id,): (i64,) =
        sqlx::query_as("INSERT INTO clients (team_id, name) VALUES ($1, 'Client') RETURNING id")
            .bind(team_id)
            .fetch_one(pool)
            .await
            .unwrap();
    (team_id, client_id)
}

fn new_invoice(team_id: i64, client_id: i64, number: &str) -> NewInvoice {
    NewInvoice {
        team_id,
        client_id,
        number: number.to_string(),
        status: "unpaid".to_string(),
        amount: Decimal::new(12345, 1),
        currency: "MAD".to_string(),
        due_date: None,
    }
}

#[tokio::test]
#[ignore]
async fn test_duplicate_number_is_conflict() {
    let store = connect().await;
    let (team_id, client_id) = seed_team(store.pool()).await;

    store
        .insert_invoice(new_invoice(team_id, client_id, "1"))
        .await
        .unwrap();
    let err = store
        .insert_invoice(new_invoice(team_id, client_id, "1"))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Conflict(_)));
}

#[tokio::test]
#[ignore]
async fn test_highest_number_orders_numerically() {
    let store = connect().await;
    let (team_id, client_id) = seed_team(store.pool()).await;

    for number in ["9", "10", "2"] {
        store
            .insert_invoice(new_invoice(team_id, client_id, number))
            .await
            .unwrap();
    }

    let highest = store.highest_number(team_id).await.unwrap();
    assert_eq!(highest.as_deref(), Some("10"));
}

#[tokio::test]
#[ignore]
async fn test_update_clears_due_date_and_keeps_other_fields() {
    let store = connect().await;
    let (team_id, client_id) = seed_team(store.pool()).await;
    let mut row = new_invoice(team_id, client_id, "1");
    row.due_date = chrono::NaiveDate::from_ymd_opt(2030, 1, 1);
    let invoice = store.insert_invoice(row).await.unwrap();

    let updated = store
        .update_invoice(
            team_id,
            invoice.id,
            &InvoiceChanges {
                due_date: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.due_date, None);
    assert_eq!(updated.amount, invoice.amount);
    assert!(store
        .update_invoice(team_id + 1_000_000, invoice.id, &InvoiceChanges::default())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
#[ignore]
async fn test_mark_overdue_leaves_paid_invoices_alone() {
    let store = connect().await;
    let (team_id, client_id) = seed_team(store.pool()).await;
    let unpaid = store
        .insert_invoice(new_invoice(team_id, client_id, "1"))
        .await
        .unwrap();
    let paid = store
        .insert_invoice(new_invoice(team_id, client_id, "2"))
        .await
        .unwrap();
    assert!(store.set_status(team_id, paid.id, "paid").await.unwrap());

    assert!(store.mark_overdue(team_id, unpaid.id).await.unwrap());
    assert!(!store.mark_overdue(team_id, paid.id).await.unwrap());

    let stored = store.find_invoice(team_id, paid.id).await.unwrap().unwrap();
    assert_eq!(stored.status, "paid");
    let stored = store.find_invoice(team_id, unpaid.id).await.unwrap().unwrap();
    assert_eq!(stored.status, "overdue");
}

#[tokio::test]
#[ignore]
async fn test_owned_team_is_created_with_membership() {
    let store = connect().await;
    let suffix = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let user = store
        .create_user(NewUser {
            external_id: format!("uid-{}", suffix),
            email: format!("owner-{}@example.com", suffix),
            name: None,
        })
        .await
        .unwrap();

    assert!(store.team_for_user(user.id).await.unwrap().is_none());
    let team = store.create_owned_team(user.id, "Owner's Team").await.unwrap();

    let found = store.team_for_user(user.id).await.unwrap().unwrap();
    assert_eq!(found.id, team.id);
    assert_eq!(found.owner_id, Some(user.id));
}
