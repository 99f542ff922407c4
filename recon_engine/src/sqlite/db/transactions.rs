use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewTransaction, PaymentStatus, PaymentType, Transaction, TxRef},
    traits::{StatusUpdate, StoreError},
};

/// Inserts a new `Pending` transaction. A reused `tx_ref` trips the unique index and is reported
/// as [`StoreError::DuplicateRequest`] rather than a generic database error.
pub async fn insert(transaction: NewTransaction, conn: &mut SqliteConnection) -> Result<Transaction, StoreError> {
    let now = Utc::now();
    let result = sqlx::query_as::<_, Transaction>(
        r#"
            INSERT INTO transactions (
                tx_ref,
                amount,
                currency,
                payment_type,
                related_entity_id,
                status,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *;
        "#,
    )
    .bind(transaction.tx_ref.clone())
    .bind(transaction.amount)
    .bind(transaction.currency)
    .bind(transaction.payment_type)
    .bind(transaction.related_entity_id)
    .bind(PaymentStatus::Pending)
    .bind(now)
    .fetch_one(conn)
    .await;
    match result {
        Ok(tx) => {
            debug!("🗃️ Transaction [{}] inserted with id {}", tx.tx_ref, tx.id);
            Ok(tx)
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(StoreError::DuplicateRequest(transaction.tx_ref))
        },
        Err(e) => Err(StoreError::from(e)),
    }
}

pub async fn fetch_by_ref(tx_ref: &TxRef, conn: &mut SqliteConnection) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM transactions WHERE tx_ref = $1")
        .bind(tx_ref.as_str())
        .fetch_optional(conn)
        .await
}

pub async fn fetch_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM transactions WHERE id = $1").bind(id).fetch_optional(conn).await
}

/// Applies a [`StatusUpdate`] as a single UPDATE. The caller has already checked the expected
/// prior status inside the same database transaction; this write only carries it out.
///
/// `gateway_ref` and `settled_at` use COALESCE so the first writer wins and the settlement
/// instant is never overwritten.
pub async fn apply_update(
    tx_ref: &TxRef,
    update: &StatusUpdate,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Transaction, StoreError> {
    let tx = sqlx::query_as::<_, Transaction>(
        r#"
            UPDATE transactions SET
                status = $1,
                gateway_ref = COALESCE(gateway_ref, $2),
                settled_at = CASE WHEN $3 THEN COALESCE(settled_at, $4) ELSE settled_at END,
                effects_fired = CASE WHEN $5 THEN 1 ELSE effects_fired END,
                raw_gateway_payload = COALESCE($6, raw_gateway_payload),
                updated_at = $4
            WHERE tx_ref = $7
            RETURNING *;
        "#,
    )
    .bind(update.new_status)
    .bind(update.gateway_ref.as_deref())
    .bind(update.settle)
    .bind(now)
    .bind(update.fire_effects)
    .bind(update.payload.as_deref())
    .bind(tx_ref.as_str())
    .fetch_one(conn)
    .await?;
    Ok(tx)
}

/// Persists a confirmation payload and bumps `updated_at` without touching the status. Replayed
/// and discarded reports go through here so the audit trail is complete.
pub async fn record_confirmation(
    tx_ref: &TxRef,
    payload: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<(), StoreError> {
    let now = Utc::now();
    let _ = sqlx::query(
        "UPDATE transactions SET raw_gateway_payload = COALESCE($1, raw_gateway_payload), updated_at = $2 WHERE \
         tx_ref = $3",
    )
    .bind(payload)
    .bind(now)
    .bind(tx_ref.as_str())
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_by_status(
    status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM transactions WHERE status = $1 ORDER BY created_at")
        .bind(status)
        .fetch_all(conn)
        .await
}

pub async fn fetch_by_payment_type(
    payment_type: PaymentType,
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM transactions WHERE payment_type = $1 ORDER BY created_at")
        .bind(payment_type)
        .fetch_all(conn)
        .await
}

pub async fn fetch_stale_pending(
    cutoff: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM transactions WHERE status = $1 AND updated_at < $2 ORDER BY updated_at")
        .bind(PaymentStatus::Pending)
        .bind(cutoff)
        .fetch_all(conn)
        .await
}

pub async fn insert_anomaly(
    tx_ref: &TxRef,
    payload: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<(), StoreError> {
    let now = Utc::now();
    let _ = sqlx::query("INSERT INTO webhook_anomalies (tx_ref, payload, received_at) VALUES ($1, $2, $3)")
        .bind(tx_ref.as_str())
        .bind(payload)
        .bind(now)
        .execute(conn)
        .await?;
    Ok(())
}
