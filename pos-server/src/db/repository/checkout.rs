//! Payment Repository (结账)

use shared::models::{Payment, PaymentMethod};
use sqlx::SqliteExecutor;

use super::RepoResult;

const PAYMENT_COLS: &str =
    "id, session_id, method, amount_cents, paid_at, business_day, idempotency_key";

pub async fn payment_by_session(
    executor: impl SqliteExecutor<'_>,
    session_id: i64,
) -> RepoResult<Option<Payment>> {
    let payment = sqlx::query_as::<_, Payment>(&format!(
        "SELECT {PAYMENT_COLS} FROM payment WHERE session_id = ?"
    ))
    .bind(session_id)
    .fetch_optional(executor)
    .await?;
    Ok(payment)
}

pub async fn payment_by_key(
    executor: impl SqliteExecutor<'_>,
    idempotency_key: &str,
) -> RepoResult<Option<Payment>> {
    let payment = sqlx::query_as::<_, Payment>(&format!(
        "SELECT {PAYMENT_COLS} FROM payment WHERE idempotency_key = ?"
    ))
    .bind(idempotency_key)
    .fetch_optional(executor)
    .await?;
    Ok(payment)
}

/// Insert the payment row. Session/key uniqueness violations surface as
/// `RepoError::Duplicate` — the caller re-reads and resolves idempotently.
pub async fn insert_payment(
    executor: impl SqliteExecutor<'_>,
    session_id: i64,
    method: PaymentMethod,
    amount_cents: i64,
    paid_at: i64,
    business_day: &str,
    idempotency_key: &str,
) -> RepoResult<Payment> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO payment (session_id, method, amount_cents, paid_at, business_day, idempotency_key) \
         VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(session_id)
    .bind(method.as_str())
    .bind(amount_cents)
    .bind(paid_at)
    .bind(business_day)
    .bind(idempotency_key)
    .fetch_one(executor)
    .await?;

    Ok(Payment {
        id,
        session_id,
        method,
        amount_cents,
        paid_at,
        business_day: business_day.to_string(),
        idempotency_key: Some(idempotency_key.to_string()),
    })
}
