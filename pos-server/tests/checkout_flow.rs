//! Checkout finalization: idempotency on session and key, state guards,
//! double-checkout race and the maintenance gate.

mod support;

use pos_server::services::{checkout, sessions};
use pos_server::{AppError, ConflictCode};
use shared::models::{CheckoutRequest, PaymentMethod, SessionStatus};
use support::{open_with_order, serve_all, test_ctx};

fn cash(key: &str) -> CheckoutRequest {
    CheckoutRequest {
        method: PaymentMethod::Cash,
        idempotency_key: key.into(),
    }
}

#[tokio::test]
async fn checkout_requires_pending_checkout_status() {
    let t = test_ctx().await;
    let (session_id, _, _) = open_with_order(&t, "C1", 2).await;

    let err = checkout::checkout_session(&t, session_id, cash("k1"))
        .await
        .unwrap_err();
    assert_eq!(
        err.conflict_code(),
        Some(ConflictCode::SessionNotPendingCheckout)
    );
}

#[tokio::test]
async fn repeated_checkout_with_same_key_yields_one_payment() {
    let t = test_ctx().await;
    let (session_id, _, unit_price) = open_with_order(&t, "C2", 2).await;
    serve_all(&t, session_id).await;

    let first = checkout::checkout_session(&t, session_id, cash("k1"))
        .await
        .unwrap();
    let second = checkout::checkout_session(&t, session_id, cash("k1"))
        .await
        .unwrap();

    assert!(!first.idempotent);
    assert!(second.idempotent);
    assert_eq!(first.payment.id, second.payment.id);
    assert_eq!(first.payment.amount_cents, 2 * unit_price);

    let payments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payment WHERE session_id = ?")
        .bind(session_id)
        .fetch_one(t.pool())
        .await
        .unwrap();
    assert_eq!(payments, 1);
}

#[tokio::test]
async fn checkout_after_close_is_idempotent_even_with_new_key() {
    let t = test_ctx().await;
    let (session_id, _, _) = open_with_order(&t, "C3", 1).await;
    serve_all(&t, session_id).await;

    let first = checkout::checkout_session(&t, session_id, cash("k1"))
        .await
        .unwrap();
    // 会话维度幂等优先于 key
    let replay = checkout::checkout_session(&t, session_id, cash("k2"))
        .await
        .unwrap();
    assert!(replay.idempotent);
    assert_eq!(replay.payment.id, first.payment.id);
}

#[tokio::test]
async fn key_reuse_across_sessions_is_a_conflict() {
    let t = test_ctx().await;
    let (first_session, _, _) = open_with_order(&t, "C4", 1).await;
    serve_all(&t, first_session).await;
    checkout::checkout_session(&t, first_session, cash("shared-key"))
        .await
        .unwrap();

    let (second_session, _, _) = open_with_order(&t, "C5", 1).await;
    serve_all(&t, second_session).await;
    let err = checkout::checkout_session(&t, second_session, cash("shared-key"))
        .await
        .unwrap_err();
    assert_eq!(
        err.conflict_code(),
        Some(ConflictCode::IdempotencyKeyConflict)
    );
    // 第二个会话未被关闭
    assert_eq!(
        sessions::session_detail(&t, second_session).await.unwrap().session.status,
        SessionStatus::PendingCheckout
    );
}

#[tokio::test]
async fn amount_is_live_sum_not_cached() {
    let t = test_ctx().await;
    let (session_id, item_id, unit_price) = open_with_order(&t, "C6", 3).await;
    serve_all(&t, session_id).await;

    // 结账前直接整退一份（绕过服务层，模拟迟到的修正）
    sqlx::query(
        "UPDATE order_ticket_item SET qty_voided = 1, qty_served = 2 WHERE id = ?",
    )
    .bind(item_id)
    .execute(t.pool())
    .await
    .unwrap();

    let outcome = checkout::checkout_session(&t, session_id, cash("k1"))
        .await
        .unwrap();
    assert_eq!(outcome.payment.amount_cents, 2 * unit_price);
}

#[tokio::test]
async fn business_day_label_is_a_calendar_date() {
    let t = test_ctx().await;
    let (session_id, _, _) = open_with_order(&t, "C7", 1).await;
    serve_all(&t, session_id).await;

    let outcome = checkout::checkout_session(&t, session_id, cash("k1"))
        .await
        .unwrap();
    let day = &outcome.payment.business_day;
    assert_eq!(day.len(), 10);
    assert!(chrono::NaiveDate::parse_from_str(day, "%Y-%m-%d").is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checkouts_create_exactly_one_payment() {
    let t = test_ctx().await;
    let (session_id, _, _) = open_with_order(&t, "C8", 1).await;
    serve_all(&t, session_id).await;

    let ctx_a = t.ctx.clone();
    let ctx_b = t.ctx.clone();
    let (a, b) = tokio::join!(
        tokio::spawn(
            async move { checkout::checkout_session(&ctx_a, session_id, cash("k1")).await }
        ),
        tokio::spawn(
            async move { checkout::checkout_session(&ctx_b, session_id, cash("k1")).await }
        ),
    );
    let results = [a.unwrap(), b.unwrap()];

    let mut payment_ids = Vec::new();
    for result in results {
        match result {
            Ok(outcome) => payment_ids.push(outcome.payment.id),
            // 输家允许以并发冲突收场，但绝不能产生第二条支付
            Err(AppError::Conflict { code, .. }) => {
                assert_eq!(code, ConflictCode::ConcurrentModification)
            }
            Err(other) => panic!("unexpected checkout failure: {other:?}"),
        }
    }
    assert!(!payment_ids.is_empty(), "at least one checkout must succeed");
    payment_ids.dedup();
    assert_eq!(payment_ids.len(), 1);

    let payments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payment WHERE session_id = ?")
        .bind(session_id)
        .fetch_one(t.pool())
        .await
        .unwrap();
    assert_eq!(payments, 1);
    assert_eq!(
        sessions::session_detail(&t, session_id).await.unwrap().session.status,
        SessionStatus::Closed
    );
}

#[tokio::test]
async fn maintenance_gate_suspends_operations() {
    let t = test_ctx().await;
    let (session_id, _, _) = open_with_order(&t, "C9", 1).await;
    serve_all(&t, session_id).await;

    let guard = t.maintenance.enter();
    let err = checkout::checkout_session(&t, session_id, cash("k1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Maintenance));

    drop(guard);
    checkout::checkout_session(&t, session_id, cash("k1"))
        .await
        .unwrap();
}
