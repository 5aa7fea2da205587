//! Closed-session history: listing, detail, copy-forward restore and purge.

mod support;

use pos_server::services::{checkout, history, sessions, serving};
use pos_server::ConflictCode;
use shared::models::{CheckoutRequest, ClosedSessionFilter, PaymentMethod, SessionStatus};
use support::{open_with_order, serve_all, test_ctx};

async fn closed_session(t: &support::TestCtx, table_no: &str, key: &str) -> i64 {
    let (session_id, _, _) = open_with_order(t, table_no, 2).await;
    serve_all(t, session_id).await;
    checkout::checkout_session(t, session_id, CheckoutRequest {
        method: PaymentMethod::Wechat,
        idempotency_key: key.into(),
    })
    .await
    .unwrap();
    session_id
}

#[tokio::test]
async fn closed_list_filters_and_paginates() {
    let t = test_ctx().await;
    let first = closed_session(&t, "H1", "k1").await;
    let second = closed_session(&t, "H2", "k2").await;

    let page = history::closed_sessions(&t, ClosedSessionFilter::default())
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    // 最近关闭的排在最前
    assert_eq!(page.list[0].session_id, second);
    assert_eq!(page.list[1].session_id, first);
    assert_eq!(page.list[0].payment_method, Some(PaymentMethod::Wechat));

    let filtered = history::closed_sessions(&t, ClosedSessionFilter {
        table_no: Some("H1".into()),
        ..Default::default()
    })
    .await
    .unwrap();
    assert_eq!(filtered.total, 1);
    assert_eq!(filtered.list[0].table_no, "H1");

    let paged = history::closed_sessions(&t, ClosedSessionFilter {
        page: 2,
        page_size: 1,
        ..Default::default()
    })
    .await
    .unwrap();
    assert_eq!(paged.total, 2);
    assert_eq!(paged.list.len(), 1);
    assert_eq!(paged.list[0].session_id, first);
}

#[tokio::test]
async fn detail_requires_closed_session() {
    let t = test_ctx().await;
    let session_id = closed_session(&t, "H3", "k1").await;

    let detail = history::closed_session_detail(&t, session_id).await.unwrap();
    assert_eq!(detail.status, SessionStatus::Closed);
    assert_eq!(detail.table_no, "H3");
    assert_eq!(detail.tickets.len(), 1);
    let payment = detail.payment.as_ref().unwrap();
    assert_eq!(detail.total_cents, payment.amount_cents);

    let (open_session_id, _, _) = open_with_order(&t, "H4", 1).await;
    let err = history::closed_session_detail(&t, open_session_id)
        .await
        .unwrap_err();
    assert_eq!(err.conflict_code(), Some(ConflictCode::SessionNotClosed));
}

#[tokio::test]
async fn restore_copies_forward_and_frees_the_payment() {
    let t = test_ctx().await;
    let source_id = closed_session(&t, "H5", "k1").await;
    let source_items: Vec<(i64, i64, i64)> = sqlx::query_as(
        "SELECT oti.id, oti.qty_ordered, oti.qty_served FROM order_ticket_item oti \
         JOIN order_ticket ot ON ot.id = oti.ticket_id WHERE ot.session_id = ?",
    )
    .bind(source_id)
    .fetch_all(t.pool())
    .await
    .unwrap();

    let restored = history::restore_session(&t, source_id).await.unwrap();
    assert_eq!(restored.source_session_id, source_id);
    assert_ne!(restored.new_session.id, source_id);
    assert_eq!(restored.restored_tickets, 1);
    assert_eq!(restored.restored_items, 1);
    // 复制过来的明细已全部上齐 → 直接待结账
    assert_eq!(restored.new_session.status, SessionStatus::PendingCheckout);

    // 原始账单除支付行外原样保留
    let after: Vec<(i64, i64, i64)> = sqlx::query_as(
        "SELECT oti.id, oti.qty_ordered, oti.qty_served FROM order_ticket_item oti \
         JOIN order_ticket ot ON ot.id = oti.ticket_id WHERE ot.session_id = ?",
    )
    .bind(source_id)
    .fetch_all(t.pool())
    .await
    .unwrap();
    assert_eq!(source_items, after);
    let payments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payment WHERE session_id = ?")
        .bind(source_id)
        .fetch_one(t.pool())
        .await
        .unwrap();
    assert_eq!(payments, 0);

    // 同一 key 可复用：新会话结账不受旧支付行干扰
    let outcome = checkout::checkout_session(&t, restored.new_session.id, CheckoutRequest {
        method: PaymentMethod::Cash,
        idempotency_key: "k1".into(),
    })
    .await
    .unwrap();
    assert!(!outcome.idempotent);
}

#[tokio::test]
async fn restore_blocked_while_table_is_occupied() {
    let t = test_ctx().await;
    let source_id = closed_session(&t, "H6", "k1").await;

    // 桌台重新开台后不能恢复
    let table_id: i64 = sqlx::query_scalar("SELECT table_id FROM table_session WHERE id = ?")
        .bind(source_id)
        .fetch_one(t.pool())
        .await
        .unwrap();
    sessions::open_session(&t, table_id).await.unwrap();

    let err = history::restore_session(&t, source_id).await.unwrap_err();
    assert_eq!(err.conflict_code(), Some(ConflictCode::ActiveSessionExists));
}

#[tokio::test]
async fn repeated_restore_creates_fresh_sessions_each_time() {
    let t = test_ctx().await;
    let source_id = closed_session(&t, "H7", "k1").await;

    let first = history::restore_session(&t, source_id).await.unwrap();
    checkout::checkout_session(&t, first.new_session.id, CheckoutRequest {
        method: PaymentMethod::Cash,
        idempotency_key: "k2".into(),
    })
    .await
    .unwrap();

    let second = history::restore_session(&t, source_id).await.unwrap();
    assert_ne!(second.new_session.id, first.new_session.id);

    // 原会话的票据数不变
    let tickets: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_ticket WHERE session_id = ?")
        .bind(source_id)
        .fetch_one(t.pool())
        .await
        .unwrap();
    assert_eq!(tickets, 1);
}

#[tokio::test]
async fn delete_purges_the_whole_closed_session() {
    let t = test_ctx().await;
    let session_id = closed_session(&t, "H8", "k1").await;

    let result = history::delete_closed_session(&t, session_id).await.unwrap();
    assert_eq!(result.deleted_payments, 1);
    assert_eq!(result.deleted_tickets, 1);
    assert_eq!(result.deleted_items, 1);

    assert!(matches!(
        history::closed_session_detail(&t, session_id).await.unwrap_err(),
        pos_server::AppError::NotFound(_)
    ));

    let (open_id, _, _) = open_with_order(&t, "H9", 1).await;
    let err = history::delete_closed_session(&t, open_id).await.unwrap_err();
    assert_eq!(err.conflict_code(), Some(ConflictCode::SessionNotClosed));

    // 队列不受历史删除影响
    assert_eq!(serving::serving_queue(&t).await.unwrap().len(), 1);
}
