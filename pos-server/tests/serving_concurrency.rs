//! Serving queue projection and the conditional-update race guarantees.

mod support;

use pos_server::services::{serving, sessions, tickets};
use pos_server::{AppError, ConflictCode};
use shared::models::{ServeRequest, SessionStatus, TicketItemPatch};
use support::{DishSeed, dish_line, open_with_order, seed_category, seed_dish, seed_table,
    test_ctx, ticket_of};

#[tokio::test]
async fn queue_is_fifo_by_ticket_then_item() {
    let t = test_ctx().await;
    let table_id = seed_table(&t, "Q1").await;
    let category = seed_category(t.pool(), "Mains", false, 1.0, false).await;
    let first = seed_dish(t.pool(), category, "Dumplings", DishSeed::default()).await;
    let second = seed_dish(t.pool(), category, "Fried Rice", DishSeed::default()).await;

    let session = sessions::open_session(&t, table_id).await.unwrap();
    tickets::create_ticket(&t, session.id, ticket_of(vec![dish_line(first, 1)]))
        .await
        .unwrap();
    tickets::create_ticket(&t, session.id, ticket_of(vec![dish_line(second, 1)]))
        .await
        .unwrap();

    let queue = serving::serving_queue(&t).await.unwrap();
    assert_eq!(queue.len(), 2);
    assert_eq!(queue[0].dish_name, "Dumplings");
    assert_eq!(queue[1].dish_name, "Fried Rice");
    assert!(queue[0].ordered_at <= queue[1].ordered_at);
}

#[tokio::test]
async fn skip_queue_items_never_appear_in_queue() {
    let t = test_ctx().await;
    let table_id = seed_table(&t, "Q2").await;
    let category = seed_category(t.pool(), "Cold Drinks", true, 1.0, false).await;
    let dish = seed_dish(t.pool(), category, "Iced Tea", DishSeed::default()).await;

    let session = sessions::open_session(&t, table_id).await.unwrap();
    tickets::create_ticket(&t, session.id, ticket_of(vec![dish_line(dish, 3)]))
        .await
        .unwrap();

    assert!(serving::serving_queue(&t).await.unwrap().is_empty());
    let served = serving::served_items(&t).await.unwrap();
    assert_eq!(served.len(), 1);
    assert_eq!(served[0].qty_served, 3);
}

#[tokio::test]
async fn served_board_keeps_ticket_fifo_regardless_of_serve_order() {
    let t = test_ctx().await;
    let table_id = seed_table(&t, "Q8").await;
    let category = seed_category(t.pool(), "Mains", false, 1.0, false).await;
    let first = seed_dish(t.pool(), category, "Dumplings", DishSeed::default()).await;
    let second = seed_dish(t.pool(), category, "Fried Rice", DishSeed::default()).await;

    let session = sessions::open_session(&t, table_id).await.unwrap();
    tickets::create_ticket(&t, session.id, ticket_of(vec![dish_line(first, 1)]))
        .await
        .unwrap();
    tickets::create_ticket(&t, session.id, ticket_of(vec![dish_line(second, 1)]))
        .await
        .unwrap();

    // 后下的先上：看板次序仍按下单先后
    let queue = serving::serving_queue(&t).await.unwrap();
    serving::serve_item(&t, queue[1].item_id, ServeRequest::default())
        .await
        .unwrap();
    serving::serve_item(&t, queue[0].item_id, ServeRequest::default())
        .await
        .unwrap();

    let served = serving::served_items(&t).await.unwrap();
    assert_eq!(served.len(), 2);
    assert_eq!(served[0].dish_name, "Dumplings");
    assert_eq!(served[1].dish_name, "Fried Rice");
    assert!(served[0].ordered_at <= served[1].ordered_at);
}

#[tokio::test]
async fn serve_and_unserve_move_session_between_states() {
    let t = test_ctx().await;
    let (session_id, item_id, _) = open_with_order(&t, "Q3", 2).await;

    let view = serving::serve_item(&t, item_id, ServeRequest { qty: Some(2) })
        .await
        .unwrap();
    assert_eq!(view.qty_served, 2);
    assert_eq!(view.pending_qty, 0);
    assert_eq!(
        sessions::session_detail(&t, session_id).await.unwrap().session.status,
        SessionStatus::PendingCheckout
    );

    let view = serving::unserve_item(&t, item_id, ServeRequest::default())
        .await
        .unwrap();
    assert_eq!(view.qty_served, 1);
    assert_eq!(view.pending_qty, 1);
    assert_eq!(
        sessions::session_detail(&t, session_id).await.unwrap().session.status,
        SessionStatus::Dining
    );
}

#[tokio::test]
async fn serve_beyond_pending_is_rejected() {
    let t = test_ctx().await;
    let (_, item_id, _) = open_with_order(&t, "Q4", 2).await;

    let err = serving::serve_item(&t, item_id, ServeRequest { qty: Some(3) })
        .await
        .unwrap_err();
    assert_eq!(err.conflict_code(), Some(ConflictCode::ServeExceedsPending));

    serving::serve_item(&t, item_id, ServeRequest { qty: Some(2) })
        .await
        .unwrap();
    let err = serving::serve_item(&t, item_id, ServeRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.conflict_code(), Some(ConflictCode::NoPendingQty));
}

#[tokio::test]
async fn unserve_beyond_served_is_rejected() {
    let t = test_ctx().await;
    let (_, item_id, _) = open_with_order(&t, "Q5", 2).await;

    let err = serving::unserve_item(&t, item_id, ServeRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.conflict_code(), Some(ConflictCode::NoServedQty));

    serving::serve_item(&t, item_id, ServeRequest::default())
        .await
        .unwrap();
    let err = serving::unserve_item(&t, item_id, ServeRequest { qty: Some(2) })
        .await
        .unwrap_err();
    assert_eq!(
        err.conflict_code(),
        Some(ConflictCode::UnserveExceedsServed)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_serves_on_last_pending_unit_have_one_winner() {
    let t = test_ctx().await;
    let (_, item_id, _) = open_with_order(&t, "Q6", 1).await;

    let ctx_a = t.ctx.clone();
    let ctx_b = t.ctx.clone();
    let (a, b) = tokio::join!(
        tokio::spawn(async move {
            serving::serve_item(&ctx_a, item_id, ServeRequest { qty: Some(1) }).await
        }),
        tokio::spawn(async move {
            serving::serve_item(&ctx_b, item_id, ServeRequest { qty: Some(1) }).await
        }),
    );
    let results = [a.unwrap(), b.unwrap()];

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one serve must win");
    let loser = results.iter().find(|r| r.is_err()).unwrap();
    match loser {
        Err(AppError::Conflict { code, .. }) => {
            let code = *code;
            assert!(
                matches!(
                    code,
                    ConflictCode::ConcurrentModification
                        | ConflictCode::NoPendingQty
                        | ConflictCode::ServeExceedsPending
                ),
                "unexpected conflict code {code}"
            );
        }
        other => panic!("loser must fail with a conflict, got {other:?}"),
    }

    // 最终只有一次递增
    let qty_served: i64 =
        sqlx::query_scalar("SELECT qty_served FROM order_ticket_item WHERE id = ?")
            .bind(item_id)
            .fetch_one(t.pool())
            .await
            .unwrap();
    assert_eq!(qty_served, 1);
}

#[tokio::test]
async fn ledger_invariant_holds_after_mixed_mutations() {
    let t = test_ctx().await;
    let (_, item_id, _) = open_with_order(&t, "Q7", 5).await;

    serving::serve_item(&t, item_id, ServeRequest { qty: Some(2) })
        .await
        .unwrap();
    tickets::patch_ticket_item(&t, item_id, TicketItemPatch {
        qty: None,
        void_qty: Some(1),
    })
    .await
    .unwrap();
    tickets::patch_ticket_item(&t, item_id, TicketItemPatch {
        qty: Some(4),
        void_qty: None,
    })
    .await
    .unwrap();

    let (ordered, served, voided): (i64, i64, i64) = sqlx::query_as(
        "SELECT qty_ordered, qty_served, qty_voided FROM order_ticket_item WHERE id = ?",
    )
    .bind(item_id)
    .fetch_one(t.pool())
    .await
    .unwrap();
    assert!(served >= 0 && voided >= 0);
    assert!(served + voided <= ordered);
    assert_eq!((ordered, served, voided), (4, 2, 1));
}
