//! Serving Queue Repository (传菜)
//!
//! 队列是纯投影：从 ledger 推导，不落盘。FIFO 按 ticket 创建时间再 item id。

use shared::models::{ServedItem, ServingItemView, ServingQueueItem};
use sqlx::{SqliteExecutor, SqlitePool};

use super::RepoResult;

/// Outstanding lines across all non-CLOSED sessions, kitchen FIFO order
pub async fn queue(pool: &SqlitePool) -> RepoResult<Vec<ServingQueueItem>> {
    let items = sqlx::query_as::<_, ServingQueueItem>(
        "SELECT oti.id AS item_id, oti.ticket_id, dt.table_no, dt.id AS table_id, \
         s.id AS session_id, oti.dish_name_snapshot AS dish_name, oti.spice_level, \
         (oti.qty_ordered - oti.qty_served - oti.qty_voided) AS quantity, \
         t.created_at AS ordered_at \
         FROM order_ticket_item oti \
         JOIN order_ticket t ON t.id = oti.ticket_id \
         JOIN table_session s ON s.id = t.session_id \
         JOIN dining_table dt ON dt.id = s.table_id \
         WHERE s.status <> 'CLOSED' AND oti.skip_queue_snapshot = 0 \
           AND oti.qty_ordered - oti.qty_served - oti.qty_voided > 0 \
         ORDER BY t.created_at, oti.id",
    )
    .fetch_all(pool)
    .await?;
    Ok(items)
}

/// Already-served lines of non-CLOSED sessions, same FIFO order as the queue
pub async fn served(pool: &SqlitePool) -> RepoResult<Vec<ServedItem>> {
    let items = sqlx::query_as::<_, ServedItem>(
        "SELECT oti.id AS item_id, oti.ticket_id, dt.table_no, dt.id AS table_id, \
         s.id AS session_id, oti.dish_name_snapshot AS dish_name, oti.spice_level, \
         oti.qty_served, oti.qty_ordered, t.created_at AS ordered_at \
         FROM order_ticket_item oti \
         JOIN order_ticket t ON t.id = oti.ticket_id \
         JOIN table_session s ON s.id = t.session_id \
         JOIN dining_table dt ON dt.id = s.table_id \
         WHERE s.status <> 'CLOSED' AND oti.qty_served > 0 \
         ORDER BY t.created_at, oti.id",
    )
    .fetch_all(pool)
    .await?;
    Ok(items)
}

/// Full serving context of one item (any session status)
pub async fn item_view(
    executor: impl SqliteExecutor<'_>,
    item_id: i64,
) -> RepoResult<Option<ServingItemView>> {
    let view = sqlx::query_as::<_, ServingItemView>(
        "SELECT oti.id AS item_id, oti.ticket_id, dt.table_no, dt.id AS table_id, \
         s.id AS session_id, s.status AS session_status, \
         oti.dish_name_snapshot AS dish_name, oti.spice_level, \
         oti.qty_ordered, oti.qty_served, oti.qty_voided, \
         (oti.qty_ordered - oti.qty_served - oti.qty_voided) AS pending_qty, \
         t.created_at AS ordered_at \
         FROM order_ticket_item oti \
         JOIN order_ticket t ON t.id = oti.ticket_id \
         JOIN table_session s ON s.id = t.session_id \
         JOIN dining_table dt ON dt.id = s.table_id \
         WHERE oti.id = ?",
    )
    .bind(item_id)
    .fetch_optional(executor)
    .await?;
    Ok(view)
}

/// Guarded serve: increments `qty_served` only while pending covers `qty`
/// and `qty_served` still matches the pre-check read.
pub async fn increment_served(
    executor: impl SqliteExecutor<'_>,
    item_id: i64,
    qty: i64,
    expected_served: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE order_ticket_item SET qty_served = qty_served + ?1 \
         WHERE id = ?2 AND qty_served = ?3 \
           AND qty_ordered - qty_served - qty_voided >= ?1",
    )
    .bind(qty)
    .bind(item_id)
    .bind(expected_served)
    .execute(executor)
    .await?;
    Ok(rows.rows_affected() == 1)
}

/// Guarded unserve: symmetric decrement, never below zero
pub async fn decrement_served(
    executor: impl SqliteExecutor<'_>,
    item_id: i64,
    qty: i64,
    expected_served: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE order_ticket_item SET qty_served = qty_served - ?1 \
         WHERE id = ?2 AND qty_served = ?3 AND qty_served >= ?1",
    )
    .bind(qty)
    .bind(item_id)
    .bind(expected_served)
    .execute(executor)
    .await?;
    Ok(rows.rows_affected() == 1)
}
