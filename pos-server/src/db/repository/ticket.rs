//! Order Ticket Repository (下单)
//!
//! Ticket 创建后不可变，只有 item 的数量字段会变。数量变更一律条件更新。

use shared::models::{OrderTicketItem, SpiceLevel, TableSession};
use sqlx::SqliteExecutor;

use super::RepoResult;

/// Fully-resolved item row ready for insertion (snapshots already taken)
#[derive(Debug, Clone)]
pub struct NewTicketItem {
    pub source_dish_id: Option<i64>,
    pub dish_name_snapshot: String,
    pub category_snapshot: String,
    pub spice_level: Option<SpiceLevel>,
    pub unit_sell_price_cents: i64,
    pub unit_cost_price_cents: i64,
    pub qty_ordered: i64,
    /// `qty_ordered` for skip-queue items, 0 otherwise; history restore
    /// copies the source value verbatim
    pub qty_served: i64,
    pub qty_voided: i64,
    pub skip_queue_snapshot: bool,
}

pub async fn insert_ticket(
    executor: impl SqliteExecutor<'_>,
    session_id: i64,
    now: i64,
    note: Option<&str>,
) -> RepoResult<i64> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO order_ticket (session_id, created_at, note) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(session_id)
    .bind(now)
    .bind(note)
    .fetch_one(executor)
    .await?;
    Ok(id)
}

pub async fn insert_item(
    executor: impl SqliteExecutor<'_>,
    ticket_id: i64,
    item: &NewTicketItem,
) -> RepoResult<i64> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO order_ticket_item \
         (ticket_id, source_dish_id, dish_name_snapshot, category_snapshot, spice_level, \
          unit_sell_price_cents, unit_cost_price_cents, qty_ordered, qty_served, qty_voided, \
          skip_queue_snapshot) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(ticket_id)
    .bind(item.source_dish_id)
    .bind(&item.dish_name_snapshot)
    .bind(&item.category_snapshot)
    .bind(item.spice_level.map(|s| s.as_str()))
    .bind(item.unit_sell_price_cents)
    .bind(item.unit_cost_price_cents)
    .bind(item.qty_ordered)
    .bind(item.qty_served)
    .bind(item.qty_voided)
    .bind(item.skip_queue_snapshot)
    .fetch_one(executor)
    .await?;
    Ok(id)
}

const ITEM_COLS: &str = "id, ticket_id, source_dish_id, dish_name_snapshot, category_snapshot, \
    spice_level, unit_sell_price_cents, unit_cost_price_cents, qty_ordered, qty_served, \
    qty_voided, skip_queue_snapshot";

pub async fn find_item(
    executor: impl SqliteExecutor<'_>,
    item_id: i64,
) -> RepoResult<Option<OrderTicketItem>> {
    let item = sqlx::query_as::<_, OrderTicketItem>(&format!(
        "SELECT {ITEM_COLS} FROM order_ticket_item WHERE id = ?"
    ))
    .bind(item_id)
    .fetch_optional(executor)
    .await?;
    Ok(item)
}

/// The session an item belongs to
pub async fn session_of_item(
    executor: impl SqliteExecutor<'_>,
    item_id: i64,
) -> RepoResult<Option<TableSession>> {
    let session = sqlx::query_as::<_, TableSession>(
        "SELECT s.id, s.table_id, s.status, s.opened_at, s.closed_at \
         FROM table_session s \
         JOIN order_ticket t ON t.session_id = s.id \
         JOIN order_ticket_item oti ON oti.ticket_id = t.id \
         WHERE oti.id = ?",
    )
    .bind(item_id)
    .fetch_optional(executor)
    .await?;
    Ok(session)
}

/// Set a new `qty_ordered`. Guard re-asserts the value read during the
/// pre-check and the served+voided floor. Returns whether it applied.
pub async fn update_qty_ordered(
    executor: impl SqliteExecutor<'_>,
    item_id: i64,
    new_qty: i64,
    expected_qty: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE order_ticket_item SET qty_ordered = ?1 \
         WHERE id = ?2 AND qty_ordered = ?3 AND qty_served + qty_voided <= ?1",
    )
    .bind(new_qty)
    .bind(item_id)
    .bind(expected_qty)
    .execute(executor)
    .await?;
    Ok(rows.rows_affected() == 1)
}

/// Void part of the pending remainder. Guarded by the pending quantity and
/// the `qty_voided` value read during the pre-check.
pub async fn increment_voided(
    executor: impl SqliteExecutor<'_>,
    item_id: i64,
    void_qty: i64,
    expected_voided: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE order_ticket_item SET qty_voided = qty_voided + ?1 \
         WHERE id = ?2 AND qty_voided = ?3 \
           AND qty_ordered - qty_served - qty_voided >= ?1",
    )
    .bind(void_qty)
    .bind(item_id)
    .bind(expected_voided)
    .execute(executor)
    .await?;
    Ok(rows.rows_affected() == 1)
}
