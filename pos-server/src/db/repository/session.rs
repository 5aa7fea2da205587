//! Table Session Repository (一桌一餐)
//!
//! 状态转移一律是条件更新：`rows_affected()` 即「前置条件在写入时仍成立」。

use shared::models::{OrderTicketItem, SessionStatus, TableSession, TicketWithItems};
use sqlx::{SqliteExecutor, SqlitePool};

use super::RepoResult;

const SESSION_COLS: &str = "id, table_id, status, opened_at, closed_at";

/// Insert a new DINING session. Unique-violation (active session already
/// exists for the table) surfaces as `RepoError::Duplicate`.
pub async fn insert(
    executor: impl SqliteExecutor<'_>,
    table_id: i64,
    now: i64,
) -> RepoResult<TableSession> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO table_session (table_id, status, opened_at) VALUES (?, 'DINING', ?) RETURNING id",
    )
    .bind(table_id)
    .bind(now)
    .fetch_one(executor)
    .await?;

    Ok(TableSession {
        id,
        table_id,
        status: SessionStatus::Dining,
        opened_at: now,
        closed_at: None,
    })
}

pub async fn find_by_id(
    executor: impl SqliteExecutor<'_>,
    id: i64,
) -> RepoResult<Option<TableSession>> {
    let session = sqlx::query_as::<_, TableSession>(&format!(
        "SELECT {SESSION_COLS} FROM table_session WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(session)
}

pub async fn find_active_by_table(
    executor: impl SqliteExecutor<'_>,
    table_id: i64,
) -> RepoResult<Option<TableSession>> {
    let session = sqlx::query_as::<_, TableSession>(&format!(
        "SELECT {SESSION_COLS} FROM table_session WHERE table_id = ? AND status <> 'CLOSED' LIMIT 1"
    ))
    .bind(table_id)
    .fetch_optional(executor)
    .await?;
    Ok(session)
}

/// Tickets of a session, oldest first
pub async fn tickets_of(
    executor: impl SqliteExecutor<'_>,
    session_id: i64,
) -> RepoResult<Vec<shared::models::OrderTicket>> {
    let tickets = sqlx::query_as::<_, shared::models::OrderTicket>(
        "SELECT id, session_id, created_at, note FROM order_ticket WHERE session_id = ? ORDER BY created_at, id",
    )
    .bind(session_id)
    .fetch_all(executor)
    .await?;
    Ok(tickets)
}

/// All items of a session, grouped by ticket order
pub async fn items_of_session(
    executor: impl SqliteExecutor<'_>,
    session_id: i64,
) -> RepoResult<Vec<OrderTicketItem>> {
    let items = sqlx::query_as::<_, OrderTicketItem>(
        "SELECT oti.id, oti.ticket_id, oti.source_dish_id, oti.dish_name_snapshot, \
         oti.category_snapshot, oti.spice_level, oti.unit_sell_price_cents, \
         oti.unit_cost_price_cents, oti.qty_ordered, oti.qty_served, oti.qty_voided, \
         oti.skip_queue_snapshot \
         FROM order_ticket_item oti \
         JOIN order_ticket t ON t.id = oti.ticket_id \
         WHERE t.session_id = ? ORDER BY oti.ticket_id, oti.id",
    )
    .bind(session_id)
    .fetch_all(executor)
    .await?;
    Ok(items)
}

/// Tickets of a session with their nested items, oldest first
pub async fn tickets_with_items(
    pool: &SqlitePool,
    session_id: i64,
) -> RepoResult<Vec<TicketWithItems>> {
    let tickets = tickets_of(pool, session_id).await?;
    let items = items_of_session(pool, session_id).await?;

    let mut result: Vec<TicketWithItems> = tickets
        .into_iter()
        .map(|ticket| TicketWithItems {
            ticket,
            items: Vec::new(),
        })
        .collect();
    for item in items {
        if let Some(t) = result.iter_mut().find(|t| t.ticket.id == item.ticket_id) {
            t.items.push(item);
        }
    }
    Ok(result)
}

/// Live session total: voided units never count, served/unserved both do
pub async fn live_total_cents(
    executor: impl SqliteExecutor<'_>,
    session_id: i64,
) -> RepoResult<i64> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(oti.unit_sell_price_cents * (oti.qty_ordered - oti.qty_voided)), 0) \
         FROM order_ticket_item oti \
         JOIN order_ticket t ON t.id = oti.ticket_id \
         WHERE t.session_id = ?",
    )
    .bind(session_id)
    .fetch_one(executor)
    .await?;
    Ok(total)
}

pub async fn ticket_count(executor: impl SqliteExecutor<'_>, session_id: i64) -> RepoResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_ticket WHERE session_id = ?")
        .bind(session_id)
        .fetch_one(executor)
        .await?;
    Ok(count)
}

/// Aggregate pending quantity across all items of the session
pub async fn pending_units(executor: impl SqliteExecutor<'_>, session_id: i64) -> RepoResult<i64> {
    let pending: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(oti.qty_ordered - oti.qty_served - oti.qty_voided), 0) \
         FROM order_ticket_item oti \
         JOIN order_ticket t ON t.id = oti.ticket_id \
         WHERE t.session_id = ?",
    )
    .bind(session_id)
    .fetch_one(executor)
    .await?;
    Ok(pending)
}

/// Non-skip-queue lines with at least one live (not voided) unit.
/// A session whose every line is skip-queue or fully voided must not
/// auto-transition to PENDING_CHECKOUT.
pub async fn non_skip_live_lines(
    executor: impl SqliteExecutor<'_>,
    session_id: i64,
) -> RepoResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) \
         FROM order_ticket_item oti \
         JOIN order_ticket t ON t.id = oti.ticket_id \
         WHERE t.session_id = ? AND oti.skip_queue_snapshot = 0 \
           AND oti.qty_ordered - oti.qty_voided > 0",
    )
    .bind(session_id)
    .fetch_one(executor)
    .await?;
    Ok(count)
}

/// Conditional status transition: applies only if the session is still in
/// `from`. Returns whether it applied.
pub async fn set_status_if(
    executor: impl SqliteExecutor<'_>,
    session_id: i64,
    from: SessionStatus,
    to: SessionStatus,
) -> RepoResult<bool> {
    let rows = sqlx::query("UPDATE table_session SET status = ? WHERE id = ? AND status = ?")
        .bind(to.as_str())
        .bind(session_id)
        .bind(from.as_str())
        .execute(executor)
        .await?;
    Ok(rows.rows_affected() == 1)
}

/// Close a PENDING_CHECKOUT session. Returns whether it applied.
pub async fn close_if_pending(
    executor: impl SqliteExecutor<'_>,
    session_id: i64,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE table_session SET status = 'CLOSED', closed_at = ? \
         WHERE id = ? AND status = 'PENDING_CHECKOUT'",
    )
    .bind(now)
    .bind(session_id)
    .execute(executor)
    .await?;
    Ok(rows.rows_affected() == 1)
}

/// Delete a session only if it has no tickets (true no-op cancellation)
pub async fn delete_if_empty(
    executor: impl SqliteExecutor<'_>,
    session_id: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "DELETE FROM table_session WHERE id = ? \
         AND NOT EXISTS (SELECT 1 FROM order_ticket WHERE session_id = ?)",
    )
    .bind(session_id)
    .bind(session_id)
    .execute(executor)
    .await?;
    Ok(rows.rows_affected() == 1)
}

// --- cascade helpers, composed inside a transaction by the caller ---

pub async fn delete_payment_of(
    executor: impl SqliteExecutor<'_>,
    session_id: i64,
) -> RepoResult<u64> {
    let rows = sqlx::query("DELETE FROM payment WHERE session_id = ?")
        .bind(session_id)
        .execute(executor)
        .await?;
    Ok(rows.rows_affected())
}

pub async fn delete_items_of(
    executor: impl SqliteExecutor<'_>,
    session_id: i64,
) -> RepoResult<u64> {
    let rows = sqlx::query(
        "DELETE FROM order_ticket_item WHERE ticket_id IN \
         (SELECT id FROM order_ticket WHERE session_id = ?)",
    )
    .bind(session_id)
    .execute(executor)
    .await?;
    Ok(rows.rows_affected())
}

pub async fn delete_tickets_of(
    executor: impl SqliteExecutor<'_>,
    session_id: i64,
) -> RepoResult<u64> {
    let rows = sqlx::query("DELETE FROM order_ticket WHERE session_id = ?")
        .bind(session_id)
        .execute(executor)
        .await?;
    Ok(rows.rows_affected())
}

pub async fn delete_row(executor: impl SqliteExecutor<'_>, session_id: i64) -> RepoResult<u64> {
    let rows = sqlx::query("DELETE FROM table_session WHERE id = ?")
        .bind(session_id)
        .execute(executor)
        .await?;
    Ok(rows.rows_affected())
}
