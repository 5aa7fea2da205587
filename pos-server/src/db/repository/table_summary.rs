//! Table Summary Repository (桌台汇总读模型)
//!
//! 汇总本身在 service 层用内存聚合算，这里只取活跃会话的原始行。

use shared::models::SpiceLevel;
use sqlx::SqlitePool;

use super::RepoResult;

/// Raw item row of an active session, for the summary rollup
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SummaryItemRow {
    pub session_id: i64,
    pub dish_name: String,
    pub spice_level: Option<SpiceLevel>,
    pub qty_ordered: i64,
    pub qty_served: i64,
    pub qty_voided: i64,
    pub unit_sell_price_cents: i64,
    pub skip_queue_snapshot: bool,
}

/// All items of all non-CLOSED sessions in one query
pub async fn active_session_items(pool: &SqlitePool) -> RepoResult<Vec<SummaryItemRow>> {
    let rows = sqlx::query_as::<_, SummaryItemRow>(
        "SELECT s.id AS session_id, oti.dish_name_snapshot AS dish_name, oti.spice_level, \
         oti.qty_ordered, oti.qty_served, oti.qty_voided, oti.unit_sell_price_cents, \
         oti.skip_queue_snapshot \
         FROM order_ticket_item oti \
         JOIN order_ticket t ON t.id = oti.ticket_id \
         JOIN table_session s ON s.id = t.session_id \
         WHERE s.status <> 'CLOSED' \
         ORDER BY s.id, t.created_at, oti.id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Ticket counts per non-CLOSED session (sessions with zero tickets are
/// absent), used by the self-healing auto-transition check.
pub async fn active_session_ticket_counts(pool: &SqlitePool) -> RepoResult<Vec<(i64, i64)>> {
    let rows = sqlx::query_as::<_, (i64, i64)>(
        "SELECT s.id, COUNT(t.id) \
         FROM table_session s \
         JOIN order_ticket t ON t.session_id = s.id \
         WHERE s.status <> 'CLOSED' \
         GROUP BY s.id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
