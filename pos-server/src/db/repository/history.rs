//! Closed Session History Repository (历史账单)
//!
//! 只看 CLOSED 会话。筛选参数全部走 `?n IS NULL OR ...`，避免拼接 SQL。

use shared::models::ClosedSessionListItem;
use sqlx::{SqliteExecutor, SqlitePool};

use super::RepoResult;

const LIST_SELECT: &str = "SELECT s.id AS session_id, s.table_id, dt.table_no, \
    s.opened_at, s.closed_at, \
    COALESCE(p.amount_cents, \
        (SELECT COALESCE(SUM(oti.unit_sell_price_cents * (oti.qty_ordered - oti.qty_voided)), 0) \
         FROM order_ticket_item oti \
         JOIN order_ticket t ON t.id = oti.ticket_id \
         WHERE t.session_id = s.id)) AS amount_cents, \
    p.method AS payment_method, p.paid_at \
    FROM table_session s \
    JOIN dining_table dt ON dt.id = s.table_id \
    LEFT JOIN payment p ON p.session_id = s.id \
    WHERE s.status = 'CLOSED' \
      AND (?1 IS NULL OR s.closed_at >= ?1) \
      AND (?2 IS NULL OR s.closed_at < ?2) \
      AND (?3 IS NULL OR dt.table_no LIKE '%' || ?3 || '%')";

/// One page of closed sessions, newest close first
pub async fn closed_page(
    pool: &SqlitePool,
    from_millis: Option<i64>,
    to_millis: Option<i64>,
    table_no: Option<&str>,
    limit: i64,
    offset: i64,
) -> RepoResult<Vec<ClosedSessionListItem>> {
    let rows = sqlx::query_as::<_, ClosedSessionListItem>(&format!(
        "{LIST_SELECT} ORDER BY s.closed_at DESC, s.id DESC LIMIT ?4 OFFSET ?5"
    ))
    .bind(from_millis)
    .bind(to_millis)
    .bind(table_no)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn closed_count(
    executor: impl SqliteExecutor<'_>,
    from_millis: Option<i64>,
    to_millis: Option<i64>,
    table_no: Option<&str>,
) -> RepoResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) \
         FROM table_session s \
         JOIN dining_table dt ON dt.id = s.table_id \
         WHERE s.status = 'CLOSED' \
           AND (?1 IS NULL OR s.closed_at >= ?1) \
           AND (?2 IS NULL OR s.closed_at < ?2) \
           AND (?3 IS NULL OR dt.table_no LIKE '%' || ?3 || '%')",
    )
    .bind(from_millis)
    .bind(to_millis)
    .bind(table_no)
    .fetch_one(executor)
    .await?;
    Ok(count)
}
