//! Dining Table Repository (桌台)

use shared::models::{DiningTable, TableCreate, TableUpdate, TableWithSession};
use sqlx::{SqliteExecutor, SqlitePool};

use super::{RepoError, RepoResult};

const TABLE_COLS: &str = "id, table_no, sort_order, is_enabled";

pub async fn find_by_id(
    executor: impl SqliteExecutor<'_>,
    id: i64,
) -> RepoResult<Option<DiningTable>> {
    let table = sqlx::query_as::<_, DiningTable>(&format!(
        "SELECT {TABLE_COLS} FROM dining_table WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(table)
}

/// Insert a table. Duplicate `table_no` surfaces as `RepoError::Duplicate`.
pub async fn create(pool: &SqlitePool, data: TableCreate) -> RepoResult<DiningTable> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO dining_table (table_no, sort_order, is_enabled) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(&data.table_no)
    .bind(data.sort_order.unwrap_or(0))
    .bind(data.is_enabled.unwrap_or(true))
    .fetch_one(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create dining table".into()))
}

/// Patch table_no / sort_order. Enable-flag changes go through
/// [`set_enabled_guarded`] so the active-session invariant holds.
pub async fn update_fields(
    pool: &SqlitePool,
    id: i64,
    data: &TableUpdate,
) -> RepoResult<DiningTable> {
    let rows = sqlx::query(
        "UPDATE dining_table SET table_no = COALESCE(?1, table_no), \
         sort_order = COALESCE(?2, sort_order) WHERE id = ?3",
    )
    .bind(&data.table_no)
    .bind(data.sort_order)
    .bind(id)
    .execute(pool)
    .await?;

    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Dining table {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Dining table {id} not found")))
}

/// Enable/disable a table. Disabling is conditional on "no active session";
/// enabling is unconditional. Returns whether the update applied.
pub async fn set_enabled_guarded(
    executor: impl SqliteExecutor<'_>,
    id: i64,
    enabled: bool,
) -> RepoResult<bool> {
    let rows = if enabled {
        sqlx::query("UPDATE dining_table SET is_enabled = 1 WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?
    } else {
        sqlx::query(
            "UPDATE dining_table SET is_enabled = 0 WHERE id = ? \
             AND NOT EXISTS (SELECT 1 FROM table_session \
                             WHERE table_id = ? AND status <> 'CLOSED')",
        )
        .bind(id)
        .bind(id)
        .execute(executor)
        .await?
    };
    Ok(rows.rows_affected() == 1)
}

/// All tables with their current (non-CLOSED) session, for the floor view
pub async fn find_all_with_session(pool: &SqlitePool) -> RepoResult<Vec<TableWithSession>> {
    let tables = sqlx::query_as::<_, TableWithSession>(
        "SELECT dt.id, dt.table_no, dt.sort_order, dt.is_enabled, \
         s.id AS session_id, s.status AS session_status, s.opened_at AS session_opened_at \
         FROM dining_table dt \
         LEFT JOIN table_session s ON s.table_id = dt.id AND s.status <> 'CLOSED' \
         ORDER BY dt.sort_order, dt.id",
    )
    .fetch_all(pool)
    .await?;
    Ok(tables)
}

pub async fn has_active_session(
    executor: impl SqliteExecutor<'_>,
    table_id: i64,
) -> RepoResult<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM table_session WHERE table_id = ? AND status <> 'CLOSED'",
    )
    .bind(table_id)
    .fetch_one(executor)
    .await?;
    Ok(count > 0)
}
