//! Session State Machine (一桌一餐生命周期)
//!
//! DINING ⇄ PENDING_CHECKOUT 的自动转移规则：
//! - DINING 且有票、待上数量为 0、且存在未整退的非跳队菜 → PENDING_CHECKOUT
//! - PENDING_CHECKOUT 出现任何新的待上数量 → 回到 DINING
//!
//! 规则幂等，读路径（桌台汇总）会重跑一遍自愈。

use serde_json::json;
use shared::models::{SessionDetail, SessionStatus, TableSession};
use sqlx::SqliteConnection;

use crate::core::AppContext;
use crate::db::repository::{RepoError, dining_table, session};
use crate::events::EventKind;
use crate::utils::{AppError, AppResult, ConflictCode};

/// 开台：为无活跃会话的桌台创建 DINING 会话
pub async fn open_session(ctx: &AppContext, table_id: i64) -> AppResult<TableSession> {
    ctx.ensure_available()?;
    let pool = ctx.pool();

    let table = dining_table::find_by_id(pool, table_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Table {table_id}")))?;
    if !table.is_enabled {
        return Err(AppError::conflict(
            ConflictCode::TableDisabled,
            format!("Table {} is disabled", table.table_no),
        ));
    }

    // Optimistic pre-check; the partial unique index is the real backstop
    if session::find_active_by_table(pool, table_id).await?.is_some() {
        return Err(AppError::conflict(
            ConflictCode::ActiveSessionExists,
            format!("Table {} already has an active session", table.table_no),
        ));
    }

    let now = shared::util::now_millis();
    let created = match session::insert(pool, table_id, now).await {
        Ok(s) => s,
        Err(RepoError::Duplicate(_)) => {
            // Lost the open race
            return Err(AppError::conflict(
                ConflictCode::ActiveSessionExists,
                format!("Table {} already has an active session", table.table_no),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(session_id = created.id, table_id, "Session opened");
    ctx.notifier.emit(
        EventKind::SessionOpened,
        json!({ "session_id": created.id, "table_id": table_id }),
    );
    ctx.notifier
        .emit(EventKind::TableUpdated, json!({ "table_id": table_id }));
    Ok(created)
}

/// 会话详情：票据、明细与实时合计
pub async fn session_detail(ctx: &AppContext, session_id: i64) -> AppResult<SessionDetail> {
    ctx.ensure_available()?;
    let pool = ctx.pool();

    let found = session::find_by_id(pool, session_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Session {session_id}")))?;
    let tickets = session::tickets_with_items(pool, session_id).await?;
    let total_cents = session::live_total_cents(pool, session_id).await?;

    Ok(SessionDetail {
        session: found,
        tickets,
        total_cents,
    })
}

/// 撤台：仅允许删除零票会话（真正的无操作取消）
pub async fn cancel_session(ctx: &AppContext, session_id: i64) -> AppResult<()> {
    ctx.ensure_available()?;
    let pool = ctx.pool();

    let found = session::find_by_id(pool, session_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Session {session_id}")))?;
    if session::ticket_count(pool, session_id).await? > 0 {
        return Err(AppError::conflict(
            ConflictCode::SessionHasOrders,
            "Session has order tickets and cannot be cancelled",
        ));
    }

    if !session::delete_if_empty(pool, session_id).await? {
        // Pre-check passed but the guarded delete did not apply
        return match session::find_by_id(pool, session_id).await? {
            None => Ok(()), // someone else already removed it
            Some(_) if session::ticket_count(pool, session_id).await? > 0 => {
                Err(AppError::conflict(
                    ConflictCode::SessionHasOrders,
                    "Session has order tickets and cannot be cancelled",
                ))
            }
            Some(_) => Err(AppError::concurrent_modification()),
        };
    }

    tracing::info!(session_id, table_id = found.table_id, "Session cancelled");
    ctx.notifier.emit(
        EventKind::TableUpdated,
        json!({ "table_id": found.table_id }),
    );
    Ok(())
}

/// 强制删除：无视状态，连同票据、明细、支付一并删除（纠错用）
pub async fn force_delete_session(ctx: &AppContext, session_id: i64) -> AppResult<()> {
    ctx.ensure_available()?;

    let mut tx = ctx.pool().begin().await?;
    let found = session::find_by_id(&mut *tx, session_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Session {session_id}")))?;

    session::delete_payment_of(&mut *tx, session_id).await?;
    session::delete_items_of(&mut *tx, session_id).await?;
    session::delete_tickets_of(&mut *tx, session_id).await?;
    session::delete_row(&mut *tx, session_id).await?;
    tx.commit().await?;

    tracing::warn!(
        session_id,
        table_id = found.table_id,
        "Session force-deleted"
    );
    ctx.notifier.emit(
        EventKind::SessionDeleted,
        json!({ "session_id": session_id, "table_id": found.table_id }),
    );
    ctx.notifier.emit(
        EventKind::TableUpdated,
        json!({ "table_id": found.table_id }),
    );
    Ok(())
}

/// 自动转移评估：按当前聚合状态有条件地推进会话状态。
///
/// 条件更新未生效视为良性空操作（并发方已先一步推进）。
/// 返回新状态（若发生了转移）。
pub(crate) async fn evaluate_auto_transition(
    conn: &mut SqliteConnection,
    session_id: i64,
) -> AppResult<Option<SessionStatus>> {
    let Some(current) = session::find_by_id(&mut *conn, session_id).await? else {
        return Ok(None);
    };

    match current.status {
        SessionStatus::Dining => {
            let tickets = session::ticket_count(&mut *conn, session_id).await?;
            if tickets == 0 {
                return Ok(None);
            }
            let pending = session::pending_units(&mut *conn, session_id).await?;
            if pending != 0 {
                return Ok(None);
            }
            let non_skip = session::non_skip_live_lines(&mut *conn, session_id).await?;
            if non_skip == 0 {
                return Ok(None);
            }
            let applied = session::set_status_if(
                &mut *conn,
                session_id,
                SessionStatus::Dining,
                SessionStatus::PendingCheckout,
            )
            .await?;
            Ok(applied.then_some(SessionStatus::PendingCheckout))
        }
        SessionStatus::PendingCheckout => {
            let pending = session::pending_units(&mut *conn, session_id).await?;
            if pending <= 0 {
                return Ok(None);
            }
            let applied = session::set_status_if(
                &mut *conn,
                session_id,
                SessionStatus::PendingCheckout,
                SessionStatus::Dining,
            )
            .await?;
            Ok(applied.then_some(SessionStatus::Dining))
        }
        SessionStatus::Closed => Ok(None),
    }
}
