//! Serving Queue (传菜)
//!
//! 上菜/退菜不开显式事务：单条条件 UPDATE 本身就是原子的
//! compare-and-swap，预检只为给出友好错误码。预检通过而条件更新
//! 零行 ⇒ CONCURRENT_MODIFICATION，调用方重试。

use serde_json::json;
use shared::models::{ServeRequest, ServedItem, ServingItemView, ServingQueueItem, SessionStatus};

use crate::core::AppContext;
use crate::db::repository::{serving, session};
use crate::events::EventKind;
use crate::services::sessions::evaluate_auto_transition;
use crate::utils::{AppError, AppResult, ConflictCode};

/// 厨房待上队列（FIFO）
pub async fn serving_queue(ctx: &AppContext) -> AppResult<Vec<ServingQueueItem>> {
    ctx.ensure_available()?;
    Ok(serving::queue(ctx.pool()).await?)
}

/// 已上菜看板
pub async fn served_items(ctx: &AppContext) -> AppResult<Vec<ServedItem>> {
    ctx.ensure_available()?;
    Ok(serving::served(ctx.pool()).await?)
}

/// 上菜：`qty` 默认 1
pub async fn serve_item(
    ctx: &AppContext,
    item_id: i64,
    req: ServeRequest,
) -> AppResult<ServingItemView> {
    ctx.ensure_available()?;
    let qty = req.qty.unwrap_or(1);
    if qty < 1 {
        return Err(AppError::validation(format!(
            "Serve quantity must be a positive integer, got {qty}"
        )));
    }
    let pool = ctx.pool();

    let view = serving::item_view(pool, item_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Ticket item {item_id}")))?;
    if view.session_status == SessionStatus::Closed {
        return Err(AppError::conflict(
            ConflictCode::SessionClosed,
            "Cannot serve items of a closed session",
        ));
    }
    if view.pending_qty <= 0 {
        return Err(AppError::conflict(
            ConflictCode::NoPendingQty,
            "Item has no pending quantity",
        ));
    }
    if qty > view.pending_qty {
        return Err(AppError::conflict(
            ConflictCode::ServeExceedsPending,
            format!("Serve quantity {qty} exceeds pending {}", view.pending_qty),
        ));
    }

    if !serving::increment_served(pool, item_id, qty, view.qty_served).await? {
        return Err(AppError::concurrent_modification());
    }

    // 可能是最后一道菜；规则幂等，读路径还会自愈
    let mut conn = pool.acquire().await?;
    evaluate_auto_transition(&mut *conn, view.session_id).await?;
    drop(conn);

    let updated = serving::item_view(pool, item_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Ticket item {item_id}")))?;

    tracing::info!(item_id, qty, session_id = view.session_id, "Item served");
    emit_serving_events(ctx, item_id, view.session_id, view.table_id);
    Ok(updated)
}

/// 退菜（撤销已上）：对称的条件递减
pub async fn unserve_item(
    ctx: &AppContext,
    item_id: i64,
    req: ServeRequest,
) -> AppResult<ServingItemView> {
    ctx.ensure_available()?;
    let qty = req.qty.unwrap_or(1);
    if qty < 1 {
        return Err(AppError::validation(format!(
            "Unserve quantity must be a positive integer, got {qty}"
        )));
    }
    let pool = ctx.pool();

    let view = serving::item_view(pool, item_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Ticket item {item_id}")))?;
    if view.session_status == SessionStatus::Closed {
        return Err(AppError::conflict(
            ConflictCode::SessionClosed,
            "Cannot unserve items of a closed session",
        ));
    }
    if view.qty_served <= 0 {
        return Err(AppError::conflict(
            ConflictCode::NoServedQty,
            "Item has no served quantity",
        ));
    }
    if qty > view.qty_served {
        return Err(AppError::conflict(
            ConflictCode::UnserveExceedsServed,
            format!("Unserve quantity {qty} exceeds served {}", view.qty_served),
        ));
    }

    if !serving::decrement_served(pool, item_id, qty, view.qty_served).await? {
        return Err(AppError::concurrent_modification());
    }

    // 新的待上数量要求 PENDING_CHECKOUT 回到 DINING
    session::set_status_if(
        pool,
        view.session_id,
        SessionStatus::PendingCheckout,
        SessionStatus::Dining,
    )
    .await?;

    let updated = serving::item_view(pool, item_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Ticket item {item_id}")))?;

    tracing::info!(item_id, qty, session_id = view.session_id, "Item unserved");
    emit_serving_events(ctx, item_id, view.session_id, view.table_id);
    Ok(updated)
}

fn emit_serving_events(ctx: &AppContext, item_id: i64, session_id: i64, table_id: i64) {
    ctx.notifier.emit(
        EventKind::ServingUpdated,
        json!({ "item_id": item_id, "session_id": session_id }),
    );
    ctx.notifier
        .emit(EventKind::TableUpdated, json!({ "table_id": table_id }));
}
