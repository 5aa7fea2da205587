//! Closed Session History (历史账单)
//!
//! 恢复是 copy-forward：在同桌上新开会话并复制票据明细，
//! 原 CLOSED 记录除支付行外保持原样，可审计。

use serde_json::json;
use shared::models::{
    ClosedSessionDetail, ClosedSessionFilter, ClosedSessionPage, DeleteResult, RestoreResult,
    SessionStatus,
};

use crate::core::AppContext;
use crate::db::repository::{RepoError, checkout, history, session, ticket};
use crate::events::EventKind;
use crate::utils::{AppError, AppResult, ConflictCode, time};

const MAX_PAGE_SIZE: i64 = 100;

/// 已结账会话分页列表
pub async fn closed_sessions(
    ctx: &AppContext,
    filter: ClosedSessionFilter,
) -> AppResult<ClosedSessionPage> {
    ctx.ensure_available()?;

    let page = filter.page.max(1);
    let page_size = filter.page_size.clamp(1, MAX_PAGE_SIZE);

    // 日期按营业时区解释；to 为闭区间
    let tz = ctx.business_tz();
    let from_millis = match filter.from.as_deref() {
        Some(d) => Some(time::day_start_millis(time::parse_date(d)?, tz)),
        None => None,
    };
    let to_millis = match filter.to.as_deref() {
        Some(d) => Some(time::day_end_millis(time::parse_date(d)?, tz)),
        None => None,
    };
    let table_no = filter
        .table_no
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let pool = ctx.pool();
    let list = history::closed_page(
        pool,
        from_millis,
        to_millis,
        table_no,
        page_size,
        (page - 1) * page_size,
    )
    .await?;
    let total = history::closed_count(pool, from_millis, to_millis, table_no).await?;

    Ok(ClosedSessionPage {
        list,
        page,
        page_size,
        total,
    })
}

/// 历史账单详情
pub async fn closed_session_detail(
    ctx: &AppContext,
    session_id: i64,
) -> AppResult<ClosedSessionDetail> {
    ctx.ensure_available()?;
    let pool = ctx.pool();

    let found = require_closed(ctx, session_id).await?;
    let table = crate::db::repository::dining_table::find_by_id(pool, found.table_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Table {}", found.table_id)))?;
    let tickets = session::tickets_with_items(pool, session_id).await?;
    let payment = checkout::payment_by_session(pool, session_id).await?;
    let total_cents = match &payment {
        Some(p) => p.amount_cents,
        None => session::live_total_cents(pool, session_id).await?,
    };

    Ok(ClosedSessionDetail {
        session_id,
        table_id: found.table_id,
        table_no: table.table_no,
        status: found.status,
        opened_at: found.opened_at,
        closed_at: found.closed_at,
        payment,
        tickets,
        total_cents,
    })
}

/// 恢复历史会话：同桌新开 DINING 会话并复制全部票据/明细，
/// 删除原支付行以便重新结账。
pub async fn restore_session(ctx: &AppContext, session_id: i64) -> AppResult<RestoreResult> {
    ctx.ensure_available()?;

    let mut tx = ctx.pool().begin().await?;

    let source = session::find_by_id(&mut *tx, session_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Session {session_id}")))?;
    if source.status != SessionStatus::Closed {
        return Err(AppError::conflict(
            ConflictCode::SessionNotClosed,
            "Only closed sessions can be restored",
        ));
    }
    if session::find_active_by_table(&mut *tx, source.table_id)
        .await?
        .is_some()
    {
        return Err(AppError::conflict(
            ConflictCode::ActiveSessionExists,
            "Table already has an active session",
        ));
    }

    // 原支付删除后，恢复的会话才能带新 key 重新结账
    session::delete_payment_of(&mut *tx, session_id).await?;

    let now = shared::util::now_millis();
    let mut new_session = match session::insert(&mut *tx, source.table_id, now).await {
        Ok(s) => s,
        Err(RepoError::Duplicate(_)) => {
            return Err(AppError::conflict(
                ConflictCode::ActiveSessionExists,
                "Table already has an active session",
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let source_tickets = session::tickets_of(&mut *tx, session_id).await?;
    let source_items = session::items_of_session(&mut *tx, session_id).await?;

    let mut restored_tickets = 0i64;
    let mut restored_items = 0i64;
    for src_ticket in &source_tickets {
        // 保留原下单时间，厨房 FIFO 次序不变
        let new_ticket_id = ticket::insert_ticket(
            &mut *tx,
            new_session.id,
            src_ticket.created_at,
            src_ticket.note.as_deref(),
        )
        .await?;
        restored_tickets += 1;

        for src in source_items.iter().filter(|i| i.ticket_id == src_ticket.id) {
            ticket::insert_item(
                &mut *tx,
                new_ticket_id,
                &ticket::NewTicketItem {
                    source_dish_id: src.source_dish_id,
                    dish_name_snapshot: src.dish_name_snapshot.clone(),
                    category_snapshot: src.category_snapshot.clone(),
                    spice_level: src.spice_level,
                    unit_sell_price_cents: src.unit_sell_price_cents,
                    unit_cost_price_cents: src.unit_cost_price_cents,
                    qty_ordered: src.qty_ordered,
                    qty_served: src.qty_served,
                    qty_voided: src.qty_voided,
                    skip_queue_snapshot: src.skip_queue_snapshot,
                },
            )
            .await?;
            restored_items += 1;
        }
    }

    // 复制过来的明细可能已经全部上齐
    if let Some(new_status) =
        crate::services::sessions::evaluate_auto_transition(&mut *tx, new_session.id).await?
    {
        new_session.status = new_status;
    }

    tx.commit().await?;

    tracing::info!(
        source_session_id = session_id,
        new_session_id = new_session.id,
        restored_tickets,
        restored_items,
        "Closed session restored"
    );
    ctx.notifier.emit(
        EventKind::SessionOpened,
        json!({ "session_id": new_session.id, "table_id": new_session.table_id }),
    );
    if restored_items > 0 {
        ctx.notifier.emit(
            EventKind::TicketCreated,
            json!({ "session_id": new_session.id }),
        );
    }
    ctx.notifier.emit(
        EventKind::TableUpdated,
        json!({ "table_id": new_session.table_id }),
    );

    Ok(RestoreResult {
        source_session_id: session_id,
        new_session,
        restored_tickets,
        restored_items,
    })
}

/// 彻底删除一条历史账单（支付、明细、票据、会话）
pub async fn delete_closed_session(ctx: &AppContext, session_id: i64) -> AppResult<DeleteResult> {
    ctx.ensure_available()?;

    let found = require_closed(ctx, session_id).await?;

    let mut tx = ctx.pool().begin().await?;
    let deleted_payments = session::delete_payment_of(&mut *tx, session_id).await?;
    let deleted_items = session::delete_items_of(&mut *tx, session_id).await?;
    let deleted_tickets = session::delete_tickets_of(&mut *tx, session_id).await?;
    session::delete_row(&mut *tx, session_id).await?;
    tx.commit().await?;

    tracing::warn!(
        session_id,
        table_id = found.table_id,
        "Closed session deleted from history"
    );
    ctx.notifier.emit(
        EventKind::SessionDeleted,
        json!({ "session_id": session_id, "table_id": found.table_id }),
    );

    Ok(DeleteResult {
        session_id,
        deleted_payments,
        deleted_items,
        deleted_tickets,
    })
}

async fn require_closed(
    ctx: &AppContext,
    session_id: i64,
) -> AppResult<shared::models::TableSession> {
    let found = session::find_by_id(ctx.pool(), session_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Session {session_id}")))?;
    if found.status != SessionStatus::Closed {
        return Err(AppError::conflict(
            ConflictCode::SessionNotClosed,
            "Session is not closed",
        ));
    }
    Ok(found)
}
