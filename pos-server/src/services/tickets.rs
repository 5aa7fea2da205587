//! Ticket/Item Ledger (下单与数量变更)
//!
//! 快照字段（菜名/分类/单价）在下单瞬间固化，菜单后续修改不回写历史。
//! 数量变更走「预检 + 条件更新」：预检通过而条件更新零行 ⇒ 并发冲突。

use serde_json::json;
use shared::models::{
    OrderTicketItem, SessionStatus, TicketCreate, TicketItemInput, TicketItemPatch,
    TicketWithItems,
};

use crate::core::AppContext;
use crate::db::repository::{menu, session, ticket};
use crate::events::EventKind;
use crate::services::sessions::evaluate_auto_transition;
use crate::utils::{AppError, AppResult, ConflictCode};

/// Category snapshot recorded for ad-hoc (off-menu) items
const ADHOC_CATEGORY: &str = "TEMP";

/// 下单：一张票 + 若干明细，同一事务内完成（含 PENDING_CHECKOUT 回退）
pub async fn create_ticket(
    ctx: &AppContext,
    session_id: i64,
    data: TicketCreate,
) -> AppResult<TicketWithItems> {
    ctx.ensure_available()?;

    if data.items.is_empty() {
        return Err(AppError::validation("Ticket must contain at least one item"));
    }
    for input in &data.items {
        if input.qty < 1 {
            return Err(AppError::validation(format!(
                "Item quantity must be a positive integer, got {}",
                input.qty
            )));
        }
    }

    let mut tx = ctx.pool().begin().await?;

    let current = session::find_by_id(&mut *tx, session_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Session {session_id}")))?;
    if current.status == SessionStatus::Closed {
        return Err(AppError::conflict(
            ConflictCode::SessionClosed,
            "Cannot add orders to a closed session",
        ));
    }

    // 新票必然引入数量变化：PENDING_CHECKOUT 先回到 DINING，
    // 与插入同事务，不存在「待结账却有未上菜」的窗口
    if current.status == SessionStatus::PendingCheckout {
        session::set_status_if(
            &mut *tx,
            session_id,
            SessionStatus::PendingCheckout,
            SessionStatus::Dining,
        )
        .await?;
        // 未生效说明并发方已推进；只有 CLOSED 需要终止
        if let Some(now_state) = session::find_by_id(&mut *tx, session_id).await?
            && now_state.status == SessionStatus::Closed
        {
            return Err(AppError::conflict(
                ConflictCode::SessionClosed,
                "Cannot add orders to a closed session",
            ));
        }
    }

    let now = shared::util::now_millis();
    let ticket_id = ticket::insert_ticket(&mut *tx, session_id, now, data.note.as_deref()).await?;

    let mut items = Vec::with_capacity(data.items.len());
    for input in &data.items {
        let row = resolve_item(&mut tx, input).await?;
        let item_id = ticket::insert_item(&mut *tx, ticket_id, &row).await?;
        items.push(OrderTicketItem {
            id: item_id,
            ticket_id,
            source_dish_id: row.source_dish_id,
            dish_name_snapshot: row.dish_name_snapshot,
            category_snapshot: row.category_snapshot,
            spice_level: row.spice_level,
            unit_sell_price_cents: row.unit_sell_price_cents,
            unit_cost_price_cents: row.unit_cost_price_cents,
            qty_ordered: row.qty_ordered,
            qty_served: row.qty_served,
            qty_voided: 0,
            skip_queue_snapshot: row.skip_queue_snapshot,
        });
    }

    // 全跳队票可能让会话直接满足待结账条件
    evaluate_auto_transition(&mut *tx, session_id).await?;
    tx.commit().await?;

    tracing::info!(session_id, ticket_id, items = items.len(), "Ticket created");
    ctx.notifier.emit(
        EventKind::TicketCreated,
        json!({ "session_id": session_id, "ticket_id": ticket_id }),
    );
    ctx.notifier.emit(
        EventKind::TableUpdated,
        json!({ "table_id": current.table_id }),
    );

    Ok(TicketWithItems {
        ticket: shared::models::OrderTicket {
            id: ticket_id,
            session_id,
            created_at: now,
            note: data.note,
        },
        items,
    })
}

/// 解析一条下单输入为可插入的明细行（快照在此固化）
async fn resolve_item(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    input: &TicketItemInput,
) -> AppResult<ticket::NewTicketItem> {
    match input.dish_id {
        Some(dish_id) => {
            let snapshot = menu::dish_snapshot(&mut **tx, dish_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Dish {dish_id}")))?;
            if input.spice_level.is_some() && !snapshot.has_spice_option {
                return Err(AppError::validation(format!(
                    "Dish '{}' does not support spice levels",
                    snapshot.name
                )));
            }
            let unit_sell = snapshot.discounted_sell_price_cents();
            Ok(ticket::NewTicketItem {
                source_dish_id: Some(dish_id),
                dish_name_snapshot: snapshot.name.clone(),
                category_snapshot: snapshot.category_name.clone(),
                spice_level: input.spice_level,
                unit_sell_price_cents: unit_sell,
                unit_cost_price_cents: snapshot.cost_price_cents,
                qty_ordered: input.qty,
                // 跳队菜不进传菜队列，下单即视为已上
                qty_served: if snapshot.skip_queue { input.qty } else { 0 },
                qty_voided: 0,
                skip_queue_snapshot: snapshot.skip_queue,
            })
        }
        None => {
            let name = input
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| AppError::validation("Ad-hoc item requires a name"))?;
            let sell = input
                .sell_price_cents
                .ok_or_else(|| AppError::validation("Ad-hoc item requires a sell price"))?;
            if sell < 0 {
                return Err(AppError::validation("Sell price cannot be negative"));
            }
            if input.spice_level.is_some() {
                return Err(AppError::validation(
                    "Ad-hoc items do not support spice levels",
                ));
            }
            Ok(ticket::NewTicketItem {
                source_dish_id: None,
                dish_name_snapshot: name.to_string(),
                category_snapshot: ADHOC_CATEGORY.to_string(),
                spice_level: None,
                unit_sell_price_cents: sell,
                unit_cost_price_cents: input.cost_price_cents.unwrap_or(0),
                qty_ordered: input.qty,
                qty_served: 0,
                qty_voided: 0,
                skip_queue_snapshot: false,
            })
        }
    }
}

/// 改量/整退：二选一，条件更新防并发覆盖
pub async fn patch_ticket_item(
    ctx: &AppContext,
    item_id: i64,
    patch: TicketItemPatch,
) -> AppResult<OrderTicketItem> {
    ctx.ensure_available()?;

    match (patch.qty, patch.void_qty) {
        (Some(_), Some(_)) | (None, None) => {
            return Err(AppError::validation(
                "Exactly one of qty / void_qty must be provided",
            ));
        }
        _ => {}
    }

    let mut tx = ctx.pool().begin().await?;

    let item = ticket::find_item(&mut *tx, item_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Ticket item {item_id}")))?;
    let owner = ticket::session_of_item(&mut *tx, item_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Ticket item {item_id}")))?;
    if owner.status == SessionStatus::Closed {
        return Err(AppError::conflict(
            ConflictCode::SessionClosed,
            "Cannot modify items of a closed session",
        ));
    }

    // 先回退，再变更，同一事务
    if owner.status == SessionStatus::PendingCheckout {
        session::set_status_if(
            &mut *tx,
            owner.id,
            SessionStatus::PendingCheckout,
            SessionStatus::Dining,
        )
        .await?;
    }

    if let Some(new_qty) = patch.qty {
        if new_qty < 1 {
            return Err(AppError::validation(format!(
                "Quantity must be a positive integer, got {new_qty}"
            )));
        }
        let floor = item.qty_served + item.qty_voided;
        if new_qty < floor {
            return Err(AppError::conflict(
                ConflictCode::InvalidQty,
                format!(
                    "Quantity {new_qty} is below the served+voided floor of {floor}"
                ),
            ));
        }
        let applied =
            ticket::update_qty_ordered(&mut *tx, item_id, new_qty, item.qty_ordered).await?;
        if !applied {
            return Err(AppError::concurrent_modification());
        }
    } else if let Some(void_qty) = patch.void_qty {
        if void_qty < 1 {
            return Err(AppError::validation(format!(
                "Void quantity must be a positive integer, got {void_qty}"
            )));
        }
        let pending = item.pending_qty();
        if pending <= 0 {
            return Err(AppError::conflict(
                ConflictCode::NoPendingQty,
                "Item has no pending quantity to void",
            ));
        }
        if void_qty > pending {
            return Err(AppError::conflict(
                ConflictCode::VoidExceedsPending,
                format!("Void quantity {void_qty} exceeds pending {pending}"),
            ));
        }
        let applied = ticket::increment_voided(&mut *tx, item_id, void_qty, item.qty_voided).await?;
        if !applied {
            return Err(AppError::concurrent_modification());
        }
    }

    // 变更可能补齐或打破「全部上齐」条件
    evaluate_auto_transition(&mut *tx, owner.id).await?;

    let updated = ticket::find_item(&mut *tx, item_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Ticket item {item_id}")))?;
    tx.commit().await?;

    ctx.notifier.emit(
        EventKind::ServingUpdated,
        json!({ "item_id": item_id, "session_id": owner.id }),
    );
    ctx.notifier.emit(
        EventKind::TableUpdated,
        json!({ "table_id": owner.table_id }),
    );
    Ok(updated)
}
