//! Table Directory & Summary (桌台与楼面视图)
//!
//! 汇总是读模型：每次计算时顺带自愈「卡在 DINING」的会话
//! （全部上齐却没完成自动转移），规则与写路径完全一致。

use std::collections::HashMap;

use serde_json::json;
use shared::models::{
    DiningTable, DishServeStatus, SessionStatus, TableCreate, TableDishItem, TableState,
    TableSummary, TableUpdate, TableWithSession,
};

use crate::core::AppContext;
use crate::db::repository::{RepoError, dining_table, session, table_summary};
use crate::db::repository::table_summary::SummaryItemRow;
use crate::events::EventKind;
use crate::utils::{AppError, AppResult, ConflictCode};

/// 楼面列表：启用的桌台与各自的当前会话
pub async fn list_tables(ctx: &AppContext) -> AppResult<Vec<TableWithSession>> {
    ctx.ensure_available()?;
    let tables = dining_table::find_all_with_session(ctx.pool()).await?;
    Ok(tables.into_iter().filter(|t| t.is_enabled).collect())
}

pub async fn create_table(ctx: &AppContext, data: TableCreate) -> AppResult<DiningTable> {
    ctx.ensure_available()?;
    let table_no = data.table_no.trim();
    if table_no.is_empty() {
        return Err(AppError::validation("Table number is required"));
    }

    let created = match dining_table::create(
        ctx.pool(),
        TableCreate {
            table_no: table_no.to_string(),
            ..data
        },
    )
    .await
    {
        Ok(t) => t,
        Err(RepoError::Duplicate(_)) => {
            return Err(AppError::conflict(
                ConflictCode::TableNoConflict,
                format!("Table number '{table_no}' is already in use"),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(table_id = created.id, table_no = %created.table_no, "Table created");
    ctx.notifier
        .emit(EventKind::TableUpdated, json!({ "table_id": created.id }));
    Ok(created)
}

pub async fn update_table(
    ctx: &AppContext,
    table_id: i64,
    data: TableUpdate,
) -> AppResult<DiningTable> {
    ctx.ensure_available()?;
    let pool = ctx.pool();

    dining_table::find_by_id(pool, table_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Table {table_id}")))?;

    if data.table_no.is_some() || data.sort_order.is_some() {
        if let Some(no) = data.table_no.as_deref()
            && no.trim().is_empty()
        {
            return Err(AppError::validation("Table number cannot be empty"));
        }
        match dining_table::update_fields(pool, table_id, &data).await {
            Ok(_) => {}
            Err(RepoError::Duplicate(_)) => {
                return Err(AppError::conflict(
                    ConflictCode::TableNoConflict,
                    "Table number is already in use",
                ));
            }
            Err(e) => return Err(e.into()),
        }
    }

    if let Some(enabled) = data.is_enabled {
        // 停用受「无活跃会话」守卫：预检给出友好错误码，条件更新兜底
        if !enabled && dining_table::has_active_session(pool, table_id).await? {
            return Err(AppError::conflict(
                ConflictCode::TableHasActiveSession,
                "Cannot disable a table with an active session",
            ));
        }
        let applied = dining_table::set_enabled_guarded(pool, table_id, enabled).await?;
        if !applied && !enabled {
            return Err(AppError::concurrent_modification());
        }
    }

    let updated = dining_table::find_by_id(pool, table_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Table {table_id}")))?;
    ctx.notifier
        .emit(EventKind::TableUpdated, json!({ "table_id": table_id }));
    Ok(updated)
}

/// 全部桌台汇总（含自愈检查）
pub async fn table_summaries(ctx: &AppContext) -> AppResult<Vec<TableSummary>> {
    ctx.ensure_available()?;
    let pool = ctx.pool();

    let tables = dining_table::find_all_with_session(pool).await?;
    let items = table_summary::active_session_items(pool).await?;
    let ticket_counts: HashMap<i64, i64> = table_summary::active_session_ticket_counts(pool)
        .await?
        .into_iter()
        .collect();

    let mut by_session: HashMap<i64, Vec<SummaryItemRow>> = HashMap::new();
    for row in items {
        by_session.entry(row.session_id).or_default().push(row);
    }

    let mut summaries = Vec::with_capacity(tables.len());
    for table in tables {
        // 停用的桌台不出现在楼面汇总里（停用前提是无活跃会话）
        if !table.is_enabled {
            continue;
        }
        let mut summary = build_summary(&table, &by_session);

        // Self-healing: 全部上齐却仍 DINING 的会话推进到 PENDING_CHECKOUT
        if let (Some(session_id), Some(SessionStatus::Dining)) =
            (table.session_id, table.session_status)
            && summary.unserved_count == 0
            && ticket_counts.get(&session_id).copied().unwrap_or(0) > 0
            && summary.dishes.iter().any(|d| !d.skip_queue)
        {
            let applied = session::set_status_if(
                pool,
                session_id,
                SessionStatus::Dining,
                SessionStatus::PendingCheckout,
            )
            .await?;
            if applied {
                tracing::info!(session_id, "Self-healed stuck DINING session");
                summary.status = TableState::PendingCheckout;
                ctx.notifier
                    .emit(EventKind::TableUpdated, json!({ "table_id": table.id }));
            }
        }
        summaries.push(summary);
    }
    Ok(summaries)
}

/// 单桌汇总
pub async fn table_summary(ctx: &AppContext, table_id: i64) -> AppResult<TableSummary> {
    let summaries = table_summaries(ctx).await?;
    summaries
        .into_iter()
        .find(|s| s.id == table_id)
        .ok_or_else(|| AppError::not_found(format!("Table {table_id}")))
}

/// 聚合一张桌的汇总行：按 (菜名, 辣度, 单价, 跳队) 合并，整退的份数不计
fn build_summary(
    table: &TableWithSession,
    by_session: &HashMap<i64, Vec<SummaryItemRow>>,
) -> TableSummary {
    let mut dishes: Vec<TableDishItem> = Vec::new();
    let mut total_cents = 0i64;
    let mut unserved_count = 0i64;

    if let Some(session_id) = table.session_id
        && let Some(rows) = by_session.get(&session_id)
    {
        for row in rows {
            let live = row.qty_ordered - row.qty_voided;
            if live <= 0 {
                continue; // fully voided line
            }
            total_cents += row.unit_sell_price_cents * live;

            let entry = dishes.iter_mut().find(|d| {
                d.name == row.dish_name
                    && d.spice_level == row.spice_level
                    && d.unit_price_cents == row.unit_sell_price_cents
                    && d.skip_queue == row.skip_queue_snapshot
            });
            match entry {
                Some(d) => {
                    d.qty_ordered += live;
                    d.qty_served += row.qty_served;
                }
                None => dishes.push(TableDishItem {
                    name: row.dish_name.clone(),
                    spice_level: row.spice_level,
                    qty_ordered: live,
                    qty_served: row.qty_served,
                    qty_unserved: 0,
                    unit_price_cents: row.unit_sell_price_cents,
                    skip_queue: row.skip_queue_snapshot,
                    status: DishServeStatus::Unserved,
                }),
            }
        }

        for dish in &mut dishes {
            dish.qty_unserved = dish.qty_ordered - dish.qty_served;
            dish.status = if dish.qty_unserved == 0 {
                DishServeStatus::Served
            } else if dish.qty_served == 0 {
                DishServeStatus::Unserved
            } else {
                DishServeStatus::Partial
            };
            unserved_count += dish.qty_unserved;
        }
    }

    TableSummary {
        id: table.id,
        table_no: table.table_no.clone(),
        sort_order: table.sort_order,
        is_enabled: table.is_enabled,
        status: TableState::from(table.session_status),
        session_id: table.session_id,
        total_cents,
        dishes,
        unserved_count,
    }
}
