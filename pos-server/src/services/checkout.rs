//! Checkout / Finalization (结账)
//!
//! 全部检查与最终写入在一个事务里，双重结账只会产生一条支付记录：
//! 输家通过 session/key 重读拿到赢家的那条，幂等返回。

use serde_json::json;
use shared::models::{CheckoutOutcome, CheckoutRequest, Payment, SessionStatus};

use crate::core::AppContext;
use crate::db::repository::{RepoError, checkout, session};
use crate::events::EventKind;
use crate::utils::{AppError, AppResult, ConflictCode};

pub async fn checkout_session(
    ctx: &AppContext,
    session_id: i64,
    req: CheckoutRequest,
) -> AppResult<CheckoutOutcome> {
    ctx.ensure_available()?;
    let key = req.idempotency_key.trim();
    if key.is_empty() {
        return Err(AppError::validation("Idempotency key is required"));
    }
    let pool = ctx.pool();

    let mut tx = pool.begin().await?;

    let current = session::find_by_id(&mut *tx, session_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Session {session_id}")))?;

    // (2) idempotent on session
    if let Some(existing) = checkout::payment_by_session(&mut *tx, session_id).await? {
        return Ok(CheckoutOutcome {
            payment: existing,
            idempotent: true,
        });
    }

    // (3) idempotent on key, unless the key belongs to another session
    if let Some(existing) = checkout::payment_by_key(&mut *tx, key).await? {
        if existing.session_id != session_id {
            return Err(AppError::conflict(
                ConflictCode::IdempotencyKeyConflict,
                "Idempotency key already used by another session",
            ));
        }
        return Ok(CheckoutOutcome {
            payment: existing,
            idempotent: true,
        });
    }

    // (4) only a fully-served session can be finalized
    match current.status {
        SessionStatus::PendingCheckout => {}
        SessionStatus::Closed => {
            return Err(AppError::conflict(
                ConflictCode::SessionClosed,
                "Session is already closed",
            ));
        }
        SessionStatus::Dining => {
            return Err(AppError::conflict(
                ConflictCode::SessionNotPendingCheckout,
                "Session still has unserved items",
            ));
        }
    }

    // (5) live amount, payment insert and session close, one transaction
    let amount_cents = session::live_total_cents(&mut *tx, session_id).await?;
    let now = shared::util::now_millis();
    let business_day = ctx.business_day();

    let payment = match checkout::insert_payment(
        &mut *tx,
        session_id,
        req.method,
        amount_cents,
        now,
        &business_day,
        key,
    )
    .await
    {
        Ok(p) => p,
        Err(err) => {
            drop(tx); // rollback, then see whether a concurrent winner exists
            return resolve_lost_race(ctx, session_id, key, err).await;
        }
    };

    if !session::close_if_pending(&mut *tx, session_id, now).await? {
        drop(tx);
        return resolve_lost_race(
            ctx,
            session_id,
            key,
            RepoError::Database("Session left PENDING_CHECKOUT during checkout".into()),
        )
        .await;
    }

    if let Err(err) = tx.commit().await {
        return resolve_lost_race(ctx, session_id, key, err.into()).await;
    }

    tracing::info!(
        session_id,
        payment_id = payment.id,
        amount_cents,
        business_day = %business_day,
        "Checkout completed"
    );
    ctx.notifier.emit(
        EventKind::CheckoutCompleted,
        json!({
            "session_id": session_id,
            "payment_id": payment.id,
            "amount_cents": amount_cents,
        }),
    );
    ctx.notifier.emit(
        EventKind::TableUpdated,
        json!({ "table_id": current.table_id }),
    );

    Ok(CheckoutOutcome {
        payment,
        idempotent: false,
    })
}

/// 写阶段失败后的幂等收尾：并发赢家已经落了支付行就返回它，
/// 否则把原始错误按冲突语义向上抛。
async fn resolve_lost_race(
    ctx: &AppContext,
    session_id: i64,
    key: &str,
    err: RepoError,
) -> AppResult<CheckoutOutcome> {
    if let Some(existing) = checkout::payment_by_session(ctx.pool(), session_id).await? {
        return Ok(CheckoutOutcome {
            payment: existing,
            idempotent: true,
        });
    }
    if let Some(existing) = checkout::payment_by_key(ctx.pool(), key).await? {
        if existing.session_id != session_id {
            return Err(AppError::conflict(
                ConflictCode::IdempotencyKeyConflict,
                "Idempotency key already used by another session",
            ));
        }
        return Ok(CheckoutOutcome {
            payment: existing,
            idempotent: true,
        });
    }
    match err {
        // Duplicate with no visible payment row: writer still in flight
        RepoError::Duplicate(_) => Err(AppError::concurrent_modification()),
        other => Err(other.into()),
    }
}

/// 查询某会话的支付记录
pub async fn session_payment(ctx: &AppContext, session_id: i64) -> AppResult<Option<Payment>> {
    ctx.ensure_available()?;
    Ok(checkout::payment_by_session(ctx.pool(), session_id).await?)
}
