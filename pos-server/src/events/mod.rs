//! 事件通知
//!
//! 每次成功变更后向订阅者广播一条事件，fire-and-forget：
//! 没有订阅者或通道滞后都不影响业务结果。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

/// Event kinds emitted by the core after successful mutations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    SessionOpened,
    SessionDeleted,
    TicketCreated,
    ServingUpdated,
    CheckoutCompleted,
    TableUpdated,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionOpened => "session.opened",
            Self::SessionDeleted => "session.deleted",
            Self::TicketCreated => "ticket.created",
            Self::ServingUpdated => "serving.updated",
            Self::CheckoutCompleted => "checkout.completed",
            Self::TableUpdated => "table.updated",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One broadcast notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub kind: EventKind,
    /// Event payload (session/ticket/table ids, etc.)
    pub payload: Value,
    /// Unix millis at emit time
    pub emitted_at: i64,
}

/// 事件广播器 - 核心到外层（SSE、打印等）的单向扇出
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    /// 创建指定容量的广播器
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// 发布事件（无订阅者时静默丢弃）
    pub fn emit(&self, kind: EventKind, payload: Value) {
        let note = Notification {
            kind,
            payload,
            emitted_at: shared::util::now_millis(),
        };
        tracing::debug!(event = %kind, "Emitting notification");
        // SendError 只在零订阅者时出现，不是错误
        let _ = self.tx.send(note);
    }

    /// 订阅事件流
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// 当前订阅者数量
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::with_capacity(1024)
    }
}
