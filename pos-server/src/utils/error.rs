//! 统一错误处理
//!
//! 所有核心操作同步返回 `AppResult`：要么结果，要么分类错误。
//! 协作层（HTTP 等）只需要按错误类别映射状态码。
//!
//! | 类别 | 说明 |
//! |------|------|
//! | Validation | 入参不合法，调用方修正后重试 |
//! | NotFound | 引用的桌台/会话/条目/菜品不存在 |
//! | Conflict | 状态不变量阻止本次变更（带子码） |
//! | Maintenance | 维护模式，所有请求暂停 |
//! | Database / Internal | 不可预期的存储失败，事务已回滚 |

use crate::db::repository::RepoError;

/// Conflict sub-code — tells the caller which invariant blocked the request
/// and whether a retry after re-reading state can help.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictCode {
    ActiveSessionExists,
    SessionClosed,
    SessionNotPendingCheckout,
    SessionNotClosed,
    SessionHasOrders,
    NoPendingQty,
    ServeExceedsPending,
    NoServedQty,
    UnserveExceedsServed,
    InvalidQty,
    VoidExceedsPending,
    IdempotencyKeyConflict,
    ConcurrentModification,
    TableNoConflict,
    TableHasActiveSession,
    TableDisabled,
}

impl ConflictCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ActiveSessionExists => "ACTIVE_SESSION_EXISTS",
            Self::SessionClosed => "SESSION_CLOSED",
            Self::SessionNotPendingCheckout => "SESSION_NOT_PENDING_CHECKOUT",
            Self::SessionNotClosed => "SESSION_NOT_CLOSED",
            Self::SessionHasOrders => "SESSION_HAS_ORDERS",
            Self::NoPendingQty => "NO_PENDING_QTY",
            Self::ServeExceedsPending => "SERVE_EXCEEDS_PENDING",
            Self::NoServedQty => "NO_SERVED_QTY",
            Self::UnserveExceedsServed => "UNSERVE_EXCEEDS_SERVED",
            Self::InvalidQty => "INVALID_QTY",
            Self::VoidExceedsPending => "VOID_EXCEEDS_PENDING",
            Self::IdempotencyKeyConflict => "IDEMPOTENCY_KEY_CONFLICT",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::TableNoConflict => "TABLE_NO_CONFLICT",
            Self::TableHasActiveSession => "TABLE_HAS_ACTIVE_SESSION",
            Self::TableDisabled => "TABLE_DISABLED",
        }
    }
}

impl std::fmt::Display for ConflictCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 应用错误枚举
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("[{code}] {message}")]
    Conflict { code: ConflictCode, message: String },

    #[error("System under maintenance, please retry later")]
    Maintenance,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for all core operations
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// `NotFound` for a named resource ("Session", "Table", ...)
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(code: ConflictCode, message: impl Into<String>) -> Self {
        Self::Conflict {
            code,
            message: message.into(),
        }
    }

    /// The canonical retry hint when a guarded update affected zero rows
    /// despite a passing pre-check.
    pub fn concurrent_modification() -> Self {
        Self::conflict(
            ConflictCode::ConcurrentModification,
            "Concurrent modification detected, please retry",
        )
    }

    /// Conflict sub-code, if this is a conflict
    pub fn conflict_code(&self) -> Option<ConflictCode> {
        match self {
            Self::Conflict { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => AppError::NotFound(msg),
            // Duplicates carry a context-dependent conflict code; call sites
            // that can produce one must remap before this fallback fires.
            RepoError::Duplicate(msg) => AppError::Internal(format!("unhandled duplicate: {msg}")),
            RepoError::Validation(msg) => AppError::Validation(msg),
            RepoError::Database(msg) => {
                tracing::error!(target: "database", error = %msg, "Database error occurred");
                AppError::Database(msg)
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!(target: "database", error = %err, "Database error occurred");
        AppError::Database(err.to_string())
    }
}
