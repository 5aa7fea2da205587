//! Closed Session History Models (历史账单)

use serde::{Deserialize, Serialize};

use super::payment::{Payment, PaymentMethod};
use super::session::{SessionStatus, TableSession, TicketWithItems};

/// Filters for the closed-session list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedSessionFilter {
    pub page: i64,
    pub page_size: i64,
    /// Inclusive `YYYY-MM-DD` lower bound on close date
    pub from: Option<String>,
    /// Inclusive `YYYY-MM-DD` upper bound on close date
    pub to: Option<String>,
    /// Substring match on table number
    pub table_no: Option<String>,
}

impl Default for ClosedSessionFilter {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            from: None,
            to: None,
            table_no: None,
        }
    }
}

/// One row of the closed-session list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ClosedSessionListItem {
    pub session_id: i64,
    pub table_id: i64,
    pub table_no: String,
    pub opened_at: i64,
    pub closed_at: Option<i64>,
    pub amount_cents: i64,
    pub payment_method: Option<PaymentMethod>,
    pub paid_at: Option<i64>,
}

/// Paginated closed-session list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedSessionPage {
    pub list: Vec<ClosedSessionListItem>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
}

/// Full detail of one closed session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedSessionDetail {
    pub session_id: i64,
    pub table_id: i64,
    pub table_no: String,
    pub status: SessionStatus,
    pub opened_at: i64,
    pub closed_at: Option<i64>,
    pub payment: Option<Payment>,
    pub tickets: Vec<TicketWithItems>,
    pub total_cents: i64,
}

/// Result of replaying a closed session onto a fresh one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreResult {
    pub source_session_id: i64,
    pub new_session: TableSession,
    pub restored_tickets: i64,
    pub restored_items: i64,
}

/// Result of purging a closed session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResult {
    pub session_id: i64,
    pub deleted_payments: u64,
    pub deleted_items: u64,
    pub deleted_tickets: u64,
}
