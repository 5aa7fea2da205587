//! Table Session Model (一桌一餐)

use serde::{Deserialize, Serialize};

use super::ticket::{OrderTicket, OrderTicketItem};

/// Session lifecycle status
///
/// DINING → PENDING_CHECKOUT happens automatically once every ordered
/// unit is served or voided; PENDING_CHECKOUT → DINING whenever new
/// pending quantity appears; CLOSED only through checkout and is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum SessionStatus {
    Dining,
    PendingCheckout,
    Closed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dining => "DINING",
            Self::PendingCheckout => "PENDING_CHECKOUT",
            Self::Closed => "CLOSED",
        }
    }
}

/// One dining occupancy of a table, from open to checkout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct TableSession {
    pub id: i64,
    pub table_id: i64,
    pub status: SessionStatus,
    /// Unix millis
    pub opened_at: i64,
    /// Unix millis, null until checkout
    pub closed_at: Option<i64>,
}

/// Session with its tickets, nested items and live total
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: TableSession,
    pub tickets: Vec<TicketWithItems>,
    pub total_cents: i64,
}

/// Ticket with its line items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketWithItems {
    #[serde(flatten)]
    pub ticket: OrderTicket,
    pub items: Vec<OrderTicketItem>,
}
