//! Dining Table Model (桌台)

use serde::{Deserialize, Serialize};

use super::session::SessionStatus;
use super::ticket::SpiceLevel;

/// Dining table entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct DiningTable {
    pub id: i64,
    /// Human-facing display number, unique
    pub table_no: String,
    pub sort_order: i64,
    pub is_enabled: bool,
}

/// Create dining table payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableCreate {
    pub table_no: String,
    pub sort_order: Option<i64>,
    pub is_enabled: Option<bool>,
}

/// Update dining table payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableUpdate {
    pub table_no: Option<String>,
    pub sort_order: Option<i64>,
    pub is_enabled: Option<bool>,
}

/// Table with its current (non-CLOSED) session, for the floor view
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct TableWithSession {
    pub id: i64,
    pub table_no: String,
    pub sort_order: i64,
    pub is_enabled: bool,
    pub session_id: Option<i64>,
    pub session_status: Option<SessionStatus>,
    pub session_opened_at: Option<i64>,
}

/// Client-facing table state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableState {
    Idle,
    Dining,
    PendingCheckout,
}

impl From<Option<SessionStatus>> for TableState {
    fn from(status: Option<SessionStatus>) -> Self {
        match status {
            Some(SessionStatus::Dining) => Self::Dining,
            Some(SessionStatus::PendingCheckout) => Self::PendingCheckout,
            _ => Self::Idle,
        }
    }
}

/// Serve progress of one dish rollup line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DishServeStatus {
    Unserved,
    Partial,
    Served,
}

/// Per-dish rollup within a table summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDishItem {
    pub name: String,
    pub spice_level: Option<SpiceLevel>,
    pub qty_ordered: i64,
    pub qty_served: i64,
    pub qty_unserved: i64,
    pub unit_price_cents: i64,
    pub skip_queue: bool,
    pub status: DishServeStatus,
}

/// Aggregated view of one table: current session, live total and
/// per-dish serve progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSummary {
    pub id: i64,
    pub table_no: String,
    pub sort_order: i64,
    pub is_enabled: bool,
    pub status: TableState,
    pub session_id: Option<i64>,
    pub total_cents: i64,
    pub dishes: Vec<TableDishItem>,
    pub unserved_count: i64,
}
