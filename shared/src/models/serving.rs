//! Serving Queue Models (传菜)

use serde::{Deserialize, Serialize};

use super::session::SessionStatus;
use super::ticket::SpiceLevel;

/// One outstanding line in the kitchen serving queue (FIFO by ticket
/// creation time, then item id)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ServingQueueItem {
    pub item_id: i64,
    pub ticket_id: i64,
    pub table_no: String,
    pub table_id: i64,
    pub session_id: i64,
    pub dish_name: String,
    pub spice_level: Option<SpiceLevel>,
    /// Pending quantity still to serve
    pub quantity: i64,
    /// Ticket creation time, Unix millis
    pub ordered_at: i64,
}

/// One already-served line, for the served board
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ServedItem {
    pub item_id: i64,
    pub ticket_id: i64,
    pub table_no: String,
    pub table_id: i64,
    pub session_id: i64,
    pub dish_name: String,
    pub spice_level: Option<SpiceLevel>,
    pub qty_served: i64,
    pub qty_ordered: i64,
    pub ordered_at: i64,
}

/// Full serving context of one item, returned by serve/unserve
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ServingItemView {
    pub item_id: i64,
    pub ticket_id: i64,
    pub table_no: String,
    pub table_id: i64,
    pub session_id: i64,
    pub session_status: SessionStatus,
    pub dish_name: String,
    pub spice_level: Option<SpiceLevel>,
    pub qty_ordered: i64,
    pub qty_served: i64,
    pub qty_voided: i64,
    pub pending_qty: i64,
    pub ordered_at: i64,
}

/// Serve/unserve request payload (defaults to one unit)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServeRequest {
    pub qty: Option<i64>,
}
