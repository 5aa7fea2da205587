//! Order Ticket Model (下单)

use serde::{Deserialize, Serialize};

/// Spice level tag for a ticket item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "UPPERCASE"))]
pub enum SpiceLevel {
    Mild,
    Medium,
    Hot,
}

impl SpiceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mild => "MILD",
            Self::Medium => "MEDIUM",
            Self::Hot => "HOT",
        }
    }
}

/// One order submission within a session. Immutable once created —
/// only its items mutate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderTicket {
    pub id: i64,
    pub session_id: i64,
    /// Unix millis
    pub created_at: i64,
    pub note: Option<String>,
}

/// One line within a ticket
///
/// Name/category/price are snapshots taken at order time — menu edits
/// never alter historical orders. Quantity invariant, enforced on every
/// mutation: `qty_served + qty_voided <= qty_ordered`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderTicketItem {
    pub id: i64,
    pub ticket_id: i64,
    /// Null for ad-hoc items
    pub source_dish_id: Option<i64>,
    pub dish_name_snapshot: String,
    pub category_snapshot: String,
    pub spice_level: Option<SpiceLevel>,
    pub unit_sell_price_cents: i64,
    pub unit_cost_price_cents: i64,
    pub qty_ordered: i64,
    pub qty_served: i64,
    pub qty_voided: i64,
    /// Inherited from the dish's category at order time; skip-queue items
    /// are recorded as served immediately and never enter the kitchen queue.
    pub skip_queue_snapshot: bool,
}

impl OrderTicketItem {
    /// Ordered minus served minus voided, always >= 0
    pub fn pending_qty(&self) -> i64 {
        self.qty_ordered - self.qty_served - self.qty_voided
    }
}

/// Create ticket payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketCreate {
    pub items: Vec<TicketItemInput>,
    pub note: Option<String>,
}

/// One requested line: either dish-backed (`dish_id`) or ad-hoc
/// (`name` + `sell_price_cents`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketItemInput {
    pub dish_id: Option<i64>,
    pub name: Option<String>,
    pub sell_price_cents: Option<i64>,
    pub cost_price_cents: Option<i64>,
    pub qty: i64,
    pub spice_level: Option<SpiceLevel>,
}

/// Patch payload for a ticket item — exactly one field must be set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketItemPatch {
    /// New `qty_ordered`; must stay >= served + voided
    pub qty: Option<i64>,
    /// Quantity to void out of the pending remainder
    pub void_qty: Option<i64>,
}
