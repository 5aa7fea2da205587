//! Data models
//!
//! Shared between pos-server and frontend (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY), all timestamps Unix
//! millis, all money integer cents.

pub mod dining_table;
pub mod history;
pub mod menu;
pub mod payment;
pub mod serving;
pub mod session;
pub mod ticket;

// Re-exports
pub use dining_table::*;
pub use history::*;
pub use menu::*;
pub use payment::*;
pub use serving::*;
pub use session::*;
pub use ticket::*;
