//! Shared types for the table-session POS core
//!
//! Domain models and DTOs used by the server crate and by API clients.
//! DB row types carry a feature-gated `sqlx::FromRow` derive so that
//! clients can depend on this crate without pulling in the database stack.

pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
