//! Payment Model (结账)

use serde::{Deserialize, Serialize};

/// Recorded payment method — methods are recorded, not processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "UPPERCASE"))]
pub enum PaymentMethod {
    Cash,
    Wechat,
    Alipay,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "CASH",
            Self::Wechat => "WECHAT",
            Self::Alipay => "ALIPAY",
        }
    }
}

/// The checkout record for a session — one payment per session,
/// immutable once created
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: i64,
    pub session_id: i64,
    pub method: PaymentMethod,
    pub amount_cents: i64,
    /// Unix millis
    pub paid_at: i64,
    /// Calendar-date label (business time zone) used for reporting
    pub business_day: String,
    pub idempotency_key: Option<String>,
}

/// Checkout request payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub method: PaymentMethod,
    pub idempotency_key: String,
}

/// Checkout result — `idempotent` marks a replayed request that
/// returned the already-existing payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutOutcome {
    pub payment: Payment,
    pub idempotent: bool,
}
