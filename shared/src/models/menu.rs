//! Menu Models (read-only snapshot surface)
//!
//! Menu CRUD lives outside the core; the ledger only needs the joined
//! dish+category snapshot taken at order time.

use serde::{Deserialize, Serialize};

/// Menu category entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub sort_order: i64,
    pub is_enabled: bool,
    /// Items of this category bypass the serving queue
    pub skip_queue: bool,
    pub discount_rate: f64,
    pub is_discount_enabled: bool,
}

/// Menu dish entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Dish {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub sell_price_cents: i64,
    pub cost_price_cents: i64,
    pub discount_rate: f64,
    pub is_discount_enabled: bool,
    pub has_spice_option: bool,
    pub is_enabled: bool,
    pub sort_order: i64,
}

/// Joined dish + category row used to snapshot a ticket item at
/// order time
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct DishSnapshot {
    pub id: i64,
    pub name: String,
    pub sell_price_cents: i64,
    pub cost_price_cents: i64,
    pub has_spice_option: bool,
    pub dish_discount_rate: f64,
    pub dish_is_discount_enabled: bool,
    pub category_name: String,
    pub skip_queue: bool,
    pub discount_rate: f64,
    pub is_discount_enabled: bool,
}

impl DishSnapshot {
    /// The more specific discount wins: dish rate if enabled, else
    /// category rate if enabled, else none.
    pub fn effective_discount_rate(&self) -> f64 {
        if self.dish_is_discount_enabled {
            self.dish_discount_rate
        } else if self.is_discount_enabled {
            self.discount_rate
        } else {
            1.0
        }
    }

    /// Sell price after discount, rounded to whole cents
    pub fn discounted_sell_price_cents(&self) -> i64 {
        (self.sell_price_cents as f64 * self.effective_discount_rate()).round() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(
        dish_rate: f64,
        dish_enabled: bool,
        cat_rate: f64,
        cat_enabled: bool,
    ) -> DishSnapshot {
        DishSnapshot {
            id: 1,
            name: "Test Dish".into(),
            sell_price_cents: 1000,
            cost_price_cents: 300,
            has_spice_option: false,
            dish_discount_rate: dish_rate,
            dish_is_discount_enabled: dish_enabled,
            category_name: "Mains".into(),
            skip_queue: false,
            discount_rate: cat_rate,
            is_discount_enabled: cat_enabled,
        }
    }

    #[test]
    fn dish_rate_wins_when_both_enabled() {
        let s = snapshot(0.8, true, 0.5, true);
        assert_eq!(s.effective_discount_rate(), 0.8);
        assert_eq!(s.discounted_sell_price_cents(), 800);
    }

    #[test]
    fn category_rate_applies_when_dish_disabled() {
        let s = snapshot(0.8, false, 0.5, true);
        assert_eq!(s.effective_discount_rate(), 0.5);
        assert_eq!(s.discounted_sell_price_cents(), 500);
    }

    #[test]
    fn no_discount_when_both_disabled() {
        let s = snapshot(0.8, false, 0.5, false);
        assert_eq!(s.effective_discount_rate(), 1.0);
        assert_eq!(s.discounted_sell_price_cents(), 1000);
    }

    #[test]
    fn discounted_price_rounds_to_whole_cents() {
        let mut s = snapshot(0.33, true, 1.0, false);
        s.sell_price_cents = 995; // 328.35 -> 328
        assert_eq!(s.discounted_sell_price_cents(), 328);
    }
}
