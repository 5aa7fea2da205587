//! Menu Lookup Repository (菜单快照查询)
//!
//! 只读：下单时取一次 dish+category 联合快照。菜单 CRUD 在核心之外。

use shared::models::DishSnapshot;
use sqlx::SqliteExecutor;

use super::RepoResult;

/// Joined dish + category snapshot for an enabled dish
pub async fn dish_snapshot(
    executor: impl SqliteExecutor<'_>,
    dish_id: i64,
) -> RepoResult<Option<DishSnapshot>> {
    let snapshot = sqlx::query_as::<_, DishSnapshot>(
        "SELECT d.id, d.name, d.sell_price_cents, d.cost_price_cents, d.has_spice_option, \
         d.discount_rate AS dish_discount_rate, \
         d.is_discount_enabled AS dish_is_discount_enabled, \
         c.name AS category_name, c.skip_queue, c.discount_rate, c.is_discount_enabled \
         FROM menu_dish d \
         JOIN menu_category c ON c.id = d.category_id \
         WHERE d.id = ? AND d.is_enabled = 1",
    )
    .bind(dish_id)
    .fetch_optional(executor)
    .await?;
    Ok(snapshot)
}
