//! Shared test fixtures: on-disk SQLite in a temp dir plus menu seeding.
//! In-memory SQLite would give each pooled connection its own database,
//! so tests always use a real file.

#![allow(dead_code)]

use pos_server::{AppContext, Config};
use shared::models::{TableCreate, TicketCreate, TicketItemInput};
use sqlx::SqlitePool;
use tempfile::TempDir;

pub struct TestCtx {
    pub ctx: AppContext,
    _dir: TempDir,
}

impl std::ops::Deref for TestCtx {
    type Target = AppContext;
    fn deref(&self) -> &AppContext {
        &self.ctx
    }
}

pub async fn test_ctx() -> TestCtx {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("pos-test.db");
    let config = Config {
        work_dir: dir.path().to_string_lossy().into_owned(),
        db_path: db_path.to_string_lossy().into_owned(),
        business_timezone: "Asia/Shanghai".into(),
        business_day_cutoff: "00:00".into(),
        log_level: "warn".into(),
        environment: "test".into(),
        event_channel_capacity: 64,
    };
    let ctx = AppContext::initialize(config).await.expect("init context");
    TestCtx { ctx, _dir: dir }
}

pub async fn seed_table(ctx: &AppContext, table_no: &str) -> i64 {
    pos_server::services::tables::create_table(
        ctx,
        TableCreate {
            table_no: table_no.into(),
            sort_order: None,
            is_enabled: None,
        },
    )
    .await
    .expect("create table")
    .id
}

pub async fn seed_category(
    pool: &SqlitePool,
    name: &str,
    skip_queue: bool,
    discount_rate: f64,
    is_discount_enabled: bool,
) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO menu_category (name, skip_queue, discount_rate, is_discount_enabled) \
         VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(name)
    .bind(skip_queue)
    .bind(discount_rate)
    .bind(is_discount_enabled)
    .fetch_one(pool)
    .await
    .expect("seed category")
}

pub struct DishSeed {
    pub sell_price_cents: i64,
    pub cost_price_cents: i64,
    pub discount_rate: f64,
    pub is_discount_enabled: bool,
    pub has_spice_option: bool,
}

impl Default for DishSeed {
    fn default() -> Self {
        Self {
            sell_price_cents: 1000,
            cost_price_cents: 300,
            discount_rate: 1.0,
            is_discount_enabled: false,
            has_spice_option: false,
        }
    }
}

pub async fn seed_dish(pool: &SqlitePool, category_id: i64, name: &str, seed: DishSeed) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO menu_dish (category_id, name, sell_price_cents, cost_price_cents, \
         discount_rate, is_discount_enabled, has_spice_option) \
         VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(category_id)
    .bind(name)
    .bind(seed.sell_price_cents)
    .bind(seed.cost_price_cents)
    .bind(seed.discount_rate)
    .bind(seed.is_discount_enabled)
    .bind(seed.has_spice_option)
    .fetch_one(pool)
    .await
    .expect("seed dish")
}

/// One dish-backed line
pub fn dish_line(dish_id: i64, qty: i64) -> TicketItemInput {
    TicketItemInput {
        dish_id: Some(dish_id),
        name: None,
        sell_price_cents: None,
        cost_price_cents: None,
        qty,
        spice_level: None,
    }
}

pub fn ticket_of(items: Vec<TicketItemInput>) -> TicketCreate {
    TicketCreate { items, note: None }
}

/// Open a table, order `qty` units of a freshly seeded dish, return
/// (session_id, item_id, unit_price_cents).
pub async fn open_with_order(ctx: &AppContext, table_no: &str, qty: i64) -> (i64, i64, i64) {
    let table_id = seed_table(ctx, table_no).await;
    let category_id = seed_category(ctx.pool(), "Mains", false, 1.0, false).await;
    let dish_id = seed_dish(ctx.pool(), category_id, "Braised Pork", DishSeed::default()).await;

    let session = pos_server::services::sessions::open_session(ctx, table_id)
        .await
        .expect("open session");
    let ticket =
        pos_server::services::tickets::create_ticket(ctx, session.id, ticket_of(vec![dish_line(
            dish_id, qty,
        )]))
        .await
        .expect("create ticket");
    let item = &ticket.items[0];
    (session.id, item.id, item.unit_sell_price_cents)
}

/// Serve every pending unit of the session's items
pub async fn serve_all(ctx: &AppContext, session_id: i64) {
    let queue = pos_server::services::serving::serving_queue(ctx)
        .await
        .expect("queue");
    for entry in queue.iter().filter(|q| q.session_id == session_id) {
        pos_server::services::serving::serve_item(
            ctx,
            entry.item_id,
            shared::models::ServeRequest {
                qty: Some(entry.quantity),
            },
        )
        .await
        .expect("serve");
    }
}
