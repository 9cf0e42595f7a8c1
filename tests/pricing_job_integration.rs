use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::any::AnyPoolOptions;
use sqlx::{AnyPool, Row};
use tracing_test::traced_test;
use uuid::Uuid;

use medexpo_backend::db::schema;
use medexpo_backend::metrics::counters::Counters;
use medexpo_backend::pricing::adjustment::PricingPolicy;
use medexpo_backend::pricing::job::PricingJob;
use medexpo_backend::pricing::repository::{PricingRepository, SqlxPricingRepository};

const MS_PER_DAY: i64 = 86_400_000;

/// Fixed "now" for every test so window arithmetic is deterministic.
const NOW_MS: i64 = 1_750_000_000_000;

async fn setup_db() -> AnyPool {
    sqlx::any::install_default_drivers();

    let db_name = Uuid::new_v4().to_string();
    let conn_str = format!("sqlite:file:{}?mode=memory&cache=shared", db_name);

    let pool = AnyPoolOptions::new()
        .max_connections(5)
        .connect(&conn_str)
        .await
        .expect("connect sqlite memory db");

    schema::migrate(&pool).await.expect("migrate schema");

    pool
}

async fn seed_master(pool: &AnyPool, id: i64, pct: &str, score: i64) {
    sqlx::query(
        r#"INSERT INTO master_products
           (id, current_price_adjustment_percentage, current_demand_score, last_adjustment_update, initial_seed_price)
           VALUES (?, ?, ?, NULL, '10.00')"#,
    )
    .bind(id)
    .bind(pct)
    .bind(score)
    .execute(pool)
    .await
    .unwrap();
}

async fn seed_product(pool: &AnyPool, id: i64, master_id: i64) {
    sqlx::query(
        r#"INSERT INTO products (id, supplier_id, name, price, discount_price, is_on_sale, stock_level, master_product_id, is_active)
           VALUES (?, 10, ?, '10.00', NULL, 0, 100, ?, 1)"#,
    )
    .bind(id)
    .bind(format!("product-{id}"))
    .bind(master_id)
    .execute(pool)
    .await
    .unwrap();
}

/// Inserts a committed order with one item, `age_days` before NOW_MS.
async fn seed_order(pool: &AnyPool, product_id: i64, quantity: i64, status: &str, age_days: i64) {
    let order_id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"INSERT INTO orders
           (id, user_id, customer_name, customer_phone, customer_address1, customer_address2, customer_city,
            total_amount, status, order_date)
           VALUES (?, 1, 'Amina Yusuf', '+234', '14 Harbour Road', NULL, 'Lagos', '0', ?, ?)"#,
    )
    .bind(&order_id)
    .bind(status)
    .bind(NOW_MS - age_days * MS_PER_DAY)
    .execute(pool)
    .await
    .unwrap();

    sqlx::query(
        r#"INSERT INTO order_items (order_id, product_id, quantity, price_at_time_of_order, supplier_id)
           VALUES (?, ?, ?, '10.00', 10)"#,
    )
    .bind(&order_id)
    .bind(product_id)
    .bind(quantity)
    .execute(pool)
    .await
    .unwrap();
}

fn job(pool: &AnyPool) -> PricingJob {
    PricingJob::new(
        Arc::new(SqlxPricingRepository::new(pool.clone())),
        PricingPolicy::default(),
        Counters::default(),
    )
}

async fn master_row(pool: &AnyPool, id: i64) -> (Decimal, i64, Option<i64>) {
    let row = sqlx::query(
        r#"SELECT current_price_adjustment_percentage, current_demand_score, last_adjustment_update
           FROM master_products WHERE id = ?"#,
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .unwrap();

    (
        Decimal::from_str(&row.get::<String, _>("current_price_adjustment_percentage")).unwrap(),
        row.get::<i64, _>("current_demand_score"),
        row.get::<Option<i64>, _>("last_adjustment_update"),
    )
}

#[tokio::test]
async fn demand_score_sums_recent_committed_items_only() {
    let pool = setup_db().await;
    seed_master(&pool, 1, "0", 0).await;
    seed_product(&pool, 11, 1).await;
    seed_product(&pool, 12, 1).await;

    seed_order(&pool, 11, 5, "pending", 1).await;
    seed_order(&pool, 12, 7, "fulfilled", 3).await;
    seed_order(&pool, 11, 9, "cancelled", 2).await; // excluded status
    seed_order(&pool, 12, 4, "pending", 10).await; // outside 7-day window

    let repo = SqlxPricingRepository::new(pool.clone());
    let cutoff = PricingPolicy::default().window_cutoff_ms(NOW_MS);
    let score = repo.demand_score(1, cutoff).await.unwrap();

    assert_eq!(score, 12);
}

#[tokio::test]
async fn demand_score_is_zero_without_orders() {
    let pool = setup_db().await;
    seed_master(&pool, 1, "0", 0).await;
    seed_product(&pool, 11, 1).await;

    let repo = SqlxPricingRepository::new(pool.clone());
    let cutoff = PricingPolicy::default().window_cutoff_ms(NOW_MS);
    assert_eq!(repo.demand_score(1, cutoff).await.unwrap(), 0);
}

#[tokio::test]
async fn high_demand_steps_percentage_and_stamps_the_row() {
    let pool = setup_db().await;
    seed_master(&pool, 1, "0", 0).await;
    seed_product(&pool, 11, 1).await;
    seed_order(&pool, 11, 25, "pending", 1).await;

    let summary = job(&pool).run_once(NOW_MS).await.unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.adjusted, 1);

    let (pct, score, stamped) = master_row(&pool, 1).await;
    assert_eq!(pct, dec!(0.005));
    assert_eq!(score, 25);
    assert_eq!(stamped, Some(NOW_MS));
}

#[tokio::test]
async fn rerun_without_new_orders_leaves_percentage_unchanged() {
    let pool = setup_db().await;
    seed_master(&pool, 1, "0", 0).await;
    seed_product(&pool, 11, 1).await;
    seed_order(&pool, 11, 25, "pending", 1).await;

    let job = job(&pool);
    job.run_once(NOW_MS).await.unwrap();
    let (pct_first, _, stamp_first) = master_row(&pool, 1).await;
    assert_eq!(pct_first, dec!(0.005));

    // Same order history, later tick: no second step.
    let summary = job.run_once(NOW_MS + 60_000).await.unwrap();
    assert_eq!(summary.adjusted, 0);

    let (pct_second, score, stamp_second) = master_row(&pool, 1).await;
    assert_eq!(pct_second, dec!(0.005));
    assert_eq!(score, 25);
    assert_eq!(stamp_second, stamp_first);
}

#[tokio::test]
async fn demand_collapse_steps_back_down() {
    let pool = setup_db().await;
    seed_master(&pool, 1, "0", 0).await;
    seed_product(&pool, 11, 1).await;
    seed_order(&pool, 11, 25, "pending", 1).await;

    let job = job(&pool);
    job.run_once(NOW_MS).await.unwrap();
    let (pct, ..) = master_row(&pool, 1).await;
    assert_eq!(pct, dec!(0.005));

    // Eight days later the burst has aged out of the window; only a
    // trickle order placed on the new tick's day remains.
    seed_order(&pool, 11, 3, "pending", -8).await;
    let later = NOW_MS + 8 * MS_PER_DAY;
    job.run_once(later).await.unwrap();

    let (pct, score, _) = master_row(&pool, 1).await;
    assert_eq!(score, 3);
    assert_eq!(pct, dec!(0.000));
}

#[tokio::test]
async fn percentage_never_leaves_the_configured_bounds() {
    let pool = setup_db().await;
    seed_master(&pool, 1, "0.0990", 0).await;
    seed_product(&pool, 11, 1).await;
    seed_order(&pool, 11, 30, "pending", 1).await;

    let job = job(&pool);
    job.run_once(NOW_MS).await.unwrap();
    let (pct, ..) = master_row(&pool, 1).await;
    assert_eq!(pct, dec!(0.10)); // 0.099 + 0.005 clamped

    // More demand keeps arriving; the cap holds.
    seed_order(&pool, 11, 40, "pending", 0).await;
    job.run_once(NOW_MS + 60_000).await.unwrap();
    let (pct, score, _) = master_row(&pool, 1).await;
    assert_eq!(score, 70);
    assert_eq!(pct, dec!(0.10));
}

#[tokio::test]
async fn dead_band_updates_score_but_not_percentage() {
    let pool = setup_db().await;
    seed_master(&pool, 1, "0.02", 0).await;
    seed_product(&pool, 11, 1).await;
    seed_order(&pool, 11, 10, "pending", 1).await;

    let summary = job(&pool).run_once(NOW_MS).await.unwrap();
    assert_eq!(summary.adjusted, 0);

    let (pct, score, stamped) = master_row(&pool, 1).await;
    assert_eq!(pct, dec!(0.02));
    assert_eq!(score, 10);
    assert_eq!(stamped, None);
}

#[tokio::test]
async fn each_master_product_is_adjusted_independently() {
    let pool = setup_db().await;
    seed_master(&pool, 1, "0", 0).await;
    seed_master(&pool, 2, "0.03", 9).await;
    seed_product(&pool, 11, 1).await;
    seed_product(&pool, 21, 2).await;

    seed_order(&pool, 11, 25, "pending", 1).await; // high demand for master 1
    seed_order(&pool, 21, 2, "pending", 1).await; // low demand for master 2

    let summary = job(&pool).run_once(NOW_MS).await.unwrap();
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.adjusted, 2);

    let (pct1, ..) = master_row(&pool, 1).await;
    let (pct2, ..) = master_row(&pool, 2).await;
    assert_eq!(pct1, dec!(0.005));
    assert_eq!(pct2, dec!(0.025));
}

#[tokio::test]
#[traced_test]
async fn malformed_row_is_skipped_and_the_rest_still_run() {
    let pool = setup_db().await;
    seed_master(&pool, 1, "not-a-number", 0).await;
    seed_master(&pool, 2, "0", 0).await;
    seed_product(&pool, 21, 2).await;
    seed_order(&pool, 21, 25, "pending", 1).await;

    let summary = job(&pool).run_once(NOW_MS).await.unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.adjusted, 1);

    let (pct, ..) = master_row(&pool, 2).await;
    assert_eq!(pct, dec!(0.005));

    assert!(logs_contain("skipping malformed master product row"));
}
