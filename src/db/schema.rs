use sqlx::AnyPool;

/// Creates the marketplace schema if it does not exist.
///
/// Monetary columns (price, discount_price, total_amount,
/// price_at_time_of_order, adjustment percentage) are stored as exact
/// decimal TEXT and parsed with `rust_decimal` on read; timestamps are
/// epoch-millisecond BIGINTs. Both representations read back identically
/// on SQLite and Postgres through the Any driver.
pub async fn migrate(pool: &AnyPool) -> anyhow::Result<()> {
    // Products
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS products (
  id BIGINT PRIMARY KEY,
  supplier_id BIGINT NOT NULL,
  name TEXT NOT NULL,
  price TEXT NOT NULL,
  discount_price TEXT,
  is_on_sale INTEGER NOT NULL DEFAULT 0 CHECK (is_on_sale IN (0,1)),
  stock_level BIGINT NOT NULL CHECK (stock_level >= 0),
  master_product_id BIGINT,
  is_active INTEGER NOT NULL DEFAULT 1 CHECK (is_active IN (0,1))
);
"#,
    )
    .execute(pool)
    .await?;

    // Master products (pricing families)
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS master_products (
  id BIGINT PRIMARY KEY,
  current_price_adjustment_percentage TEXT NOT NULL DEFAULT '0',
  current_demand_score BIGINT NOT NULL DEFAULT 0 CHECK (current_demand_score >= 0),
  last_adjustment_update BIGINT,
  initial_seed_price TEXT
);
"#,
    )
    .execute(pool)
    .await?;

    // Cart lines
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS cart_items (
  user_id BIGINT NOT NULL,
  product_id BIGINT NOT NULL,
  quantity BIGINT NOT NULL CHECK (quantity > 0),
  PRIMARY KEY (user_id, product_id)
);
"#,
    )
    .execute(pool)
    .await?;

    // Orders (shipping fields denormalized at checkout time)
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS orders (
  id TEXT PRIMARY KEY,
  user_id BIGINT NOT NULL,
  customer_name TEXT NOT NULL,
  customer_phone TEXT NOT NULL,
  customer_address1 TEXT NOT NULL,
  customer_address2 TEXT,
  customer_city TEXT NOT NULL,
  total_amount TEXT NOT NULL,
  status TEXT NOT NULL,
  order_date BIGINT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    // Order items (frozen prices; read-only after creation)
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS order_items (
  order_id TEXT NOT NULL,
  product_id BIGINT NOT NULL,
  quantity BIGINT NOT NULL CHECK (quantity > 0),
  price_at_time_of_order TEXT NOT NULL,
  supplier_id BIGINT NOT NULL,
  PRIMARY KEY (order_id, product_id)
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_products_master ON products(master_product_id);"#)
        .execute(pool)
        .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_orders_user ON orders(user_id);"#)
        .execute(pool)
        .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_order_items_order ON order_items(order_id);"#)
        .execute(pool)
        .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_orders_date ON orders(order_date);"#)
        .execute(pool)
        .await?;

    Ok(())
}
