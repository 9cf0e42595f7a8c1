//! The order-checkout transaction.
//!
//! Responsibilities:
//! - Load the caller's cart joined with live price/stock (snapshot).
//! - Validate requested quantities against live stock, failing fast.
//! - Atomically persist the order header and items, decrement stock, and
//!   clear the cart inside one database transaction.
//!
//! Non-responsibilities:
//! - Cart mutation endpoints (external CRUD flows own the cart contents).
//! - Payment capture and delivery assignment (downstream systems).
//! - Price recomputation (order items freeze the effective price forever).
//!
//! Safety properties:
//! - Stock can never go negative: the decrement is a single guarded
//!   `stock_level = stock_level - ? ... AND stock_level >= ?` statement, so
//!   validation and decrement are one atomic step per row as seen by any
//!   concurrent transaction.
//! - All effects are all-or-nothing: any failure after `begin` rolls back
//!   the order row, its items, every decrement, and the cart deletion.

pub mod snapshot;
pub mod types;
pub mod validator;

use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::Context;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::Db;
use crate::error::CheckoutError;
use crate::logger::warn_if_slow;
use crate::metrics::counters::Counters;
use crate::time::now_ms;
use snapshot::CartLine;
use types::{CheckoutReceipt, CheckoutRequest};

/// Lifecycle starts here; cancellation/fulfilment transitions belong to the
/// back-office flows.
const ORDER_STATUS_PENDING: &str = "pending";

/// Converts a user's cart into a committed order.
pub struct CheckoutService {
    db: Db,
    max_cart_lines: usize,
    timeout: Duration,
    counters: Counters,
}

impl CheckoutService {
    pub fn new(db: Db, cfg: &AppConfig, counters: Counters) -> Self {
        Self {
            db,
            max_cart_lines: cfg.checkout_max_cart_lines.max(1),
            timeout: Duration::from_millis(cfg.checkout_timeout_ms),
            counters,
        }
    }

    /// Executes one checkout for `user_id`.
    ///
    /// The shipping profile is validated before any transaction is opened.
    /// The transaction itself runs under a time budget; expiry rolls back
    /// and surfaces as a transient failure.
    #[instrument(skip(self, request), target = "checkout", fields(user_id = user_id))]
    pub async fn place_order(
        &self,
        user_id: i64,
        request: &CheckoutRequest,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        request.customer_info.validate()?;

        let out = match tokio::time::timeout(self.timeout, self.run_transaction(user_id, request))
            .await
        {
            Ok(res) => res,
            Err(_) => Err(CheckoutError::Timeout),
        };

        match &out {
            Ok(receipt) => {
                self.counters.checkout_committed.fetch_add(1, Ordering::Relaxed);
                info!(
                    order_id = %receipt.order_id,
                    total = %receipt.total_amount,
                    "checkout committed"
                );
            }
            Err(CheckoutError::InsufficientStock { product_id, .. }) => {
                self.counters.checkout_conflict.fetch_add(1, Ordering::Relaxed);
                info!(product_id, "checkout rejected on stock shortfall");
            }
            Err(e) if e.is_transient() => {
                self.counters.checkout_failed.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.counters.checkout_rejected.fetch_add(1, Ordering::Relaxed);
            }
        }

        out
    }

    async fn run_transaction(
        &self,
        user_id: i64,
        request: &CheckoutRequest,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        let mut tx = self
            .db
            .pool
            .begin()
            .await
            .context("failed to begin checkout transaction")?;

        let lines = warn_if_slow("cart_snapshot", Duration::from_millis(100), async {
            snapshot::load_cart_snapshot(&mut tx, user_id).await
        })
        .await?;

        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        if lines.len() > self.max_cart_lines {
            return Err(CheckoutError::CartTooLarge {
                lines: lines.len(),
                max: self.max_cart_lines,
            });
        }

        validator::check_stock(&lines)?;

        let total_amount = lines
            .iter()
            .fold(Decimal::ZERO, |acc, line| acc + line.line_total());

        if let Some(client_total) = request.total_amount {
            if client_total != total_amount {
                warn!(
                    client_total = %client_total,
                    server_total = %total_amount,
                    "client-computed total disagrees with cart snapshot; using server total"
                );
            }
        }

        let order_id = Uuid::new_v4();
        let placed_at = now_ms();
        let info = &request.customer_info;

        sqlx::query(
            r#"
INSERT INTO orders (
  id, user_id,
  customer_name, customer_phone, customer_address1, customer_address2, customer_city,
  total_amount, status, order_date
) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?);
"#,
        )
        .bind(order_id.to_string())
        .bind(user_id)
        .bind(&info.name)
        .bind(&info.phone)
        .bind(&info.address1)
        .bind(info.address2.as_deref())
        .bind(&info.city)
        .bind(total_amount.to_string())
        .bind(ORDER_STATUS_PENDING)
        .bind(placed_at)
        .execute(&mut *tx)
        .await
        .context("failed to insert order row")?;

        // Snapshot order == ascending product id; every checkout touches
        // product rows in this sequence.
        for line in &lines {
            self.write_line(&mut tx, order_id, line).await?;
        }

        sqlx::query("DELETE FROM cart_items WHERE user_id = ?;")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .context("failed to clear cart")?;

        tx.commit()
            .await
            .context("failed to commit checkout transaction")?;

        Ok(CheckoutReceipt {
            order_id,
            total_amount,
        })
    }

    /// Inserts one order item with its frozen price, then decrements stock.
    ///
    /// The decrement re-checks availability in the same statement; a
    /// zero-row update means a concurrent checkout consumed the stock after
    /// our snapshot, and the whole transaction fails with the live figure.
    async fn write_line(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Any>,
        order_id: Uuid,
        line: &CartLine,
    ) -> Result<(), CheckoutError> {
        sqlx::query(
            r#"
INSERT INTO order_items (order_id, product_id, quantity, price_at_time_of_order, supplier_id)
VALUES (?, ?, ?, ?, ?);
"#,
        )
        .bind(order_id.to_string())
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price.to_string())
        .bind(line.supplier_id)
        .execute(&mut **tx)
        .await
        .with_context(|| format!("failed to insert order item {}", line.product_id))?;

        let updated = sqlx::query(
            r#"
UPDATE products
SET stock_level = stock_level - ?
WHERE id = ? AND stock_level >= ?;
"#,
        )
        .bind(line.quantity)
        .bind(line.product_id)
        .bind(line.quantity)
        .execute(&mut **tx)
        .await
        .with_context(|| format!("failed to decrement stock for product {}", line.product_id))?;

        if updated.rows_affected() == 0 {
            let available: i64 =
                sqlx::query_scalar("SELECT stock_level FROM products WHERE id = ?;")
                    .bind(line.product_id)
                    .fetch_one(&mut **tx)
                    .await
                    .with_context(|| {
                        format!("failed to re-read stock for product {}", line.product_id)
                    })?;

            return Err(CheckoutError::InsufficientStock {
                product_id: line.product_id,
                name: line.name.clone(),
                requested: line.quantity,
                available,
            });
        }

        Ok(())
    }
}
