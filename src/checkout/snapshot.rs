use std::str::FromStr;

use anyhow::Context;
use rust_decimal::Decimal;
use sqlx::{Row, any::AnyRow};

/// One cart line joined with the live product row it points at.
///
/// `unit_price` is the effective selling price (discount price when the
/// product is on sale, list price otherwise) observed inside the checkout
/// transaction; it is the value frozen onto the order item.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub product_id: i64,
    pub name: String,
    pub supplier_id: i64,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub stock_level: i64,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Loads the caller's cart joined with live price/stock, inside the open
/// checkout transaction. Rows come back ordered by product id; every write
/// the transaction performs later walks the same order, so two checkouts
/// over overlapping carts always contend for rows in the same sequence.
pub async fn load_cart_snapshot(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    user_id: i64,
) -> anyhow::Result<Vec<CartLine>> {
    let rows = sqlx::query(
        r#"
SELECT
  c.product_id, c.quantity, p.name, p.supplier_id, p.stock_level,
  CASE WHEN p.is_on_sale = 1 AND p.discount_price IS NOT NULL
       THEN p.discount_price ELSE p.price
  END AS effective_price
FROM cart_items c
JOIN products p ON c.product_id = p.id
WHERE c.user_id = ?
ORDER BY c.product_id;
"#,
    )
    .bind(user_id)
    .fetch_all(&mut **tx)
    .await
    .context("failed to load cart snapshot")?;

    let mut out = Vec::with_capacity(rows.len());
    for r in &rows {
        out.push(row_to_line(r)?);
    }

    Ok(out)
}

fn row_to_line(r: &AnyRow) -> anyhow::Result<CartLine> {
    let product_id: i64 = r.get("product_id");

    let price_str: String = r.get("effective_price");
    let unit_price = Decimal::from_str(&price_str)
        .with_context(|| format!("invalid price '{price_str}' on product {product_id}"))?;

    Ok(CartLine {
        product_id,
        name: r.get::<String, _>("name"),
        supplier_id: r.get::<i64, _>("supplier_id"),
        quantity: r.get::<i64, _>("quantity"),
        unit_price,
        stock_level: r.get::<i64, _>("stock_level"),
    })
}
