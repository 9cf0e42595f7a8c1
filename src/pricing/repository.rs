use std::str::FromStr;

use anyhow::Context;
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{AnyPool, Row};

/// Pricing view of one master product: the persisted adjustment state the
/// engine steps from.
#[derive(Debug, Clone)]
pub struct MasterPricingRow {
    pub master_product_id: i64,
    pub current_adjustment_pct: Decimal,
    pub current_demand_score: i64,
}

#[async_trait]
pub trait PricingRepository: Send + Sync {
    async fn fetch_master_products(&self) -> anyhow::Result<Vec<MasterPricingRow>>;

    /// Demand score for one master product: units sold across its variants
    /// within the window, excluding cancelled/refunded/failed orders.
    async fn demand_score(
        &self,
        master_product_id: i64,
        window_cutoff_ms: i64,
    ) -> anyhow::Result<i64>;

    /// Persists the fresh demand score, plus the stepped percentage and
    /// adjustment timestamp when `new_pct` is set.
    async fn persist_adjustment(
        &self,
        master_product_id: i64,
        demand_score: i64,
        new_pct: Option<Decimal>,
        now_ms: i64,
    ) -> anyhow::Result<()>;
}

/// SQLx-backed implementation of PricingRepository.
/// Responsible only for persistence and row mapping.
pub struct SqlxPricingRepository {
    pool: AnyPool,
}

impl SqlxPricingRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PricingRepository for SqlxPricingRepository {
    async fn fetch_master_products(&self) -> anyhow::Result<Vec<MasterPricingRow>> {
        let rows = sqlx::query(
            r#"
SELECT id, current_price_adjustment_percentage, current_demand_score
FROM master_products
ORDER BY id;
"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::new();
        for r in rows {
            match row_to_master(&r) {
                Ok(m) => out.push(m),
                Err(e) => {
                    // poison-row resilience: skip but don't fail the batch
                    tracing::warn!(error = %e, "skipping malformed master product row");
                }
            }
        }

        Ok(out)
    }

    async fn demand_score(
        &self,
        master_product_id: i64,
        window_cutoff_ms: i64,
    ) -> anyhow::Result<i64> {
        let row = sqlx::query(
            r#"
SELECT CAST(SUM(oi.quantity) AS BIGINT) AS total_sold
FROM order_items oi
JOIN products p ON oi.product_id = p.id
JOIN orders o ON oi.order_id = o.id
WHERE p.master_product_id = ?
  AND o.order_date >= ?
  AND o.status NOT IN ('cancelled', 'refunded', 'failed');
"#,
        )
        .bind(master_product_id)
        .bind(window_cutoff_ms)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("demand query failed for master product {master_product_id}"))?;

        // SUM over zero rows is NULL.
        Ok(row.get::<Option<i64>, _>("total_sold").unwrap_or(0))
    }

    async fn persist_adjustment(
        &self,
        master_product_id: i64,
        demand_score: i64,
        new_pct: Option<Decimal>,
        now_ms: i64,
    ) -> anyhow::Result<()> {
        match new_pct {
            Some(pct) => {
                sqlx::query(
                    r#"
UPDATE master_products
SET current_demand_score = ?,
    current_price_adjustment_percentage = ?,
    last_adjustment_update = ?
WHERE id = ?;
"#,
                )
                .bind(demand_score)
                .bind(pct.to_string())
                .bind(now_ms)
                .bind(master_product_id)
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query(
                    r#"
UPDATE master_products
SET current_demand_score = ?
WHERE id = ?;
"#,
                )
                .bind(demand_score)
                .bind(master_product_id)
                .execute(&self.pool)
                .await?;
            }
        }

        Ok(())
    }
}

fn row_to_master(r: &sqlx::any::AnyRow) -> anyhow::Result<MasterPricingRow> {
    let master_product_id: i64 = r.get("id");

    let pct_str: String = r.get("current_price_adjustment_percentage");
    let current_adjustment_pct = Decimal::from_str(&pct_str).with_context(|| {
        format!("invalid adjustment percentage '{pct_str}' on master product {master_product_id}")
    })?;

    Ok(MasterPricingRow {
        master_product_id,
        current_adjustment_pct,
        current_demand_score: r.get::<i64, _>("current_demand_score"),
    })
}
