use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Database connection string.
    pub database_url: String,

    /// Listen address for the HTTP surface.
    pub bind_addr: String,

    // =========================
    // Checkout configuration
    // =========================
    /// Maximum number of cart lines accepted into a single checkout.
    ///
    /// Bounds the transaction size (rows locked, items inserted). Carts
    /// above this are rejected before the transaction begins.
    pub checkout_max_cart_lines: usize,

    /// Time budget (in milliseconds) for the whole checkout transaction.
    ///
    /// A transaction that cannot commit within this budget is rolled back
    /// and surfaced as a transient failure, so row locks are never held
    /// indefinitely by a stalled caller.
    pub checkout_timeout_ms: u64,

    // =========================
    // Pricing job configuration
    // =========================
    /// Lookback window (in days) for the demand score.
    pub pricing_window_days: i64,

    /// Demand score above which one upward step is applied.
    pub pricing_high_demand_threshold: i64,

    /// Demand score below which one downward step is applied.
    ///
    /// Scores between the low and high thresholds form a dead band:
    /// no step is applied, which keeps the percentage from oscillating
    /// on every run.
    pub pricing_low_demand_threshold: i64,

    /// Size of a single adjustment step (signed fraction, e.g. 0.005 = 0.5%).
    pub pricing_adjustment_step: Decimal,

    /// Upper bound on the total adjustment percentage.
    pub pricing_max_increase: Decimal,

    /// Lower bound on the total adjustment percentage.
    pub pricing_max_decrease: Decimal,

    /// Cadence (in seconds) of the scheduled pricing job.
    pub pricing_interval_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://medexpo_dev.db".to_string());

        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".to_string());

        Self {
            database_url,
            bind_addr,

            // Checkout defaults: conservative transaction bounds.
            checkout_max_cart_lines: 100,
            checkout_timeout_ms: 10_000,

            // Pricing defaults match the reference adjustment behavior:
            // 7-day window, dead band between 5 and 20 units sold,
            // 0.5% per step, total adjustment capped to [-5%, +10%].
            pricing_window_days: env_i64("PRICING_WINDOW_DAYS", 7),
            pricing_high_demand_threshold: env_i64("PRICING_HIGH_DEMAND_THRESHOLD", 20),
            pricing_low_demand_threshold: env_i64("PRICING_LOW_DEMAND_THRESHOLD", 5),
            pricing_adjustment_step: env_decimal("PRICING_ADJUSTMENT_STEP", dec!(0.005)),
            pricing_max_increase: env_decimal("PRICING_MAX_INCREASE", dec!(0.10)),
            pricing_max_decrease: env_decimal("PRICING_MAX_DECREASE", dec!(-0.05)),
            pricing_interval_secs: 86_400,
        }
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_decimal(key: &str, default: Decimal) -> Decimal {
    std::env::var(key)
        .ok()
        .and_then(|v| Decimal::from_str(&v).ok())
        .unwrap_or(default)
}
