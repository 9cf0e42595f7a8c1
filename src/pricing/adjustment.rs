use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::config::AppConfig;

const MS_PER_DAY: i64 = 86_400_000;

/// The five externally-configurable numbers that define the pricing engine,
/// plus the demand lookback window. Nothing else influences an adjustment.
#[derive(Debug, Clone)]
pub struct PricingPolicy {
    pub window_days: i64,
    pub high_demand_threshold: i64,
    pub low_demand_threshold: i64,
    pub step: Decimal,
    pub max_increase: Decimal,
    pub max_decrease: Decimal,
}

impl PricingPolicy {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            window_days: cfg.pricing_window_days,
            high_demand_threshold: cfg.pricing_high_demand_threshold,
            low_demand_threshold: cfg.pricing_low_demand_threshold,
            step: cfg.pricing_adjustment_step,
            max_increase: cfg.pricing_max_increase,
            max_decrease: cfg.pricing_max_decrease,
        }
    }

    /// Oldest order_date (epoch ms) still inside the demand window.
    pub fn window_cutoff_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.window_days * MS_PER_DAY
    }
}

impl Default for PricingPolicy {
    /// Reference behavior: 7-day window, dead band between 5 and 20 units,
    /// 0.5% steps, total adjustment capped to [-5%, +10%].
    fn default() -> Self {
        Self {
            window_days: 7,
            high_demand_threshold: 20,
            low_demand_threshold: 5,
            step: dec!(0.005),
            max_increase: dec!(0.10),
            max_decrease: dec!(-0.05),
        }
    }
}

/// Applies exactly one adjustment step to the persisted percentage.
///
/// Demand above the high threshold moves the percentage up one step, demand
/// below the low threshold moves it down one step, anything in the dead band
/// leaves it alone. The result is clamped into
/// `[max_decrease, max_increase]` and rounded to 4 decimal places.
pub fn step_adjustment(current: Decimal, demand_score: i64, policy: &PricingPolicy) -> Decimal {
    let mut next = current;

    if demand_score > policy.high_demand_threshold {
        next += policy.step;
    } else if demand_score < policy.low_demand_threshold {
        next -= policy.step;
    }

    next.clamp(policy.max_decrease, policy.max_increase).round_dp(4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn high_demand_steps_up() {
        let p = PricingPolicy::default();
        assert_eq!(step_adjustment(dec!(0), 25, &p), dec!(0.005));
    }

    #[test]
    fn low_demand_steps_down() {
        let p = PricingPolicy::default();
        assert_eq!(step_adjustment(dec!(0.005), 3, &p), dec!(0.000));
    }

    #[test]
    fn dead_band_leaves_percentage_alone() {
        let p = PricingPolicy::default();
        for demand in [5, 10, 20] {
            assert_eq!(step_adjustment(dec!(0.02), demand, &p), dec!(0.02));
        }
    }

    #[test]
    fn threshold_boundaries_are_exclusive() {
        let p = PricingPolicy::default();
        // Exactly at the high threshold is still the dead band.
        assert_eq!(step_adjustment(dec!(0), 20, &p), dec!(0));
        assert_eq!(step_adjustment(dec!(0), 21, &p), dec!(0.005));
        // Exactly at the low threshold is still the dead band.
        assert_eq!(step_adjustment(dec!(0), 5, &p), dec!(0));
        assert_eq!(step_adjustment(dec!(0), 4, &p), dec!(-0.005));
    }

    #[test]
    fn clamped_at_max_increase() {
        let p = PricingPolicy::default();
        assert_eq!(step_adjustment(dec!(0.10), 100, &p), dec!(0.10));
        assert_eq!(step_adjustment(dec!(0.098), 100, &p), dec!(0.10));
    }

    #[test]
    fn clamped_at_max_decrease() {
        let p = PricingPolicy::default();
        assert_eq!(step_adjustment(dec!(-0.05), 0, &p), dec!(-0.05));
        assert_eq!(step_adjustment(dec!(-0.048), 0, &p), dec!(-0.05));
    }

    #[test]
    fn result_is_rounded_to_four_places() {
        let p = PricingPolicy {
            step: dec!(0.00033),
            ..PricingPolicy::default()
        };
        assert_eq!(step_adjustment(dec!(0), 25, &p), dec!(0.0003));
    }

    #[test]
    fn reference_scenario_up_then_down() {
        // Start at 0%, demand 25 -> +0.5%; later demand 3 -> back to 0%.
        let p = PricingPolicy::default();
        let after_high = step_adjustment(dec!(0), 25, &p);
        assert_eq!(after_high, dec!(0.005));
        assert_eq!(step_adjustment(after_high, 3, &p), dec!(0.000));
    }

    proptest! {
        /// Any sequence of demand observations keeps the percentage inside
        /// the configured bounds at every intermediate point.
        #[test]
        fn adjustment_stays_bounded(
            start_bps in -500i64..=1000,
            demands in proptest::collection::vec(0i64..200, 1..64),
        ) {
            let p = PricingPolicy::default();
            let mut pct = Decimal::new(start_bps, 4);

            for demand in demands {
                pct = step_adjustment(pct, demand, &p);
                prop_assert!(pct >= p.max_decrease);
                prop_assert!(pct <= p.max_increase);
            }
        }
    }
}
