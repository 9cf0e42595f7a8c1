use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::metrics::counters::Counters;
use crate::pricing::adjustment::{PricingPolicy, step_adjustment};
use crate::pricing::repository::{MasterPricingRow, PricingRepository};
use crate::time::now_ms;

/// Outcome of one scheduled pricing pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PricingRunSummary {
    pub processed: usize,
    pub adjusted: usize,
    pub failed: usize,
    pub skipped: bool,
}

impl PricingRunSummary {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Demand-based price adjustment, one step per master product per tick.
///
/// The job is driven either by `spawn_loop` (fixed cadence) or by calling
/// `run_once` directly with an explicit clock, which is how the tests tick
/// it without waiting on wall time. A single-flight guard keeps overlapping
/// ticks from double-stepping a percentage.
pub struct PricingJob {
    repo: Arc<dyn PricingRepository>,
    policy: PricingPolicy,
    counters: Counters,
    in_flight: Mutex<()>,
}

impl PricingJob {
    pub fn new(repo: Arc<dyn PricingRepository>, policy: PricingPolicy, counters: Counters) -> Self {
        Self {
            repo,
            policy,
            counters,
            in_flight: Mutex::new(()),
        }
    }

    /// Executes one complete pass over all master products.
    ///
    /// A failure on one master product is logged and counted; the remaining
    /// rows are still processed. Only a failure to list the master products
    /// at all fails the run.
    #[instrument(skip(self), target = "pricing")]
    pub async fn run_once(&self, now_ms: i64) -> anyhow::Result<PricingRunSummary> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            self.counters
                .pricing_ticks_skipped
                .fetch_add(1, Ordering::Relaxed);
            warn!("previous pricing run still in flight; skipping this tick");
            return Ok(PricingRunSummary::skipped());
        };

        self.counters.pricing_ticks.fetch_add(1, Ordering::Relaxed);

        let masters = self.repo.fetch_master_products().await?;
        if masters.is_empty() {
            debug!("no master products to process");
            return Ok(PricingRunSummary::default());
        }

        let cutoff_ms = self.policy.window_cutoff_ms(now_ms);
        let mut summary = PricingRunSummary::default();

        for master in &masters {
            summary.processed += 1;

            match self.adjust_one(master, cutoff_ms, now_ms).await {
                Ok(true) => {
                    summary.adjusted += 1;
                    self.counters
                        .pricing_adjustments
                        .fetch_add(1, Ordering::Relaxed);
                }
                Ok(false) => {}
                Err(e) => {
                    summary.failed += 1;
                    self.counters
                        .pricing_item_failures
                        .fetch_add(1, Ordering::Relaxed);
                    error!(
                        master_product_id = master.master_product_id,
                        error = ?e,
                        "price adjustment failed; continuing with remaining master products"
                    );
                }
            }
        }

        info!(
            processed = summary.processed,
            adjusted = summary.adjusted,
            failed = summary.failed,
            "pricing run complete"
        );

        Ok(summary)
    }

    /// Recomputes demand for one master product and applies at most one
    /// step. Returns whether the percentage changed.
    ///
    /// A step is only considered when the fresh score differs from the
    /// persisted one: re-running against unchanged order history is a no-op,
    /// so a duplicate tick can never walk the percentage further.
    async fn adjust_one(
        &self,
        master: &MasterPricingRow,
        cutoff_ms: i64,
        now_ms: i64,
    ) -> anyhow::Result<bool> {
        let fresh_score = self
            .repo
            .demand_score(master.master_product_id, cutoff_ms)
            .await?;

        if fresh_score == master.current_demand_score {
            debug!(
                master_product_id = master.master_product_id,
                demand = fresh_score,
                "demand unchanged since last run"
            );
            return Ok(false);
        }

        let next_pct = step_adjustment(master.current_adjustment_pct, fresh_score, &self.policy);
        let new_pct = (next_pct != master.current_adjustment_pct).then_some(next_pct);

        self.repo
            .persist_adjustment(master.master_product_id, fresh_score, new_pct, now_ms)
            .await?;

        if let Some(pct) = new_pct {
            info!(
                master_product_id = master.master_product_id,
                demand = fresh_score,
                from = %master.current_adjustment_pct,
                to = %pct,
                "adjustment percentage stepped"
            );
        }

        Ok(new_pct.is_some())
    }

    /// Starts the fixed-cadence loop. Each tick runs one pass against the
    /// wall clock; failures are logged and the next tick retries.
    pub fn spawn_loop(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);

            loop {
                ticker.tick().await;

                if let Err(e) = self.run_once(now_ms()).await {
                    error!(error = ?e, "pricing run failed");
                }
            }
        })
    }
}
