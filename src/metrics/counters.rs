use std::sync::Arc;
use std::sync::atomic::AtomicU64;

/// Minimal counters for operational visibility.
#[derive(Clone, Default)]
pub struct Counters {
    pub checkout_committed: Arc<AtomicU64>,
    pub checkout_conflict: Arc<AtomicU64>,
    pub checkout_rejected: Arc<AtomicU64>,
    pub checkout_failed: Arc<AtomicU64>,

    pub pricing_ticks: Arc<AtomicU64>,
    pub pricing_ticks_skipped: Arc<AtomicU64>,
    pub pricing_adjustments: Arc<AtomicU64>,
    pub pricing_item_failures: Arc<AtomicU64>,
}
