//! Per-location historical baselines for trend fallback.
//!
//! Each grid cell keeps an exponential moving average of every metric seen
//! in its snapshots. A snapshot is folded in at most once, and while a
//! snapshot is being served the reference excludes it, so a cached snapshot
//! is never compared against itself. Cells not folded into for longer than
//! the idle TTL are dropped by [`BaselineTracker::sweep`].

use breathwise_core::location::QuantizedLocation;
use breathwise_core::metric::MetricKind;
use breathwise_core::snapshot::FusedSnapshot;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

pub type Baseline = BTreeMap<MetricKind, f64>;

#[derive(Debug, Clone)]
struct Slot {
    ema: Baseline,
    /// The EMA before the most recent fold.
    prior: Option<Baseline>,
    folded_at: DateTime<Utc>,
    touched: Instant,
}

pub struct BaselineTracker {
    slots: DashMap<QuantizedLocation, Slot>,
    alpha: f64,
    precision_deg: f64,
    idle_ttl: Duration,
}

impl BaselineTracker {
    pub fn new(alpha: f64, precision_deg: f64, idle_ttl: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            alpha,
            precision_deg,
            idle_ttl,
        }
    }

    fn cell(&self, snapshot: &FusedSnapshot) -> QuantizedLocation {
        snapshot.location.quantize(self.precision_deg)
    }

    /// The baseline to compare `snapshot` against, excluding `snapshot`
    /// itself.
    pub fn reference_for(&self, snapshot: &FusedSnapshot) -> Option<Baseline> {
        let slot = self.slots.get(&self.cell(snapshot))?;
        if slot.folded_at == snapshot.generated_at {
            slot.prior.clone()
        } else {
            Some(slot.ema.clone())
        }
    }

    /// Fold a snapshot's available values into its cell's average.
    pub fn update(&self, snapshot: &FusedSnapshot) {
        let values: Vec<(MetricKind, f64)> = snapshot
            .available_kinds()
            .into_iter()
            .filter_map(|k| snapshot.value(k).map(|v| (k, v)))
            .collect();
        if values.is_empty() {
            return;
        }

        let mut slot = self.slots.entry(self.cell(snapshot)).or_insert_with(|| Slot {
            ema: Baseline::new(),
            prior: None,
            folded_at: DateTime::<Utc>::MIN_UTC,
            touched: Instant::now(),
        });
        slot.touched = Instant::now();
        if slot.folded_at == snapshot.generated_at {
            return;
        }

        let prior = slot.ema.clone();
        for (kind, value) in values {
            slot.ema
                .entry(kind)
                .and_modify(|avg| *avg += self.alpha * (value - *avg))
                .or_insert(value);
        }
        slot.prior = (!prior.is_empty()).then_some(prior);
        slot.folded_at = snapshot.generated_at;
    }

    /// Drop cells nothing has been folded into for longer than the idle TTL.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.slots.len();
        self.slots
            .retain(|_, slot| now.duration_since(slot.touched) < self.idle_ttl);
        let removed = before.saturating_sub(self.slots.len());
        if removed > 0 {
            debug!(removed, remaining = self.slots.len(), "Swept idle baselines");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.sweep();
            }
        })
    }
}
