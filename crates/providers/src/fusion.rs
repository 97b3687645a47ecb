//! Multi-source fusion: concurrent fan-out with per-source timeouts and
//! reliability-weighted consensus.
//!
//! Every configured source is queried at once. Each call is bounded by its
//! own timeout and the whole fan-out by an aggregate deadline; whatever has
//! answered by then is reconciled into one [`FusedSnapshot`]. A failing or
//! hanging source only lowers confidence. There are no retries.

use breathwise_config::FusionConfig;
use breathwise_core::error::SourceError;
use breathwise_core::location::Location;
use breathwise_core::metric::MetricKind;
use breathwise_core::reading::EnvironmentalReading;
use breathwise_core::snapshot::{ConsensusValue, FusedSnapshot, MetricValue};
use breathwise_core::source::DataSource;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tuning for consensus and deadlines.
#[derive(Debug, Clone)]
pub struct FusionSettings {
    pub aggregate_timeout: Duration,
    pub divergence_threshold: f64,
    pub single_source_factor: f64,
    pub divergence_factor: f64,
    pub tracked: Vec<MetricKind>,
}

impl From<&FusionConfig> for FusionSettings {
    fn from(config: &FusionConfig) -> Self {
        Self {
            aggregate_timeout: config.aggregate_timeout(),
            divergence_threshold: config.divergence_threshold,
            single_source_factor: config.single_source_factor,
            divergence_factor: config.divergence_factor,
            tracked: config.tracked_metrics.clone(),
        }
    }
}

impl Default for FusionSettings {
    fn default() -> Self {
        Self::from(&FusionConfig::default())
    }
}

/// One usable reading in canonical units.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub value: f64,
    pub weight: f64,
    pub source_id: String,
    pub observed_at: DateTime<Utc>,
}

struct SourceEntry {
    source: Arc<dyn DataSource>,
    timeout: Duration,
}

/// Queries all sources and reconciles their readings.
pub struct FusionEngine {
    entries: Vec<SourceEntry>,
    settings: FusionSettings,
}

impl FusionEngine {
    pub fn new(settings: FusionSettings) -> Self {
        Self {
            entries: Vec::new(),
            settings,
        }
    }

    /// Add a source with its own timeout.
    pub fn add(mut self, source: Arc<dyn DataSource>, timeout: Duration) -> Self {
        self.entries.push(SourceEntry { source, timeout });
        self
    }

    /// Add a source with the default timeout (2.5s).
    pub fn add_default(self, source: Arc<dyn DataSource>) -> Self {
        self.add(source, Duration::from_millis(2_500))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn settings(&self) -> &FusionSettings {
        &self.settings
    }

    pub fn sources(&self) -> impl Iterator<Item = &Arc<dyn DataSource>> {
        self.entries.iter().map(|e| &e.source)
    }

    /// Fuse current readings for a location.
    pub async fn fuse(&self, location: &Location) -> FusedSnapshot {
        self.fuse_at(location, Utc::now()).await
    }

    /// Fuse with an explicit generation timestamp.
    pub async fn fuse_at(&self, location: &Location, now: DateTime<Utc>) -> FusedSnapshot {
        let queried = self.entries.len();
        let (readings, responded) = self.gather(location).await;
        let grouped = self.group(&readings);

        let metrics: BTreeMap<MetricKind, MetricValue> = self
            .settings
            .tracked
            .iter()
            .map(|kind| {
                let samples = grouped.get(kind).map(Vec::as_slice).unwrap_or(&[]);
                (*kind, consensus(*kind, samples, &self.settings))
            })
            .collect();

        let confidences: Vec<f64> = metrics
            .values()
            .filter_map(MetricValue::as_available)
            .map(|c| c.confidence)
            .collect();
        let confidence = if confidences.is_empty() || queried == 0 {
            0.0
        } else {
            let mean = confidences.iter().sum::<f64>() / confidences.len() as f64;
            let coverage = responded as f64 / queried as f64;
            (mean * (0.5 + 0.5 * coverage)).clamp(0.0, 1.0)
        };

        info!(
            %location,
            queried,
            responded,
            available = confidences.len(),
            confidence,
            "Fusion complete"
        );

        FusedSnapshot {
            location: *location,
            generated_at: now,
            metrics,
            confidence,
            sources_queried: queried,
            sources_responded: responded,
            partial: responded < queried,
        }
    }

    /// Fan out to every source; return readings and the responder count.
    async fn gather(&self, location: &Location) -> (Vec<EnvironmentalReading>, usize) {
        let deadline = tokio::time::Instant::now() + self.settings.aggregate_timeout;

        let mut pending: FuturesUnordered<_> = self
            .entries
            .iter()
            .map(|entry| async move {
                let id = entry.source.id().to_string();
                let result = match tokio::time::timeout(entry.timeout, entry.source.fetch(location)).await {
                    Ok(result) => result,
                    Err(_) => Err(SourceError::Timeout(format!(
                        "Source '{}' timed out after {}ms",
                        id,
                        entry.timeout.as_millis()
                    ))),
                };
                (id, result)
            })
            .collect();

        let mut readings = Vec::new();
        let mut responded = 0;
        loop {
            match tokio::time::timeout_at(deadline, pending.next()).await {
                Ok(Some((id, Ok(batch)))) => {
                    debug!(source = %id, readings = batch.len(), "Source responded");
                    responded += 1;
                    readings.extend(batch);
                }
                Ok(Some((id, Err(e)))) => {
                    warn!(source = %id, error = %e, "Source failed, continuing without it");
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        abandoned = pending.len(),
                        timeout_ms = self.settings.aggregate_timeout.as_millis() as u64,
                        "Aggregate deadline reached, abandoning late sources"
                    );
                    break;
                }
            }
        }
        (readings, responded)
    }

    /// Convert to canonical units and group by metric, one sample per source
    /// (the newest one).
    fn group(&self, readings: &[EnvironmentalReading]) -> BTreeMap<MetricKind, Vec<Sample>> {
        let mut grouped: BTreeMap<MetricKind, Vec<Sample>> = BTreeMap::new();

        for reading in readings {
            if !self.settings.tracked.contains(&reading.kind) {
                continue;
            }
            if !reading.is_usable() {
                warn!(source = %reading.source_id, metric = %reading.kind, "Discarding non-finite reading");
                continue;
            }
            let value = match reading.canonical_value() {
                Ok(v) if v.is_finite() => v,
                Ok(_) => {
                    warn!(source = %reading.source_id, metric = %reading.kind, "Discarding non-finite reading");
                    continue;
                }
                Err(e) => {
                    warn!(source = %reading.source_id, error = %e, "Discarding reading");
                    continue;
                }
            };

            let sample = Sample {
                value,
                weight: reading.reliability.min(1.0),
                source_id: reading.source_id.clone(),
                observed_at: reading.observed_at,
            };
            let samples = grouped.entry(reading.kind).or_default();
            match samples.iter_mut().find(|s| s.source_id == sample.source_id) {
                Some(existing) if existing.observed_at < sample.observed_at => *existing = sample,
                Some(_) => {}
                None => samples.push(sample),
            }
        }
        grouped
    }
}

/// Reliability-weighted consensus for one metric.
///
/// - no samples: `Unavailable`
/// - one sample: passed through, confidence scaled by the single-source factor
/// - agreeing samples: weighted mean, confidence is the mean reliability
/// - divergent samples: weighted median, confidence scaled by the divergence
///   factor
pub fn consensus(kind: MetricKind, samples: &[Sample], settings: &FusionSettings) -> MetricValue {
    let Some(observed_at) = samples.iter().map(|s| s.observed_at).max() else {
        return MetricValue::Unavailable;
    };
    let mut sources: Vec<String> = samples.iter().map(|s| s.source_id.clone()).collect();
    sources.sort();

    let mean_reliability = samples.iter().map(|s| s.weight).sum::<f64>() / samples.len() as f64;

    let (value, confidence, divergent) = if samples.len() == 1 {
        (
            samples[0].value,
            samples[0].weight * settings.single_source_factor,
            false,
        )
    } else {
        let median = weighted_median(samples);
        let scale = median.abs().max(kind.divergence_floor());
        let spread = samples
            .iter()
            .map(|s| (s.value - median).abs())
            .fold(0.0, f64::max)
            / scale;

        if spread <= settings.divergence_threshold {
            let total: f64 = samples.iter().map(|s| s.weight).sum();
            let mean = samples.iter().map(|s| s.value * s.weight).sum::<f64>() / total;
            (mean, mean_reliability, false)
        } else {
            debug!(metric = %kind, spread, median, "Sources diverge, using weighted median");
            (median, mean_reliability * settings.divergence_factor, true)
        }
    };

    MetricValue::Available(ConsensusValue {
        value,
        unit: kind.canonical_unit(),
        confidence: confidence.clamp(0.0, 1.0),
        sources,
        divergent,
        observed_at,
    })
}

/// The value at which cumulative weight first reaches half the total.
fn weighted_median(samples: &[Sample]) -> f64 {
    let mut sorted: Vec<&Sample> = samples.iter().collect();
    sorted.sort_by(|a, b| a.value.total_cmp(&b.value));

    let half = sorted.iter().map(|s| s.weight).sum::<f64>() / 2.0;
    let mut cumulative = 0.0;
    for sample in &sorted {
        cumulative += sample.weight;
        if cumulative >= half {
            return sample.value;
        }
    }
    sorted.last().map(|s| s.value).unwrap_or(f64::NAN)
}
