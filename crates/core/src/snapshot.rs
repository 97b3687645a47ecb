//! The fused, per-location consensus view of the environment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::location::Location;
use crate::metric::{MetricKind, Unit};

/// Consensus for one metric. Values are always in the canonical unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusValue {
    pub value: f64,
    pub unit: Unit,
    /// Per-metric confidence in [0, 1].
    pub confidence: f64,
    /// Source ids that contributed a usable reading.
    pub sources: Vec<String>,
    /// Sources disagreed beyond the configured divergence threshold.
    pub divergent: bool,
    /// Newest observation among contributing readings.
    pub observed_at: DateTime<Utc>,
}

/// A metric slot in a snapshot. Zero responding sources yields
/// `Unavailable`, never a guessed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MetricValue {
    Available(ConsensusValue),
    Unavailable,
}

impl MetricValue {
    pub fn as_available(&self) -> Option<&ConsensusValue> {
        match self {
            MetricValue::Available(v) => Some(v),
            MetricValue::Unavailable => None,
        }
    }
}

/// Reconciled readings for one location at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedSnapshot {
    pub location: Location,
    pub generated_at: DateTime<Utc>,
    /// Exactly one entry per tracked metric kind.
    pub metrics: BTreeMap<MetricKind, MetricValue>,
    /// Overall confidence in [0, 1].
    pub confidence: f64,
    pub sources_queried: usize,
    pub sources_responded: usize,
    /// Not every queried source answered before the aggregate deadline.
    pub partial: bool,
}

impl FusedSnapshot {
    /// Canonical value of a metric, if available.
    pub fn value(&self, kind: MetricKind) -> Option<f64> {
        self.metrics
            .get(&kind)
            .and_then(MetricValue::as_available)
            .map(|c| c.value)
    }

    pub fn consensus(&self, kind: MetricKind) -> Option<&ConsensusValue> {
        self.metrics.get(&kind).and_then(MetricValue::as_available)
    }

    /// Metric kinds that resolved to a value.
    pub fn available_kinds(&self) -> Vec<MetricKind> {
        self.metrics
            .iter()
            .filter(|(_, v)| v.as_available().is_some())
            .map(|(k, _)| *k)
            .collect()
    }

    /// Metric kinds with no responding source, including kinds that were
    /// never tracked.
    pub fn unavailable_kinds(&self) -> Vec<MetricKind> {
        MetricKind::ALL
            .iter()
            .copied()
            .filter(|k| self.value(*k).is_none())
            .collect()
    }

    /// True when not a single metric resolved.
    pub fn is_empty(&self) -> bool {
        self.metrics.values().all(|v| v.as_available().is_none())
    }

    /// Oldest observation time among available metrics.
    pub fn oldest_observation(&self) -> Option<DateTime<Utc>> {
        self.metrics
            .values()
            .filter_map(MetricValue::as_available)
            .map(|c| c.observed_at)
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consensus(value: f64, unit: Unit) -> MetricValue {
        MetricValue::Available(ConsensusValue {
            value,
            unit,
            confidence: 0.9,
            sources: vec!["a".into()],
            divergent: false,
            observed_at: Utc::now(),
        })
    }

    #[test]
    fn unavailable_metrics_have_no_value() {
        let mut metrics = BTreeMap::new();
        metrics.insert(MetricKind::Pm25, consensus(12.0, Unit::MicrogramsPerCubicMeter));
        metrics.insert(MetricKind::Ozone, MetricValue::Unavailable);
        let snap = FusedSnapshot {
            location: Location::new(0.0, 0.0),
            generated_at: Utc::now(),
            metrics,
            confidence: 0.8,
            sources_queried: 2,
            sources_responded: 1,
            partial: true,
        };

        assert_eq!(snap.value(MetricKind::Pm25), Some(12.0));
        assert_eq!(snap.value(MetricKind::Ozone), None);
        assert_eq!(snap.available_kinds(), vec![MetricKind::Pm25]);
        assert_eq!(snap.unavailable_kinds().len(), MetricKind::ALL.len() - 1);
        assert!(!snap.is_empty());
    }

    #[test]
    fn metric_value_serializes_with_status_tag() {
        let json = serde_json::to_value(MetricValue::Unavailable).unwrap();
        assert_eq!(json["status"], "unavailable");
    }
}
