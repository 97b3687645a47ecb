//! The assembled briefing returned to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::location::Location;
use crate::metric::{MetricKind, Unit};
use crate::reading::EnvironmentalReading;
use crate::recommendation::RecommendationItem;
use crate::risk::RiskScore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Worsening,
    Stable,
    /// Neither a forecast nor a baseline was available.
    Unknown,
}

/// What the current value was compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendReference {
    Forecast,
    Baseline,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendEntry {
    pub trend: Trend,
    pub reference: TrendReference,
    pub current: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_value: Option<f64>,
}

/// A quantity in a single unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

/// A quantity whose unit depends on the audience, emitted in both systems.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DualQuantity {
    pub metric: Quantity,
    pub imperial: Quantity,
}

/// Display values for every available metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayConditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<DualQuantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<DualQuantity>,
    /// Metrics with an unambiguous unit, in canonical units.
    #[serde(default)]
    pub other: BTreeMap<MetricKind, Quantity>,
}

/// Forecast values at a horizon, canonical units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub horizon_hours: u32,
    pub values: BTreeMap<MetricKind, f64>,
}

impl Forecast {
    /// Collapse forecast readings into one reliability-weighted value per
    /// metric. Unusable readings and unit mismatches are skipped.
    pub fn from_readings(horizon_hours: u32, readings: &[EnvironmentalReading]) -> Self {
        let mut sums: BTreeMap<MetricKind, (f64, f64)> = BTreeMap::new();
        for r in readings.iter().filter(|r| r.is_usable()) {
            match r.canonical_value() {
                Ok(v) => {
                    let e = sums.entry(r.kind).or_insert((0.0, 0.0));
                    e.0 += v * r.reliability;
                    e.1 += r.reliability;
                }
                Err(e) => tracing::debug!(error = %e, source = %r.source_id, "Skipping forecast reading"),
            }
        }
        let values = sums
            .into_iter()
            .filter(|(_, (_, w))| *w > 0.0)
            .map(|(k, (s, w))| (k, s / w))
            .collect();
        Self {
            horizon_hours,
            values,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BriefingRecord {
    pub id: Uuid,
    pub location: Location,
    pub generated_at: DateTime<Utc>,
    pub summary: String,
    pub risk: RiskScore,
    pub recommendations: Vec<RecommendationItem>,
    pub trends: BTreeMap<MetricKind, TrendEntry>,
    pub conditions: DisplayConditions,
    /// At least one metric or source was missing.
    pub partial_data: bool,
    pub unavailable_metrics: Vec<MetricKind>,
}
