//! Recommendation items and their applicability predicates.
//!
//! Opposing advice (cold vs. heat, calm vs. strong wind) is never expressed
//! as two independent thresholds. Items name a *band*, and bands are
//! computed from one canonical value against strictly ordered thresholds,
//! so a single reading can only ever fall into one band of a family.

use serde::{Deserialize, Serialize};

use crate::error::ComputationError;
use crate::metric::MetricKind;
use crate::snapshot::FusedSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Something the person can do right now.
    Actionable,
    /// Background on why conditions matter.
    Educational,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThermalBand {
    Cold,
    Mild,
    Hot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindBand {
    Calm,
    Breezy,
    Strong,
}

/// Thresholds separating the bands of each exclusive family, all in
/// canonical units. The gap between the two thresholds of a family is the
/// dead zone in which neither extreme applies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ApplicabilityBands {
    /// Cold advice applies strictly below this temperature (°C).
    #[serde(default = "default_cold_below_c")]
    pub cold_below_c: f64,
    /// Heat advice applies strictly above this temperature (°C).
    #[serde(default = "default_heat_above_c")]
    pub heat_above_c: f64,
    /// Calm-air advice applies strictly below this wind speed (m/s).
    #[serde(default = "default_calm_below_mps")]
    pub calm_below_mps: f64,
    /// Strong-wind advice applies strictly above this wind speed (m/s).
    #[serde(default = "default_strong_above_mps")]
    pub strong_above_mps: f64,
}

fn default_cold_below_c() -> f64 {
    10.0
}
fn default_heat_above_c() -> f64 {
    27.0
}
fn default_calm_below_mps() -> f64 {
    2.0
}
fn default_strong_above_mps() -> f64 {
    10.0
}

impl Default for ApplicabilityBands {
    fn default() -> Self {
        Self {
            cold_below_c: default_cold_below_c(),
            heat_above_c: default_heat_above_c(),
            calm_below_mps: default_calm_below_mps(),
            strong_above_mps: default_strong_above_mps(),
        }
    }
}

impl ApplicabilityBands {
    pub fn validate(&self) -> Result<(), String> {
        let all = [
            self.cold_below_c,
            self.heat_above_c,
            self.calm_below_mps,
            self.strong_above_mps,
        ];
        if all.iter().any(|v| !v.is_finite()) {
            return Err("band thresholds must be finite".into());
        }
        if self.cold_below_c >= self.heat_above_c {
            return Err(format!(
                "cold_below_c ({}) must be strictly below heat_above_c ({})",
                self.cold_below_c, self.heat_above_c
            ));
        }
        if self.calm_below_mps >= self.strong_above_mps {
            return Err(format!(
                "calm_below_mps ({}) must be strictly below strong_above_mps ({})",
                self.calm_below_mps, self.strong_above_mps
            ));
        }
        Ok(())
    }

    pub fn thermal_band(&self, celsius: f64) -> ThermalBand {
        if celsius < self.cold_below_c {
            ThermalBand::Cold
        } else if celsius > self.heat_above_c {
            ThermalBand::Hot
        } else {
            ThermalBand::Mild
        }
    }

    pub fn wind_band(&self, mps: f64) -> WindBand {
        if mps < self.calm_below_mps {
            WindBand::Calm
        } else if mps > self.strong_above_mps {
            WindBand::Strong
        } else {
            WindBand::Breezy
        }
    }
}

/// When an item is eligible. Evaluated against canonical snapshot values;
/// a predicate over a missing metric is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "when", rename_all = "snake_case")]
pub enum Applicability {
    Always,
    Thermal { band: ThermalBand },
    Wind { band: WindBand },
    Above { metric: MetricKind, threshold: f64 },
    Below { metric: MetricKind, threshold: f64 },
    AllOf { predicates: Vec<Applicability> },
}

/// A family of mutually exclusive bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExclusiveClaim {
    Thermal(ThermalBand),
    Wind(WindBand),
}

impl ExclusiveClaim {
    fn contradicts(&self, other: &ExclusiveClaim) -> bool {
        match (self, other) {
            (ExclusiveClaim::Thermal(a), ExclusiveClaim::Thermal(b)) => a != b,
            (ExclusiveClaim::Wind(a), ExclusiveClaim::Wind(b)) => a != b,
            _ => false,
        }
    }
}

impl Applicability {
    pub fn evaluate(&self, snapshot: &FusedSnapshot, bands: &ApplicabilityBands) -> bool {
        match self {
            Applicability::Always => true,
            Applicability::Thermal { band } => snapshot
                .value(MetricKind::Temperature)
                .is_some_and(|t| bands.thermal_band(t) == *band),
            Applicability::Wind { band } => snapshot
                .value(MetricKind::WindSpeed)
                .is_some_and(|w| bands.wind_band(w) == *band),
            Applicability::Above { metric, threshold } => {
                snapshot.value(*metric).is_some_and(|v| v > *threshold)
            }
            Applicability::Below { metric, threshold } => {
                snapshot.value(*metric).is_some_and(|v| v < *threshold)
            }
            Applicability::AllOf { predicates } => {
                predicates.iter().all(|p| p.evaluate(snapshot, bands))
            }
        }
    }

    /// Band claims this predicate makes, used for contradiction checks.
    pub fn claims(&self) -> Vec<ExclusiveClaim> {
        match self {
            Applicability::Thermal { band } => vec![ExclusiveClaim::Thermal(*band)],
            Applicability::Wind { band } => vec![ExclusiveClaim::Wind(*band)],
            Applicability::AllOf { predicates } => {
                predicates.iter().flat_map(Applicability::claims).collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn contradicts(&self, other: &Applicability) -> bool {
        let theirs = other.claims();
        self.claims()
            .iter()
            .any(|mine| theirs.iter().any(|t| mine.contradicts(t)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub id: String,
    pub text: String,
    pub category: Category,
    pub applicability: Applicability,
}

impl RecommendationItem {
    pub fn new(
        id: impl Into<String>,
        category: Category,
        applicability: Applicability,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            category,
            applicability,
        }
    }
}

/// Fail if any two items make opposing band claims.
pub fn ensure_consistent(items: &[RecommendationItem]) -> Result<(), ComputationError> {
    for (i, a) in items.iter().enumerate() {
        for b in &items[i + 1..] {
            if a.applicability.contradicts(&b.applicability) {
                return Err(ComputationError::Contradiction {
                    first: a.id.clone(),
                    second: b.id.clone(),
                });
            }
        }
    }
    Ok(())
}
