//! The explainable risk score.

use serde::{Deserialize, Serialize};

use crate::metric::MetricKind;

/// Coarse band for a 0–100 score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl RiskBand {
    pub fn from_value(value: f64) -> Self {
        if value < 25.0 {
            RiskBand::Low
        } else if value < 50.0 {
            RiskBand::Moderate
        } else if value < 75.0 {
            RiskBand::High
        } else {
            RiskBand::VeryHigh
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskBand::Low => "Low",
            RiskBand::Moderate => "Moderate",
            RiskBand::High => "High",
            RiskBand::VeryHigh => "Very high",
        }
    }
}

/// What a factor refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FactorSource {
    Metric { metric: MetricKind },
    Synergy { first: MetricKind, second: MetricKind },
}

/// One line of the score's explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub source: FactorSource,
    pub label: String,
    /// Unweighted 0–100 sub-score; 0 for unavailable metrics.
    pub sub_score: f64,
    /// Points this factor adds to the final score.
    pub contribution: f64,
    pub trigger: bool,
    pub available: bool,
}

impl RiskFactor {
    pub fn metric(&self) -> Option<MetricKind> {
        match self.source {
            FactorSource::Metric { metric } => Some(metric),
            FactorSource::Synergy { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    /// Always within [0, 100].
    pub value: f64,
    pub band: RiskBand,
    /// In [0, 1]; higher for fresher, better-corroborated data.
    pub confidence: f64,
    /// Available factors by descending contribution, then unavailable ones.
    pub factors: Vec<RiskFactor>,
}

impl RiskScore {
    /// The available factor with the largest contribution.
    pub fn dominant_factor(&self) -> Option<&RiskFactor> {
        self.factors
            .iter()
            .filter(|f| f.available)
            .max_by(|a, b| {
                a.contribution
                    .partial_cmp(&b.contribution)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    pub fn unavailable_metrics(&self) -> Vec<MetricKind> {
        self.factors
            .iter()
            .filter(|f| !f.available)
            .filter_map(RiskFactor::metric)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_edges() {
        assert_eq!(RiskBand::from_value(0.0), RiskBand::Low);
        assert_eq!(RiskBand::from_value(24.9), RiskBand::Low);
        assert_eq!(RiskBand::from_value(25.0), RiskBand::Moderate);
        assert_eq!(RiskBand::from_value(74.9), RiskBand::High);
        assert_eq!(RiskBand::from_value(100.0), RiskBand::VeryHigh);
    }

    #[test]
    fn dominant_factor_ignores_unavailable() {
        let score = RiskScore {
            value: 40.0,
            band: RiskBand::Moderate,
            confidence: 0.8,
            factors: vec![
                RiskFactor {
                    source: FactorSource::Metric { metric: MetricKind::Ozone },
                    label: "Ozone".into(),
                    sub_score: 40.0,
                    contribution: 30.0,
                    trigger: false,
                    available: true,
                },
                RiskFactor {
                    source: FactorSource::Metric { metric: MetricKind::Pm25 },
                    label: "PM2.5".into(),
                    sub_score: 0.0,
                    contribution: 0.0,
                    trigger: true,
                    available: false,
                },
            ],
        };
        assert_eq!(score.dominant_factor().unwrap().metric(), Some(MetricKind::Ozone));
        assert_eq!(score.unavailable_metrics(), vec![MetricKind::Pm25]);
    }
}
