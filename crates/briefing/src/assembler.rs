//! Briefing assembly: score, recommendations, trends, and display values
//! in one record.

use breathwise_config::BriefingConfig;
use breathwise_core::briefing::{BriefingRecord, Forecast, Trend, TrendEntry};
use breathwise_core::error::Result;
use breathwise_core::metric::MetricKind;
use breathwise_core::recommendation::{RecommendationItem, ensure_consistent};
use breathwise_core::risk::RiskScore;
use breathwise_core::snapshot::FusedSnapshot;
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{debug, error};
use uuid::Uuid;

use crate::baseline::Baseline;
use crate::{trend, units};

pub struct BriefingAssembler {
    config: BriefingConfig,
}

impl BriefingAssembler {
    pub fn new(config: BriefingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BriefingConfig {
        &self.config
    }

    pub fn assemble(
        &self,
        score: RiskScore,
        items: Vec<RecommendationItem>,
        snapshot: &FusedSnapshot,
        forecast: Option<&Forecast>,
    ) -> Result<BriefingRecord> {
        self.assemble_with_baseline(score, items, snapshot, forecast, None)
    }

    /// Like [`assemble`](Self::assemble), falling back to `baseline` for
    /// metrics the forecast does not cover.
    pub fn assemble_with_baseline(
        &self,
        score: RiskScore,
        items: Vec<RecommendationItem>,
        snapshot: &FusedSnapshot,
        forecast: Option<&Forecast>,
        baseline: Option<&Baseline>,
    ) -> Result<BriefingRecord> {
        if let Err(e) = ensure_consistent(&items) {
            error!(error = %e, "Selected recommendations contradict each other");
            return Err(e.into());
        }

        let trends = self.trends(snapshot, forecast, baseline);
        let conditions = units::display_conditions(snapshot)?;
        let unavailable_metrics = snapshot.unavailable_kinds();
        let partial_data = snapshot.partial || !unavailable_metrics.is_empty();
        let summary = summarize(&score, &trends, partial_data);

        debug!(
            band = ?score.band,
            trends = trends.len(),
            recommendations = items.len(),
            partial_data,
            "Briefing assembled"
        );

        Ok(BriefingRecord {
            id: Uuid::new_v4(),
            location: snapshot.location,
            generated_at: Utc::now(),
            summary,
            risk: score,
            recommendations: items,
            trends,
            conditions,
            partial_data,
            unavailable_metrics,
        })
    }

    fn trends(
        &self,
        snapshot: &FusedSnapshot,
        forecast: Option<&Forecast>,
        baseline: Option<&Baseline>,
    ) -> BTreeMap<MetricKind, TrendEntry> {
        snapshot
            .available_kinds()
            .into_iter()
            .filter_map(|kind| snapshot.value(kind).map(|v| (kind, v)))
            .map(|(kind, current)| {
                let deadband = self.config.deadband_for(kind);
                let ahead = forecast.and_then(|f| f.values.get(&kind)).copied();
                let behind = baseline.and_then(|b| b.get(&kind)).copied();
                let entry = match (ahead, behind) {
                    (Some(f), _) => trend::against_forecast(kind, current, f, deadband),
                    (None, Some(b)) => trend::against_baseline(kind, current, b, deadband),
                    (None, None) => trend::unknown(current),
                };
                (kind, entry)
            })
            .collect()
    }
}

impl Default for BriefingAssembler {
    fn default() -> Self {
        Self::new(BriefingConfig::default())
    }
}

fn summarize(score: &RiskScore, trends: &BTreeMap<MetricKind, TrendEntry>, partial: bool) -> String {
    let mut summary = format!("{} risk ({:.0}/100).", score.band.label(), score.value);

    if let Some(top) = score.dominant_factor().filter(|f| f.contribution > 0.0) {
        summary.push_str(&format!(" Main driver: {}.", top.label));
    }

    let worsening: Vec<&str> = trends
        .iter()
        .filter(|(_, t)| t.trend == Trend::Worsening)
        .map(|(k, _)| k.label())
        .collect();
    if !worsening.is_empty() {
        summary.push_str(&format!(" Worsening: {}.", worsening.join(", ")));
    }

    if partial {
        summary.push_str(" Some data was unavailable; the score may understate risk.");
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::snapshot_with;
    use breathwise_core::briefing::TrendReference;
    use breathwise_core::recommendation::{Applicability, Category, ThermalBand};
    use breathwise_core::risk::{FactorSource, RiskBand, RiskFactor};

    fn score(value: f64) -> RiskScore {
        RiskScore {
            value,
            band: RiskBand::from_value(value),
            confidence: 0.8,
            factors: vec![RiskFactor {
                source: FactorSource::Metric {
                    metric: MetricKind::Pm25,
                },
                label: MetricKind::Pm25.label().to_string(),
                sub_score: 60.0,
                contribution: value,
                trigger: false,
                available: true,
            }],
        }
    }

    fn full_snapshot() -> FusedSnapshot {
        let values: Vec<(MetricKind, f64)> = MetricKind::ALL.iter().map(|k| (*k, 10.0)).collect();
        snapshot_with(&values)
    }

    #[test]
    fn forecast_takes_precedence_over_baseline() {
        let snap = snapshot_with(&[(MetricKind::Pm25, 20.0), (MetricKind::Ozone, 30.0)]);
        let forecast = Forecast {
            horizon_hours: 6,
            values: BTreeMap::from([(MetricKind::Pm25, 40.0)]),
        };
        let baseline = Baseline::from([(MetricKind::Pm25, 20.0), (MetricKind::Ozone, 10.0)]);

        let record = BriefingAssembler::default()
            .assemble_with_baseline(score(30.0), vec![], &snap, Some(&forecast), Some(&baseline))
            .unwrap();

        let pm = &record.trends[&MetricKind::Pm25];
        assert_eq!(pm.reference, TrendReference::Forecast);
        assert_eq!(pm.trend, Trend::Worsening);

        let o3 = &record.trends[&MetricKind::Ozone];
        assert_eq!(o3.reference, TrendReference::Baseline);
        assert_eq!(o3.trend, Trend::Worsening);
    }

    #[test]
    fn no_reference_means_unknown_trends() {
        let snap = snapshot_with(&[(MetricKind::Pm25, 20.0)]);
        let record = BriefingAssembler::default()
            .assemble(score(30.0), vec![], &snap, None)
            .unwrap();
        assert_eq!(record.trends.len(), 1);
        assert_eq!(record.trends[&MetricKind::Pm25].trend, Trend::Unknown);
    }

    #[test]
    fn per_metric_deadband_override() {
        let mut config = BriefingConfig::default();
        config.deadband_overrides.insert(MetricKind::Pm25, 25.0);
        let snap = snapshot_with(&[(MetricKind::Pm25, 20.0)]);
        let forecast = Forecast {
            horizon_hours: 6,
            values: BTreeMap::from([(MetricKind::Pm25, 40.0)]),
        };
        let record = BriefingAssembler::new(config)
            .assemble(score(30.0), vec![], &snap, Some(&forecast))
            .unwrap();
        assert_eq!(record.trends[&MetricKind::Pm25].trend, Trend::Stable);
    }

    #[test]
    fn small_scale_metrics_are_not_always_stable() {
        let snap = snapshot_with(&[(MetricKind::Co, 0.3), (MetricKind::UvIndex, 2.0), (MetricKind::Pm25, 20.0)]);
        let forecast = Forecast {
            horizon_hours: 6,
            values: BTreeMap::from([
                (MetricKind::Co, 2.5),
                (MetricKind::UvIndex, 7.0),
                (MetricKind::Pm25, 22.0),
            ]),
        };
        let record = BriefingAssembler::default()
            .assemble(score(30.0), vec![], &snap, Some(&forecast))
            .unwrap();
        assert_eq!(record.trends[&MetricKind::Co].trend, Trend::Worsening);
        assert_eq!(record.trends[&MetricKind::UvIndex].trend, Trend::Worsening);
        assert_eq!(record.trends[&MetricKind::Pm25].trend, Trend::Stable);
    }

    #[test]
    fn partial_data_is_flagged_and_summarized() {
        let snap = snapshot_with(&[(MetricKind::Pm25, 20.0)]);
        let record = BriefingAssembler::default()
            .assemble(score(60.0), vec![], &snap, None)
            .unwrap();
        assert!(record.partial_data);
        assert!(record.unavailable_metrics.contains(&MetricKind::Ozone));
        assert!(!record.unavailable_metrics.contains(&MetricKind::Pm25));
        assert!(record.summary.starts_with("High risk (60/100)."));
        assert!(record.summary.contains("Main driver"));
        assert!(record.summary.contains("unavailable"));
    }

    #[test]
    fn complete_snapshot_is_not_partial() {
        let record = BriefingAssembler::default()
            .assemble(score(10.0), vec![], &full_snapshot(), None)
            .unwrap();
        assert!(!record.partial_data);
        assert!(record.unavailable_metrics.is_empty());
        assert!(!record.summary.contains("unavailable"));
        assert!(record.conditions.temperature.is_some());
    }

    #[test]
    fn contradictory_items_are_rejected() {
        let cold = RecommendationItem::new(
            "cold",
            Category::Actionable,
            Applicability::Thermal {
                band: ThermalBand::Cold,
            },
            "Layer up.",
        );
        let hot = RecommendationItem::new(
            "hot",
            Category::Actionable,
            Applicability::Thermal {
                band: ThermalBand::Hot,
            },
            "Stay hydrated.",
        );
        let err = BriefingAssembler::default()
            .assemble(score(10.0), vec![cold, hot], &full_snapshot(), None)
            .unwrap_err();
        assert!(err.to_string().contains("Contradictory"));
    }
}
