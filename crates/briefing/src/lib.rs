//! # Breathwise Briefing
//!
//! Assembles briefings and orchestrates a full request: cached fusion,
//! profile lookup, forecast, scoring, recommendation selection, trends.

pub mod assembler;
pub mod baseline;
pub mod service;
pub mod trend;
pub mod units;

pub use assembler::BriefingAssembler;
pub use baseline::{Baseline, BaselineTracker};
pub use service::BriefingService;

#[cfg(test)]
pub(crate) mod test_support {
    use breathwise_core::location::Location;
    use breathwise_core::metric::MetricKind;
    use breathwise_core::snapshot::{ConsensusValue, FusedSnapshot, MetricValue};
    use chrono::Utc;

    pub fn snapshot_with(values: &[(MetricKind, f64)]) -> FusedSnapshot {
        let now = Utc::now();
        let metrics = MetricKind::ALL
            .iter()
            .map(|kind| {
                let value = match values.iter().find(|(k, _)| k == kind) {
                    Some((_, v)) => MetricValue::Available(ConsensusValue {
                        value: *v,
                        unit: kind.canonical_unit(),
                        confidence: 0.9,
                        sources: vec!["test".into()],
                        divergent: false,
                        observed_at: now,
                    }),
                    None => MetricValue::Unavailable,
                };
                (*kind, value)
            })
            .collect();
        FusedSnapshot {
            location: Location::new(40.0, -74.0),
            generated_at: now,
            metrics,
            confidence: 0.9,
            sources_queried: 2,
            sources_responded: 2,
            partial: false,
        }
    }
}
