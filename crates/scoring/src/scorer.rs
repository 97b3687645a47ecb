//! The risk scorer.

use breathwise_config::{RecencyConfig, ScoringConfig};
use breathwise_core::error::{ComputationError, Error, Result};
use breathwise_core::metric::MetricKind;
use breathwise_core::profile::{HealthProfile, Severity};
use breathwise_core::risk::{FactorSource, RiskBand, RiskFactor, RiskScore};
use breathwise_core::snapshot::FusedSnapshot;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use tracing::{debug, error};

use crate::breakpoints::sub_score;
use crate::synergy;

/// Deterministic, explainable scoring of a snapshot against a profile.
#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    config: ScoringConfig,
}

impl RiskScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn score(&self, snapshot: &FusedSnapshot, profile: &HealthProfile) -> Result<RiskScore> {
        self.score_at(snapshot, profile, Utc::now())
    }

    /// Score with an explicit "now", which only affects the recency
    /// discount on confidence.
    pub fn score_at(
        &self,
        snapshot: &FusedSnapshot,
        profile: &HealthProfile,
        now: DateTime<Utc>,
    ) -> Result<RiskScore> {
        profile.validate()?;
        if snapshot.is_empty() {
            return Err(Error::DataUnavailable {
                reason: format!("no metric available at {}", snapshot.location),
            });
        }

        let severity = self.severity_multiplier(profile.max_severity());
        let sensitivity = profile.sensitivity.unwrap_or(1.0);

        let mut available = Vec::new();
        let mut unavailable = Vec::new();

        for kind in MetricKind::ALL {
            let trigger = profile.is_trigger(kind);
            let Some(value) = snapshot.value(kind) else {
                unavailable.push(RiskFactor {
                    source: FactorSource::Metric { metric: kind },
                    label: kind.label().to_string(),
                    sub_score: 0.0,
                    contribution: 0.0,
                    trigger,
                    available: false,
                });
                continue;
            };

            let base = sub_score(kind, value);
            let trigger_mult = if trigger { self.config.trigger_multiplier } else { 1.0 };
            let weight = self.config.weights.get(&kind).copied().unwrap_or(0.0);
            let contribution = base * weight * severity * trigger_mult * sensitivity;
            ensure_finite(contribution, kind.code())?;

            available.push(RiskFactor {
                source: FactorSource::Metric { metric: kind },
                label: kind.label().to_string(),
                sub_score: base,
                contribution,
                trigger,
                available: true,
            });
        }

        for hit in synergy::evaluate(&self.config.synergy, snapshot) {
            let (first, second) = hit.pair();
            let contribution = hit.base_bonus * severity;
            ensure_finite(contribution, &hit.rule.name)?;
            available.push(RiskFactor {
                source: FactorSource::Synergy { first, second },
                label: format!("{} + {}", first.label(), second.label()),
                sub_score: hit.base_bonus,
                contribution,
                trigger: profile.is_trigger(first) || profile.is_trigger(second),
                available: true,
            });
        }

        let total: f64 = available.iter().map(|f| f.contribution).sum();
        ensure_finite(total, "total")?;
        let value = total.clamp(0.0, 100.0);

        available.sort_by(|a, b| {
            b.contribution
                .partial_cmp(&a.contribution)
                .unwrap_or(Ordering::Equal)
        });
        let mut factors = available;
        factors.extend(unavailable);

        let recency = snapshot
            .oldest_observation()
            .map(|observed| recency_factor(&self.config.recency, now - observed))
            .unwrap_or(self.config.recency.floor);
        let confidence = (snapshot.confidence * recency).clamp(0.0, 1.0);

        let band = RiskBand::from_value(value);
        debug!(
            user = %profile.user_ref,
            value,
            band = band.label(),
            confidence,
            raw_total = total,
            "Risk scored"
        );

        Ok(RiskScore {
            value,
            band,
            confidence,
            factors,
        })
    }

    fn severity_multiplier(&self, severity: Option<Severity>) -> f64 {
        let m = &self.config.severity;
        match severity {
            None => m.none,
            Some(Severity::Mild) => m.mild,
            Some(Severity::Moderate) => m.moderate,
            Some(Severity::Severe) => m.severe,
        }
    }
}

fn ensure_finite(value: f64, what: &str) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        error!(metric = what, "Non-finite intermediate while scoring");
        Err(ComputationError::NonFinite {
            metric: what.to_string(),
        }
        .into())
    }
}

/// 1.0 up to the fresh window, then linear decay to `floor` at the stale
/// limit.
fn recency_factor(config: &RecencyConfig, age: chrono::Duration) -> f64 {
    let minutes = age.num_seconds() as f64 / 60.0;
    let fresh = config.fresh_minutes as f64;
    let stale = config.stale_minutes as f64;
    if minutes <= fresh {
        1.0
    } else if minutes >= stale {
        config.floor
    } else {
        1.0 - (minutes - fresh) / (stale - fresh) * (1.0 - config.floor)
    }
}
