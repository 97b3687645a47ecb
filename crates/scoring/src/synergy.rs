//! Compound exposure bonuses.
//!
//! Some pairs of conditions are worse together than apart: heat speeds up
//! ozone formation and deepens breathing, humid air carries fine particles
//! deeper into the lungs. When both members of a configured pair exceed
//! their thresholds, a bonus proportional to the weaker of the two
//! sub-scores is added.

use breathwise_config::SynergyRule;
use breathwise_core::metric::MetricKind;
use breathwise_core::snapshot::FusedSnapshot;

use crate::breakpoints::sub_score;

/// A triggered synergy rule.
#[derive(Debug, Clone, PartialEq)]
pub struct SynergyHit<'a> {
    pub rule: &'a SynergyRule,
    /// `coefficient * min(sub_a, sub_b)`, before personalization.
    pub base_bonus: f64,
}

impl SynergyHit<'_> {
    pub fn pair(&self) -> (MetricKind, MetricKind) {
        (self.rule.first, self.rule.second)
    }
}

/// Rules whose members are both available and above threshold.
pub fn evaluate<'a>(rules: &'a [SynergyRule], snapshot: &FusedSnapshot) -> Vec<SynergyHit<'a>> {
    rules
        .iter()
        .filter_map(|rule| {
            let a = snapshot.value(rule.first)?;
            let b = snapshot.value(rule.second)?;
            if a > rule.first_threshold && b > rule.second_threshold {
                let weaker = sub_score(rule.first, a).min(sub_score(rule.second, b));
                Some(SynergyHit {
                    rule,
                    base_bonus: rule.coefficient * weaker,
                })
            } else {
                None
            }
        })
        .collect()
}
