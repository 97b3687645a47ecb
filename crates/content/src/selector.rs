//! Variation selection: varied but never contradictory advice.
//!
//! For each category in the budget: keep the items whose applicability
//! holds for the snapshot, drop those the user saw recently, and pick at
//! random from what is left. When recency would leave nothing, the
//! category's history is reset and selection retried once.

use breathwise_config::{CategoryQuota, ContentConfig};
use breathwise_core::error::Result;
use breathwise_core::recommendation::{
    ApplicabilityBands, Category, RecommendationItem, ensure_consistent,
};
use breathwise_core::snapshot::FusedSnapshot;
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, error};

use crate::pool::RecommendationPool;
use crate::recency::RecencyState;

pub struct VariationSelector {
    pool: RecommendationPool,
    bands: ApplicabilityBands,
}

impl VariationSelector {
    pub fn new(pool: RecommendationPool, bands: ApplicabilityBands) -> Self {
        Self { pool, bands }
    }

    /// Selector over the configured pool (see `content.pool_path`).
    pub fn from_config(config: &ContentConfig) -> Result<Self> {
        Ok(Self::new(RecommendationPool::from_config(config)?, config.bands))
    }

    pub fn pool(&self) -> &RecommendationPool {
        &self.pool
    }

    pub fn bands(&self) -> &ApplicabilityBands {
        &self.bands
    }

    pub fn select(
        &self,
        budget: &[CategoryQuota],
        snapshot: &FusedSnapshot,
        state: &mut RecencyState,
    ) -> Result<Vec<RecommendationItem>> {
        self.select_with_rng(budget, snapshot, state, &mut rand::rng())
    }

    pub fn select_with_rng<R: Rng + ?Sized>(
        &self,
        budget: &[CategoryQuota],
        snapshot: &FusedSnapshot,
        state: &mut RecencyState,
        rng: &mut R,
    ) -> Result<Vec<RecommendationItem>> {
        let mut chosen: Vec<RecommendationItem> = Vec::new();

        for quota in budget.iter().filter(|q| q.count > 0) {
            let category = quota.category;
            let applicable: Vec<&RecommendationItem> = self
                .pool
                .in_category(category)
                .filter(|item| item.applicability.evaluate(snapshot, &self.bands))
                .filter(|item| {
                    !chosen
                        .iter()
                        .any(|c| c.applicability.contradicts(&item.applicability))
                })
                .collect();

            if applicable.is_empty() {
                debug!(?category, "No applicable items");
                continue;
            }

            let mut picks = pick_fresh(&applicable, category, state, quota.count, rng);
            if picks.is_empty() {
                debug!(?category, "Every applicable item shown recently, resetting");
                state.reset(category);
                picks = pick_fresh(&applicable, category, state, quota.count, rng);
            } else if picks.len() < quota.count && picks.len() < applicable.len() {
                // The fresh items ran out mid-budget: start a new cycle and
                // top up without repeating anything picked in this call.
                state.reset(category);
                for item in &picks {
                    state.record(category, &item.id);
                }
                let more = pick_fresh(&applicable, category, state, quota.count - picks.len(), rng);
                state.reset(category);
                picks.extend(more);
            }

            for item in &picks {
                state.record(category, &item.id);
            }
            chosen.extend(picks);
        }

        if let Err(e) = ensure_consistent(&chosen) {
            error!(error = %e, "Selector produced contradictory items");
            return Err(e.into());
        }
        debug!(chosen = ?chosen.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(), "Recommendations selected");
        Ok(chosen)
    }
}

fn pick_fresh<R: Rng + ?Sized>(
    applicable: &[&RecommendationItem],
    category: Category,
    state: &RecencyState,
    count: usize,
    rng: &mut R,
) -> Vec<RecommendationItem> {
    let mut fresh: Vec<&RecommendationItem> = applicable
        .iter()
        .copied()
        .filter(|item| !state.contains(category, &item.id))
        .collect();
    fresh.shuffle(rng);
    fresh.into_iter().take(count).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use breathwise_core::location::Location;
    use breathwise_core::metric::MetricKind;
    use breathwise_core::recommendation::{Applicability, ThermalBand, WindBand};
    use breathwise_core::snapshot::{ConsensusValue, MetricValue};
    use chrono::Utc;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::{BTreeMap, HashSet};

    fn snapshot_with(values: &[(MetricKind, f64)]) -> FusedSnapshot {
        let metrics: BTreeMap<_, _> = values
            .iter()
            .map(|(kind, value)| {
                (
                    *kind,
                    MetricValue::Available(ConsensusValue {
                        value: *value,
                        unit: kind.canonical_unit(),
                        confidence: 1.0,
                        sources: vec!["t".into()],
                        divergent: false,
                        observed_at: Utc::now(),
                    }),
                )
            })
            .collect();
        FusedSnapshot {
            location: Location::new(0.0, 0.0),
            generated_at: Utc::now(),
            metrics,
            confidence: 1.0,
            sources_queried: 1,
            sources_responded: 1,
            partial: false,
        }
    }

    fn quota(category: Category, count: usize) -> CategoryQuota {
        CategoryQuota { category, count }
    }

    fn four_item_pool() -> RecommendationPool {
        let items = (1..=4)
            .map(|i| {
                RecommendationItem::new(
                    format!("item-{i}"),
                    Category::Actionable,
                    Applicability::Always,
                    format!("Advice {i}."),
                )
            })
            .collect();
        RecommendationPool::new(items).unwrap()
    }

    #[test]
    fn no_repeat_until_pool_exhausted() {
        let selector = VariationSelector::new(four_item_pool(), ApplicabilityBands::default());
        let snap = snapshot_with(&[]);
        let mut state = RecencyState::new();
        let mut rng = StdRng::seed_from_u64(7);

        let shown: Vec<String> = (0..10)
            .map(|_| {
                let picks = selector
                    .select_with_rng(&[quota(Category::Actionable, 1)], &snap, &mut state, &mut rng)
                    .unwrap();
                assert_eq!(picks.len(), 1);
                picks[0].id.clone()
            })
            .collect();

        // Every window of four consecutive calls starting at a cycle
        // boundary covers the whole pool.
        for cycle in shown.chunks(4).filter(|c| c.len() == 4) {
            let distinct: HashSet<&String> = cycle.iter().collect();
            assert_eq!(distinct.len(), 4, "repeat within cycle: {cycle:?}");
        }
    }

    #[test]
    fn twenty_celsius_gets_neither_cold_nor_heat_advice() {
        let selector = VariationSelector::new(RecommendationPool::builtin(), ApplicabilityBands::default());
        let snap = snapshot_with(&[(MetricKind::Temperature, 20.0), (MetricKind::Pm25, 5.0)]);
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..20 {
            let mut state = RecencyState::new();
            let picks = selector
                .select_with_rng(&[quota(Category::Actionable, 5)], &snap, &mut state, &mut rng)
                .unwrap();
            assert!(picks.iter().all(|p| !p.id.starts_with("cold-") && !p.id.starts_with("heat-")));
        }
    }

    #[test]
    fn cold_day_never_mixes_heat_advice() {
        let selector = VariationSelector::new(RecommendationPool::builtin(), ApplicabilityBands::default());
        let snap = snapshot_with(&[(MetricKind::Temperature, 2.0), (MetricKind::WindSpeed, 12.0)]);
        let mut state = RecencyState::new();
        let mut rng = StdRng::seed_from_u64(3);

        let picks = selector
            .select_with_rng(
                &[quota(Category::Actionable, 10), quota(Category::Educational, 5)],
                &snap,
                &mut state,
                &mut rng,
            )
            .unwrap();
        assert!(picks.iter().any(|p| p.id.starts_with("cold-")));
        assert!(!picks.iter().any(|p| p.id.starts_with("heat-") || p.id == "calm-stagnant"));
    }

    #[test]
    fn respects_category_budget() {
        let selector = VariationSelector::from_config(&ContentConfig::default()).unwrap();
        let snap = snapshot_with(&[(MetricKind::Pm25, 80.0), (MetricKind::Temperature, 20.0)]);
        let mut state = RecencyState::new();
        let picks = selector
            .select(&ContentConfig::default().budget, &snap, &mut state)
            .unwrap();

        let actionable = picks.iter().filter(|p| p.category == Category::Actionable).count();
        let educational = picks.iter().filter(|p| p.category == Category::Educational).count();
        assert_eq!((actionable, educational), (2, 1));
        assert_eq!(state.shown(Category::Actionable).len(), 2);
    }

    #[test]
    fn missing_metrics_only_get_unconditional_items() {
        let selector = VariationSelector::new(RecommendationPool::builtin(), ApplicabilityBands::default());
        let snap = snapshot_with(&[]);
        let mut state = RecencyState::new();
        let picks = selector
            .select(&[quota(Category::Actionable, 10)], &snap, &mut state)
            .unwrap();
        assert!(!picks.is_empty());
        assert!(picks.iter().all(|p| p.applicability == Applicability::Always));
    }

    #[test]
    fn top_up_keeps_budget_without_repeats() {
        let selector = VariationSelector::new(four_item_pool(), ApplicabilityBands::default());
        let snap = snapshot_with(&[]);
        let mut state = RecencyState::new();
        let mut rng = StdRng::seed_from_u64(11);
        let budget = [quota(Category::Actionable, 3)];

        let first = selector.select_with_rng(&budget, &snap, &mut state, &mut rng).unwrap();
        let second = selector.select_with_rng(&budget, &snap, &mut state, &mut rng).unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(second.len(), 3);

        let second_ids: HashSet<&str> = second.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(second_ids.len(), 3);
        // The one item not shown first comes up in the second call.
        let leftover = four_item_pool()
            .items()
            .iter()
            .find(|i| !first.iter().any(|f| f.id == i.id))
            .map(|i| i.id.clone())
            .unwrap();
        assert!(second_ids.contains(leftover.as_str()));
    }

    #[test]
    fn contradictory_custom_pool_never_emits_both() {
        let pool = RecommendationPool::new(vec![
            RecommendationItem::new(
                "calm",
                Category::Actionable,
                Applicability::Wind { band: WindBand::Calm },
                "Still air.",
            ),
            RecommendationItem::new(
                "strong",
                Category::Educational,
                Applicability::Wind { band: WindBand::Strong },
                "Gusty.",
            ),
            RecommendationItem::new(
                "mild",
                Category::Actionable,
                Applicability::Thermal { band: ThermalBand::Mild },
                "Mild.",
            ),
        ])
        .unwrap();
        let selector = VariationSelector::new(pool, ApplicabilityBands::default());
        let snap = snapshot_with(&[(MetricKind::WindSpeed, 1.0), (MetricKind::Temperature, 18.0)]);
        let mut state = RecencyState::new();
        let picks = selector
            .select(
                &[quota(Category::Actionable, 2), quota(Category::Educational, 1)],
                &snap,
                &mut state,
            )
            .unwrap();
        let ids: HashSet<&str> = picks.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, HashSet::from(["calm", "mild"]));
    }
}
