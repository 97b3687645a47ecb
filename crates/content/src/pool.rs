//! The recommendation pool.
//!
//! Thresholds in the built-in items are canonical units: µg/m³ for
//! particles, ppb for ozone and NO₂, index for UV. Thermal and wind advice
//! is expressed through bands so that opposing items can never both apply.

use breathwise_core::error::{Error, Result};
use breathwise_core::metric::MetricKind;
use breathwise_core::recommendation::{
    Applicability, Category, RecommendationItem, ThermalBand, WindBand,
};
use breathwise_config::ContentConfig;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// A validated, read-only set of recommendation items.
#[derive(Debug, Clone)]
pub struct RecommendationPool {
    items: Vec<RecommendationItem>,
}

impl RecommendationPool {
    /// Build a pool, rejecting duplicate ids and empty text.
    pub fn new(items: Vec<RecommendationItem>) -> Result<Self> {
        let mut seen = HashSet::new();
        for item in &items {
            if item.id.trim().is_empty() || item.text.trim().is_empty() {
                return Err(Error::Config {
                    message: format!("recommendation '{}' has an empty id or text", item.id),
                });
            }
            if !seen.insert(item.id.as_str()) {
                return Err(Error::Config {
                    message: format!("duplicate recommendation id '{}'", item.id),
                });
            }
        }
        Ok(Self { items })
    }

    /// Parse a pool from a JSON array of items.
    pub fn from_json(json: &str) -> Result<Self> {
        let items: Vec<RecommendationItem> = serde_json::from_str(json)?;
        Self::new(items)
    }

    /// Read a pool from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read recommendation pool {}: {e}", path.display()),
        })?;
        let pool = Self::from_json(&json)?;
        info!(path = %path.display(), items = pool.len(), "Loaded recommendation pool");
        Ok(pool)
    }

    /// The pool named by `content.pool_path`, or the built-in one.
    pub fn from_config(config: &ContentConfig) -> Result<Self> {
        match &config.pool_path {
            Some(path) => Self::load(path),
            None => Ok(Self::builtin()),
        }
    }

    pub fn builtin() -> Self {
        Self {
            items: builtin_items(),
        }
    }

    pub fn items(&self) -> &[RecommendationItem] {
        &self.items
    }

    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &RecommendationItem> {
        self.items.iter().filter(move |i| i.category == category)
    }

    pub fn get(&self, id: &str) -> Option<&RecommendationItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for RecommendationPool {
    fn default() -> Self {
        Self::builtin()
    }
}

fn above(metric: MetricKind, threshold: f64) -> Applicability {
    Applicability::Above { metric, threshold }
}

fn below(metric: MetricKind, threshold: f64) -> Applicability {
    Applicability::Below { metric, threshold }
}

fn thermal(band: ThermalBand) -> Applicability {
    Applicability::Thermal { band }
}

fn wind(band: WindBand) -> Applicability {
    Applicability::Wind { band }
}

fn builtin_items() -> Vec<RecommendationItem> {
    use Category::{Actionable, Educational};

    vec![
        // Particles
        RecommendationItem::new(
            "pm-limit-exertion",
            Actionable,
            above(MetricKind::Pm25, 35.4),
            "Keep outdoor exercise light today and move workouts indoors if you can.",
        ),
        RecommendationItem::new(
            "pm-close-windows",
            Actionable,
            above(MetricKind::Pm25, 35.4),
            "Keep windows closed and run an air purifier if you have one.",
        ),
        RecommendationItem::new(
            "pm-mask",
            Actionable,
            above(MetricKind::Pm25, 55.4),
            "A well-fitted N95 or FFP2 mask filters most fine particles if you need to be outside.",
        ),
        RecommendationItem::new(
            "pm-inhaler",
            Actionable,
            above(MetricKind::Pm25, 55.4),
            "Carry your reliever inhaler and follow your action plan if symptoms start.",
        ),
        RecommendationItem::new(
            "pm-coarse-dust",
            Actionable,
            above(MetricKind::Pm10, 154.0),
            "Dusty air today: rinse your eyes and nose after spending time outside.",
        ),
        // Ozone
        RecommendationItem::new(
            "ozone-morning",
            Actionable,
            above(MetricKind::Ozone, 70.0),
            "Ozone peaks in the afternoon. Plan outdoor activity for the early morning.",
        ),
        // Traffic pollution
        RecommendationItem::new(
            "no2-avoid-traffic",
            Actionable,
            above(MetricKind::No2, 53.0),
            "Pick routes away from busy roads; traffic fumes are elevated.",
        ),
        // Thermal
        RecommendationItem::new(
            "cold-cover-mouth",
            Actionable,
            thermal(ThermalBand::Cold),
            "Cold air can tighten airways. Breathe through a scarf or buff when outdoors.",
        ),
        RecommendationItem::new(
            "cold-warm-up",
            Actionable,
            thermal(ThermalBand::Cold),
            "Warm up indoors for a few minutes before heading into the cold.",
        ),
        RecommendationItem::new(
            "heat-hydrate",
            Actionable,
            thermal(ThermalBand::Hot),
            "Drink water regularly and take breaks in the shade.",
        ),
        RecommendationItem::new(
            "heat-cool-hours",
            Actionable,
            thermal(ThermalBand::Hot),
            "Save strenuous activity for the cooler hours of the day.",
        ),
        RecommendationItem::new(
            "mild-good-window",
            Actionable,
            Applicability::AllOf {
                predicates: vec![thermal(ThermalBand::Mild), below(MetricKind::Pm25, 35.4)],
            },
            "Temperatures are comfortable. It is a good window for time outside.",
        ),
        // Humidity and wind
        RecommendationItem::new(
            "humid-pace",
            Actionable,
            above(MetricKind::Humidity, 70.0),
            "Humid air feels heavier to breathe. Pace yourself and rest often.",
        ),
        RecommendationItem::new(
            "dry-air",
            Actionable,
            below(MetricKind::Humidity, 30.0),
            "Dry air can irritate airways. Sip water and consider a humidifier indoors.",
        ),
        RecommendationItem::new(
            "calm-stagnant",
            Actionable,
            Applicability::AllOf {
                predicates: vec![wind(WindBand::Calm), above(MetricKind::Pm25, 9.0)],
            },
            "Still air lets pollution linger near the ground. Ventilate when the wind picks up.",
        ),
        RecommendationItem::new(
            "strong-wind-pollen",
            Actionable,
            wind(WindBand::Strong),
            "Strong winds stir up dust and pollen. Wraparound sunglasses help protect your eyes.",
        ),
        // UV
        RecommendationItem::new(
            "uv-protect",
            Actionable,
            above(MetricKind::UvIndex, 6.0),
            "UV is high. Wear sunscreen and a hat if you are out around midday.",
        ),
        // General
        RecommendationItem::new(
            "general-check-later",
            Actionable,
            Applicability::Always,
            "Check back later today; conditions can change quickly.",
        ),
        RecommendationItem::new(
            "general-plan-ahead",
            Actionable,
            Applicability::Always,
            "Keep your medication where you can reach it when you head out.",
        ),
        // Educational
        RecommendationItem::new(
            "edu-pm25",
            Educational,
            Applicability::Always,
            "PM2.5 particles are small enough to reach deep into the lungs and the bloodstream.",
        ),
        RecommendationItem::new(
            "edu-ozone",
            Educational,
            above(MetricKind::Ozone, 54.0),
            "Ground-level ozone forms when sunlight reacts with traffic and industrial emissions.",
        ),
        RecommendationItem::new(
            "edu-heat-ozone",
            Educational,
            thermal(ThermalBand::Hot),
            "Hot days speed up ozone formation, so heat and smog often arrive together.",
        ),
        RecommendationItem::new(
            "edu-cold-airways",
            Educational,
            thermal(ThermalBand::Cold),
            "Breathing cold, dry air is a common trigger for airway narrowing.",
        ),
        RecommendationItem::new(
            "edu-humidity",
            Educational,
            Applicability::Always,
            "Both very dry and very humid air can make breathing harder for sensitive people.",
        ),
        RecommendationItem::new(
            "edu-indoor-air",
            Educational,
            Applicability::Always,
            "Indoor air can be cleaner than outside on bad days, as long as windows stay shut.",
        ),
    ]
}
