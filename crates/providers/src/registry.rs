//! Source registry: builds the configured adapters.
//!
//! Handles adapter creation and hands the result to the fusion engine.

use breathwise_config::AppConfig;
use breathwise_core::source::{DataSource, ForecastProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::fusion::{FusionEngine, FusionSettings};
use crate::json_feed::JsonFeedSource;
use crate::open_meteo::{OpenMeteoForecast, OpenMeteoSource};
use crate::static_source::{StaticForecast, StaticSource};

/// The set of upstream sources a deployment talks to.
#[derive(Default)]
pub struct SourceRegistry {
    sources: Vec<(Arc<dyn DataSource>, Duration)>,
    forecast: Option<Arc<dyn ForecastProvider>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source with its timeout. A source with the same id
    /// replaces the earlier one.
    pub fn register(&mut self, source: Arc<dyn DataSource>, timeout: Duration) {
        self.sources.retain(|(s, _)| s.id() != source.id());
        self.sources.push((source, timeout));
    }

    pub fn set_forecast(&mut self, forecast: Arc<dyn ForecastProvider>) {
        self.forecast = Some(forecast);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn DataSource>> {
        self.sources
            .iter()
            .find(|(s, _)| s.id() == id)
            .map(|(s, _)| Arc::clone(s))
    }

    /// Registered source ids, in registration order.
    pub fn list(&self) -> Vec<&str> {
        self.sources.iter().map(|(s, _)| s.id()).collect()
    }

    pub fn forecast(&self) -> Option<Arc<dyn ForecastProvider>> {
        self.forecast.clone()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Build a fusion engine over every registered source.
    pub fn fusion_engine(&self, settings: FusionSettings) -> FusionEngine {
        self.sources
            .iter()
            .fold(FusionEngine::new(settings), |engine, (source, timeout)| {
                engine.add(Arc::clone(source), *timeout)
            })
    }

    /// Fixed demo sources that need no network.
    pub fn offline() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(StaticSource::demo_air()), Duration::from_secs(1));
        registry.register(Arc::new(StaticSource::demo_weather()), Duration::from_secs(1));
        registry.set_forecast(Arc::new(StaticForecast::demo()));
        registry
    }
}

/// Build sources from configuration.
pub fn build_from_config(config: &AppConfig) -> SourceRegistry {
    let mut registry = SourceRegistry::new();
    let om = &config.sources.open_meteo;

    if om.enabled {
        registry.register(
            Arc::new(OpenMeteoSource::air_quality(
                &om.air_quality_url,
                om.air_quality_reliability,
                om.timeout(),
            )),
            om.timeout(),
        );
        registry.register(
            Arc::new(OpenMeteoSource::weather(
                &om.weather_url,
                om.weather_reliability,
                om.timeout(),
            )),
            om.timeout(),
        );

        if config.forecast.enabled {
            let timeout = config.forecast.timeout();
            registry.set_forecast(Arc::new(OpenMeteoForecast::new(
                OpenMeteoSource::air_quality(&om.air_quality_url, om.air_quality_reliability, timeout),
                OpenMeteoSource::weather(&om.weather_url, om.weather_reliability, timeout),
            )));
        }
    }

    for feed in &config.sources.feeds {
        let mut source = JsonFeedSource::new(&feed.id, &feed.url, feed.reliability, feed.timeout());
        if let Some(key) = &feed.api_key {
            source = source.with_api_key(key);
        }
        registry.register(Arc::new(source), feed.timeout());
    }

    info!(sources = ?registry.list(), forecast = registry.forecast.is_some(), "Source registry built");
    registry
}
