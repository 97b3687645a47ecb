//! Request orchestration.
//!
//! `BriefingService` wires the pipeline together: cached fusion, profile
//! lookup, a bounded forecast fetch, scoring, selection under the user's
//! recency state, and assembly. One instance is shared by every request.

use breathwise_cache::SnapshotCache;
use breathwise_config::{AppConfig, CategoryQuota};
use breathwise_content::{RecencyStore, RecommendationPool, VariationSelector};
use breathwise_core::briefing::{BriefingRecord, Forecast};
use breathwise_core::error::{Error, Result};
use breathwise_core::location::Location;
use breathwise_core::profile::HealthProfile;
use breathwise_core::risk::RiskScore;
use breathwise_core::snapshot::FusedSnapshot;
use breathwise_core::source::{ForecastProvider, ProfileStore};
use breathwise_providers::{FusionEngine, FusionSettings, SourceRegistry};
use breathwise_scoring::RiskScorer;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::assembler::BriefingAssembler;
use crate::baseline::BaselineTracker;

pub struct BriefingService {
    fusion: FusionEngine,
    cache: Arc<SnapshotCache>,
    profiles: Arc<dyn ProfileStore>,
    forecast: Option<Arc<dyn ForecastProvider>>,
    scorer: RiskScorer,
    selector: VariationSelector,
    recency: Arc<RecencyStore>,
    baselines: Arc<BaselineTracker>,
    assembler: BriefingAssembler,
    budget: Vec<CategoryQuota>,
    forecast_timeout: Duration,
    default_horizon_hours: u32,
    max_horizon_hours: u32,
    sweep_interval: Duration,
}

impl BriefingService {
    /// Build a service over an explicit fusion engine and the built-in
    /// recommendation pool. No forecast provider is attached; see
    /// [`with_forecast`](Self::with_forecast).
    pub fn new(config: &AppConfig, fusion: FusionEngine, profiles: Arc<dyn ProfileStore>) -> Self {
        Self {
            fusion,
            cache: Arc::new(SnapshotCache::from_config(&config.cache)),
            profiles,
            forecast: None,
            scorer: RiskScorer::new(config.scoring.clone()),
            selector: VariationSelector::new(RecommendationPool::builtin(), config.content.bands),
            recency: Arc::new(RecencyStore::new(config.content.recency_idle())),
            baselines: Arc::new(BaselineTracker::new(
                config.briefing.baseline_alpha,
                config.cache.grid_precision_deg,
                config.briefing.baseline_idle(),
            )),
            assembler: BriefingAssembler::new(config.briefing.clone()),
            budget: config.content.budget.clone(),
            forecast_timeout: config.forecast.timeout(),
            default_horizon_hours: config.forecast.default_horizon_hours,
            max_horizon_hours: config.forecast.max_horizon_hours,
            sweep_interval: Duration::from_secs(config.cache.sweep_interval_secs),
        }
    }

    /// Build from configuration and a populated source registry. Fails when
    /// a configured recommendation pool cannot be loaded.
    pub fn from_config(
        config: &AppConfig,
        registry: &SourceRegistry,
        profiles: Arc<dyn ProfileStore>,
    ) -> Result<Self> {
        let fusion = registry.fusion_engine(FusionSettings::from(&config.fusion));
        let service = Self::new(config, fusion, profiles)
            .with_selector(VariationSelector::from_config(&config.content)?);
        Ok(match registry.forecast() {
            Some(provider) if config.forecast.enabled => service.with_forecast(provider),
            _ => service,
        })
    }

    pub fn with_forecast(mut self, provider: Arc<dyn ForecastProvider>) -> Self {
        self.forecast = Some(provider);
        self
    }

    pub fn with_selector(mut self, selector: VariationSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    pub fn recency(&self) -> &Arc<RecencyStore> {
        &self.recency
    }

    pub fn fusion(&self) -> &FusionEngine {
        &self.fusion
    }

    pub fn baselines(&self) -> &Arc<BaselineTracker> {
        &self.baselines
    }

    pub fn has_forecast(&self) -> bool {
        self.forecast.is_some()
    }

    /// Start background expiry for the snapshot cache, recency states and
    /// baselines.
    pub fn spawn_sweepers(&self) -> Vec<tokio::task::JoinHandle<()>> {
        vec![
            Arc::clone(&self.cache).spawn_sweeper(self.sweep_interval),
            Arc::clone(&self.recency).spawn_sweeper(self.sweep_interval),
            Arc::clone(&self.baselines).spawn_sweeper(self.sweep_interval),
        ]
    }

    /// The fused snapshot for a location, served from cache when fresh.
    pub async fn snapshot(&self, location: &Location) -> Result<Arc<FusedSnapshot>> {
        location.validate()?;
        let key = self.cache.key_for(location, &self.fusion.settings().tracked);
        let snapshot = self
            .cache
            .get_or_fuse(key, || self.fusion.fuse(location))
            .await;

        if snapshot.is_empty() {
            warn!(%location, queried = snapshot.sources_queried, "No source returned usable readings");
            return Err(Error::DataUnavailable {
                reason: format!("no source returned usable readings for {location}"),
            });
        }
        Ok(snapshot)
    }

    async fn profile(&self, user: &str) -> Result<HealthProfile> {
        let profile = self.profiles.get_health_profile(user).await?;
        debug!(user, conditions = profile.conditions.len(), "Profile loaded");
        Ok(profile)
    }

    /// Score the current conditions for one user.
    pub async fn risk(&self, location: &Location, user: &str) -> Result<RiskScore> {
        location.validate()?;
        let profile = self.profile(user).await?;
        let snapshot = self.snapshot(location).await?;
        let score = self.scorer.score(&snapshot, &profile)?;
        info!(%location, user, score = score.value, band = ?score.band, "Risk scored");
        Ok(score)
    }

    /// Build a full briefing. A missing or failed forecast only degrades
    /// trends to the historical baseline.
    pub async fn briefing(
        &self,
        location: &Location,
        user: &str,
        horizon_hours: Option<u32>,
    ) -> Result<BriefingRecord> {
        location.validate()?;
        let horizon = self.horizon(horizon_hours)?;
        let profile = self.profile(user).await?;

        let (snapshot, forecast) = tokio::join!(self.snapshot(location), self.forecast(location, horizon));
        let snapshot = snapshot?;

        let score = self.scorer.score(&snapshot, &profile)?;
        let baseline = self.baselines.reference_for(&snapshot);

        // Recency only advances once the record is built.
        let record = self.recency.try_with_state(user, |state| {
            let items = self.selector.select(&self.budget, &snapshot, state)?;
            self.assembler.assemble_with_baseline(
                score,
                items,
                &snapshot,
                forecast.as_ref(),
                baseline.as_ref(),
            )
        })?;
        self.baselines.update(&snapshot);

        info!(
            %location,
            user,
            id = %record.id,
            score = record.risk.value,
            partial = record.partial_data,
            "Briefing generated"
        );
        Ok(record)
    }

    fn horizon(&self, requested: Option<u32>) -> Result<u32> {
        match requested {
            None => Ok(self.default_horizon_hours),
            Some(h) if h == 0 || h > self.max_horizon_hours => Err(Error::InvalidRequest(format!(
                "horizon_hours must be between 1 and {}",
                self.max_horizon_hours
            ))),
            Some(h) => Ok(h),
        }
    }

    async fn forecast(&self, location: &Location, horizon_hours: u32) -> Option<Forecast> {
        let provider = self.forecast.as_ref()?;
        let horizon = Duration::from_secs(u64::from(horizon_hours) * 3600);

        match tokio::time::timeout(self.forecast_timeout, provider.fetch_forecast(location, horizon)).await {
            Ok(Ok(readings)) => {
                let forecast = Forecast::from_readings(horizon_hours, &readings);
                if forecast.values.is_empty() {
                    debug!(provider = provider.id(), "Forecast had no usable values");
                    None
                } else {
                    Some(forecast)
                }
            }
            Ok(Err(e)) => {
                warn!(provider = provider.id(), error = %e, "Forecast failed, using baseline");
                None
            }
            Err(_) => {
                warn!(
                    provider = provider.id(),
                    timeout_ms = self.forecast_timeout.as_millis() as u64,
                    "Forecast timed out, using baseline"
                );
                None
            }
        }
    }
}
