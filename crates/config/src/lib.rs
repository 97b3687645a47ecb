//! Configuration loading, validation, and management for Breathwise.
//!
//! Loads configuration from `~/.breathwise/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use breathwise_core::metric::MetricKind;
use breathwise_core::profile::HealthProfile;
use breathwise_core::recommendation::{ApplicabilityBands, Category};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.breathwise/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Upstream data sources
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Forecast provider settings
    #[serde(default)]
    pub forecast: ForecastConfig,

    /// Multi-source consensus settings
    #[serde(default)]
    pub fusion: FusionConfig,

    /// Snapshot cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Risk model parameters
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Recommendation selection settings
    #[serde(default)]
    pub content: ContentConfig,

    /// Briefing assembly settings
    #[serde(default)]
    pub briefing: BriefingConfig,

    /// Per-caller request budgets
    #[serde(default)]
    pub admission: AdmissionConfig,

    /// Static health profiles served by the built-in profile store
    #[serde(default)]
    pub profiles: Vec<HealthProfile>,
}

fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

// ── Gateway ───────────────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Bearer token required for administrative endpoints. When unset,
    /// administrative endpoints are only rate limited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_token: Option<String>,

    /// Bearer tokens that identify API callers. A request carrying one is
    /// rate limited per token; any other request is limited per peer
    /// address.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bearer_tokens: Vec<String>,

    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

fn default_port() -> u16 {
    42618
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_cors_origin() -> String {
    "http://localhost:8080".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            admin_token: None,
            bearer_tokens: Vec::new(),
            cors_origin: default_cors_origin(),
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("port", &self.port)
            .field("host", &self.host)
            .field("admin_token", &redact(&self.admin_token))
            .field("bearer_tokens", &format!("[{} REDACTED]", self.bearer_tokens.len()))
            .field("cors_origin", &self.cors_origin)
            .finish()
    }
}

// ── Sources ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub open_meteo: OpenMeteoConfig,

    /// Additional JSON feeds in the Breathwise reading format.
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenMeteoConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_air_quality_url")]
    pub air_quality_url: String,

    #[serde(default = "default_weather_url")]
    pub weather_url: String,

    #[serde(default = "default_air_quality_reliability")]
    pub air_quality_reliability: f64,

    #[serde(default = "default_weather_reliability")]
    pub weather_reliability: f64,

    #[serde(default = "default_source_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_air_quality_url() -> String {
    "https://air-quality-api.open-meteo.com/v1/air-quality".into()
}
fn default_weather_url() -> String {
    "https://api.open-meteo.com/v1/forecast".into()
}
fn default_air_quality_reliability() -> f64 {
    0.8
}
fn default_weather_reliability() -> f64 {
    0.9
}
fn default_source_timeout_ms() -> u64 {
    2_500
}

impl Default for OpenMeteoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            air_quality_url: default_air_quality_url(),
            weather_url: default_weather_url(),
            air_quality_reliability: default_air_quality_reliability(),
            weather_reliability: default_weather_reliability(),
            timeout_ms: default_source_timeout_ms(),
        }
    }
}

impl OpenMeteoConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// A generic JSON feed. `url` may contain `{lat}` and `{lon}` placeholders.
#[derive(Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub id: String,
    pub url: String,

    #[serde(default = "default_feed_reliability")]
    pub reliability: f64,

    #[serde(default = "default_source_timeout_ms")]
    pub timeout_ms: u64,

    /// Sent as a bearer token when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_feed_reliability() -> f64 {
    0.7
}

impl FeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl std::fmt::Debug for FeedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedConfig")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("reliability", &self.reliability)
            .field("timeout_ms", &self.timeout_ms)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_horizon_hours")]
    pub default_horizon_hours: u32,

    #[serde(default = "default_max_horizon_hours")]
    pub max_horizon_hours: u32,

    #[serde(default = "default_source_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_horizon_hours() -> u32 {
    6
}
fn default_max_horizon_hours() -> u32 {
    72
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_horizon_hours: default_horizon_hours(),
            max_horizon_hours: default_max_horizon_hours(),
            timeout_ms: default_source_timeout_ms(),
        }
    }
}

impl ForecastConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ── Fusion ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Upper bound on one whole fusion, regardless of per-source timeouts.
    #[serde(default = "default_aggregate_timeout_ms")]
    pub aggregate_timeout_ms: u64,

    /// Relative spread above which sources are considered to disagree.
    #[serde(default = "default_divergence_threshold")]
    pub divergence_threshold: f64,

    /// Confidence multiplier when only one source reported a metric.
    #[serde(default = "default_single_source_factor")]
    pub single_source_factor: f64,

    /// Confidence multiplier when sources disagreed.
    #[serde(default = "default_divergence_factor")]
    pub divergence_factor: f64,

    /// Metrics every snapshot carries a slot for.
    #[serde(default = "default_tracked_metrics")]
    pub tracked_metrics: Vec<MetricKind>,
}

fn default_aggregate_timeout_ms() -> u64 {
    4_000
}
fn default_divergence_threshold() -> f64 {
    0.25
}
fn default_single_source_factor() -> f64 {
    0.6
}
fn default_divergence_factor() -> f64 {
    0.7
}
fn default_tracked_metrics() -> Vec<MetricKind> {
    MetricKind::ALL.to_vec()
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            aggregate_timeout_ms: default_aggregate_timeout_ms(),
            divergence_threshold: default_divergence_threshold(),
            single_source_factor: default_single_source_factor(),
            divergence_factor: default_divergence_factor(),
            tracked_metrics: default_tracked_metrics(),
        }
    }
}

impl FusionConfig {
    pub fn aggregate_timeout(&self) -> Duration {
        Duration::from_millis(self.aggregate_timeout_ms)
    }
}

// ── Cache ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Grid size in degrees used to share entries between nearby callers.
    #[serde(default = "default_grid_precision_deg")]
    pub grid_precision_deg: f64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    600
}
fn default_grid_precision_deg() -> f64 {
    0.01
}
fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            grid_precision_deg: default_grid_precision_deg(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

// ── Scoring ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Base weight per metric, applied to its 0–100 sub-score.
    #[serde(default = "default_weights")]
    pub weights: BTreeMap<MetricKind, f64>,

    /// Weight multiplier for metrics the user lists as triggers.
    #[serde(default = "default_trigger_multiplier")]
    pub trigger_multiplier: f64,

    #[serde(default)]
    pub severity: SeverityMultipliers,

    /// Pairs of metrics whose joint elevation adds a super-additive bonus.
    #[serde(default = "default_synergy_rules")]
    pub synergy: Vec<SynergyRule>,

    #[serde(default)]
    pub recency: RecencyConfig,
}

fn default_weights() -> BTreeMap<MetricKind, f64> {
    BTreeMap::from([
        (MetricKind::Pm25, 0.60),
        (MetricKind::Pm10, 0.35),
        (MetricKind::Ozone, 0.50),
        (MetricKind::No2, 0.30),
        (MetricKind::So2, 0.25),
        (MetricKind::Co, 0.20),
        (MetricKind::Temperature, 0.40),
        (MetricKind::Humidity, 0.15),
        (MetricKind::WindSpeed, 0.10),
        (MetricKind::UvIndex, 0.20),
    ])
}
fn default_trigger_multiplier() -> f64 {
    2.0
}

fn default_synergy_rules() -> Vec<SynergyRule> {
    vec![
        SynergyRule {
            name: "heat_ozone".into(),
            first: MetricKind::Temperature,
            first_threshold: 30.0,
            second: MetricKind::Ozone,
            second_threshold: 70.0,
            coefficient: 0.30,
        },
        SynergyRule {
            name: "humid_particulate".into(),
            first: MetricKind::Humidity,
            first_threshold: 70.0,
            second: MetricKind::Pm25,
            second_threshold: 35.4,
            coefficient: 0.20,
        },
        SynergyRule {
            name: "heat_particulate".into(),
            first: MetricKind::Temperature,
            first_threshold: 30.0,
            second: MetricKind::Pm25,
            second_threshold: 35.4,
            coefficient: 0.20,
        },
        SynergyRule {
            name: "ozone_no2".into(),
            first: MetricKind::Ozone,
            first_threshold: 70.0,
            second: MetricKind::No2,
            second_threshold: 100.0,
            coefficient: 0.15,
        },
    ]
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: default_weights(),
            trigger_multiplier: default_trigger_multiplier(),
            severity: SeverityMultipliers::default(),
            synergy: default_synergy_rules(),
            recency: RecencyConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityMultipliers {
    /// Applied when the profile lists no conditions.
    #[serde(default = "default_severity_none")]
    pub none: f64,
    #[serde(default = "default_severity_mild")]
    pub mild: f64,
    #[serde(default = "default_severity_moderate")]
    pub moderate: f64,
    #[serde(default = "default_severity_severe")]
    pub severe: f64,
}

fn default_severity_none() -> f64 {
    1.0
}
fn default_severity_mild() -> f64 {
    1.1
}
fn default_severity_moderate() -> f64 {
    1.3
}
fn default_severity_severe() -> f64 {
    1.5
}

impl Default for SeverityMultipliers {
    fn default() -> Self {
        Self {
            none: default_severity_none(),
            mild: default_severity_mild(),
            moderate: default_severity_moderate(),
            severe: default_severity_severe(),
        }
    }
}

/// Compound exposure: when both metrics exceed their thresholds (canonical
/// units), `coefficient * min(sub_score_first, sub_score_second)` is added
/// on top of their individual contributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynergyRule {
    pub name: String,
    pub first: MetricKind,
    pub first_threshold: f64,
    pub second: MetricKind,
    pub second_threshold: f64,
    pub coefficient: f64,
}

/// How data age discounts score confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecencyConfig {
    /// Data younger than this keeps full confidence.
    #[serde(default = "default_fresh_minutes")]
    pub fresh_minutes: u64,
    /// Data this old or older gets `floor`.
    #[serde(default = "default_stale_minutes")]
    pub stale_minutes: u64,
    #[serde(default = "default_recency_floor")]
    pub floor: f64,
}

fn default_fresh_minutes() -> u64 {
    60
}
fn default_stale_minutes() -> u64 {
    360
}
fn default_recency_floor() -> f64 {
    0.5
}

impl Default for RecencyConfig {
    fn default() -> Self {
        Self {
            fresh_minutes: default_fresh_minutes(),
            stale_minutes: default_stale_minutes(),
            floor: default_recency_floor(),
        }
    }
}

// ── Content ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    #[serde(default)]
    pub bands: ApplicabilityBands,

    /// Items to pick per category, in order.
    #[serde(default = "default_budget")]
    pub budget: Vec<CategoryQuota>,

    /// Per-user recency state is dropped after this much inactivity.
    #[serde(default = "default_recency_idle_secs")]
    pub recency_idle_secs: u64,

    /// JSON file with a custom recommendation pool. The built-in pool is
    /// used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryQuota {
    pub category: Category,
    pub count: usize,
}

fn default_budget() -> Vec<CategoryQuota> {
    vec![
        CategoryQuota {
            category: Category::Actionable,
            count: 2,
        },
        CategoryQuota {
            category: Category::Educational,
            count: 1,
        },
    ]
}
fn default_recency_idle_secs() -> u64 {
    86_400
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            bands: ApplicabilityBands::default(),
            budget: default_budget(),
            recency_idle_secs: default_recency_idle_secs(),
            pool_path: None,
        }
    }
}

impl ContentConfig {
    pub fn recency_idle(&self) -> Duration {
        Duration::from_secs(self.recency_idle_secs)
    }
}

// ── Briefing ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BriefingConfig {
    /// Changes within ± this many canonical units are "stable".
    #[serde(default = "default_deadband")]
    pub trend_deadband: f64,

    /// Per-metric deadbands for metrics whose canonical scale is too small
    /// for `trend_deadband`. Setting this table replaces the defaults.
    #[serde(default = "default_deadband_overrides")]
    pub deadband_overrides: BTreeMap<MetricKind, f64>,

    /// Smoothing factor for the per-location historical baseline.
    #[serde(default = "default_baseline_alpha")]
    pub baseline_alpha: f64,

    /// A location's baseline is dropped after this long without a new
    /// snapshot.
    #[serde(default = "default_baseline_idle_secs")]
    pub baseline_idle_secs: u64,
}

fn default_deadband() -> f64 {
    5.0
}
fn default_deadband_overrides() -> BTreeMap<MetricKind, f64> {
    BTreeMap::from([
        (MetricKind::Co, 0.5),
        (MetricKind::UvIndex, 1.0),
        (MetricKind::WindSpeed, 1.5),
        (MetricKind::Temperature, 2.0),
    ])
}
fn default_baseline_alpha() -> f64 {
    0.3
}
fn default_baseline_idle_secs() -> u64 {
    86_400
}

impl Default for BriefingConfig {
    fn default() -> Self {
        Self {
            trend_deadband: default_deadband(),
            deadband_overrides: default_deadband_overrides(),
            baseline_alpha: default_baseline_alpha(),
            baseline_idle_secs: default_baseline_idle_secs(),
        }
    }
}

impl BriefingConfig {
    pub fn deadband_for(&self, kind: MetricKind) -> f64 {
        self.deadband_overrides
            .get(&kind)
            .copied()
            .unwrap_or(self.trend_deadband)
    }

    pub fn baseline_idle(&self) -> Duration {
        Duration::from_secs(self.baseline_idle_secs)
    }
}

// ── Admission ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Authentication-adjacent and administrative endpoints.
    #[serde(default = "default_auth_budget")]
    pub auth: BudgetConfig,

    /// Cheap reads (cached snapshots, stats).
    #[serde(default = "default_read_budget")]
    pub read: BudgetConfig,

    /// Endpoints that may fan out to upstream providers.
    #[serde(default = "default_compute_budget")]
    pub compute: BudgetConfig,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetConfig {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl BudgetConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

fn default_auth_budget() -> BudgetConfig {
    BudgetConfig {
        max_requests: 10,
        window_secs: 60,
    }
}
fn default_read_budget() -> BudgetConfig {
    BudgetConfig {
        max_requests: 120,
        window_secs: 60,
    }
}
fn default_compute_budget() -> BudgetConfig {
    BudgetConfig {
        max_requests: 30,
        window_secs: 60,
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            auth: default_auth_budget(),
            read: default_read_budget(),
            compute: default_compute_budget(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from the default path, with env var overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(host) = std::env::var("BREATHWISE_HOST") {
            self.gateway.host = host;
        }
        if let Ok(port) = std::env::var("BREATHWISE_PORT") {
            self.gateway.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("BREATHWISE_PORT is not a port: {port}"))
            })?;
        }
        if let Ok(ttl) = std::env::var("BREATHWISE_CACHE_TTL_SECS") {
            self.cache.ttl_secs = ttl.parse().map_err(|_| {
                ConfigError::ValidationError(format!("BREATHWISE_CACHE_TTL_SECS is not a number: {ttl}"))
            })?;
        }
        if let Ok(token) = std::env::var("BREATHWISE_ADMIN_TOKEN") {
            self.gateway.admin_token = Some(token);
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".breathwise")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::ValidationError(msg));

        if self.gateway.bearer_tokens.iter().any(|t| t.trim().is_empty()) {
            return invalid("gateway.bearer_tokens must not contain empty tokens".into());
        }

        if self.cache.ttl_secs == 0 {
            return invalid("cache.ttl_secs must be > 0".into());
        }
        if !(self.cache.grid_precision_deg > 0.0 && self.cache.grid_precision_deg <= 1.0) {
            return invalid("cache.grid_precision_deg must be in (0, 1]".into());
        }

        let f = &self.fusion;
        if f.aggregate_timeout_ms == 0 {
            return invalid("fusion.aggregate_timeout_ms must be > 0".into());
        }
        if !(f.divergence_threshold > 0.0) {
            return invalid("fusion.divergence_threshold must be > 0".into());
        }
        for (name, v) in [
            ("single_source_factor", f.single_source_factor),
            ("divergence_factor", f.divergence_factor),
        ] {
            if !(v > 0.0 && v < 1.0) {
                return invalid(format!("fusion.{name} must be in (0, 1)"));
            }
        }
        if f.tracked_metrics.is_empty() {
            return invalid("fusion.tracked_metrics must not be empty".into());
        }

        let s = &self.scoring;
        if s.weights.values().any(|w| !w.is_finite() || *w < 0.0) {
            return invalid("scoring.weights must be finite and >= 0".into());
        }
        if !(s.trigger_multiplier >= 1.0 && s.trigger_multiplier.is_finite()) {
            return invalid("scoring.trigger_multiplier must be >= 1".into());
        }
        let sev = &s.severity;
        if [sev.none, sev.mild, sev.moderate, sev.severe]
            .iter()
            .any(|m| !m.is_finite() || *m <= 0.0)
        {
            return invalid("scoring.severity multipliers must be > 0".into());
        }
        for rule in &s.synergy {
            if rule.first == rule.second {
                return invalid(format!("synergy rule '{}' pairs a metric with itself", rule.name));
            }
            if !(rule.coefficient >= 0.0 && rule.coefficient.is_finite()) {
                return invalid(format!(
                    "synergy rule '{}' coefficient must be finite and >= 0",
                    rule.name
                ));
            }
            if !(rule.first_threshold.is_finite() && rule.second_threshold.is_finite()) {
                return invalid(format!("synergy rule '{}' thresholds must be finite", rule.name));
            }
        }
        if s.recency.fresh_minutes >= s.recency.stale_minutes {
            return invalid("scoring.recency.fresh_minutes must be < stale_minutes".into());
        }
        if !(s.recency.floor > 0.0 && s.recency.floor <= 1.0) {
            return invalid("scoring.recency.floor must be in (0, 1]".into());
        }

        self.content
            .bands
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("content.bands: {e}")))?;
        if self.content.budget.iter().all(|q| q.count == 0) {
            return invalid("content.budget must request at least one item".into());
        }

        if !(self.briefing.trend_deadband >= 0.0 && self.briefing.trend_deadband.is_finite()) {
            return invalid("briefing.trend_deadband must be finite and >= 0".into());
        }
        if self
            .briefing
            .deadband_overrides
            .values()
            .any(|d| !(d.is_finite() && *d >= 0.0))
        {
            return invalid("briefing.deadband_overrides must be finite and >= 0".into());
        }
        if self.briefing.baseline_idle_secs == 0 {
            return invalid("briefing.baseline_idle_secs must be > 0".into());
        }
        if !(self.briefing.baseline_alpha > 0.0 && self.briefing.baseline_alpha <= 1.0) {
            return invalid("briefing.baseline_alpha must be in (0, 1]".into());
        }

        for (name, b) in [
            ("auth", &self.admission.auth),
            ("read", &self.admission.read),
            ("compute", &self.admission.compute),
        ] {
            if b.max_requests == 0 || b.window_secs == 0 {
                return invalid(format!("admission.{name} budget must be non-zero"));
            }
        }

        let om = &self.sources.open_meteo;
        for r in [om.air_quality_reliability, om.weather_reliability]
            .into_iter()
            .chain(self.sources.feeds.iter().map(|f| f.reliability))
        {
            if !(r > 0.0 && r <= 1.0) {
                return invalid("source reliability must be in (0, 1]".into());
            }
        }

        if self.forecast.default_horizon_hours > self.forecast.max_horizon_hours {
            return invalid("forecast.default_horizon_hours exceeds max_horizon_hours".into());
        }

        for p in &self.profiles {
            p.validate()
                .map_err(|e| ConfigError::ValidationError(format!("profile '{}': {e}", p.user_ref)))?;
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `config` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
