//! End-to-end integration tests for the Breathwise risk engine.
//!
//! These tests exercise the full pipeline from upstream readings to
//! scores, briefings, and HTTP responses, with fixture sources in place of
//! the network.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use breathwise_admission::AdmissionController;
use breathwise_briefing::BriefingService;
use breathwise_config::{AppConfig, BudgetConfig};
use breathwise_core::error::SourceError;
use breathwise_core::location::Location;
use breathwise_core::metric::{MetricKind, Unit};
use breathwise_core::profile::{HealthProfile, Severity};
use breathwise_core::reading::EnvironmentalReading;
use breathwise_core::risk::FactorSource;
use breathwise_core::source::{DataSource, ProfileStore};
use breathwise_providers::{FusionEngine, FusionSettings, SourceRegistry, StaticProfileStore, StaticSource};

// ── Mock Sources ─────────────────────────────────────────────────────────

/// Wraps a fixture source and counts upstream calls.
struct CountingSource {
    inner: StaticSource,
    call_count: Mutex<usize>,
}

impl CountingSource {
    fn new(inner: StaticSource) -> Self {
        Self {
            inner,
            call_count: Mutex::new(0),
        }
    }

    fn calls(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl DataSource for CountingSource {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn reliability(&self) -> f64 {
        self.inner.reliability()
    }

    async fn fetch(&self, location: &Location) -> Result<Vec<EnvironmentalReading>, SourceError> {
        *self.call_count.lock().unwrap() += 1;
        self.inner.fetch(location).await
    }
}

/// A source whose upstream is down.
struct DownSource;

#[async_trait::async_trait]
impl DataSource for DownSource {
    fn id(&self) -> &str {
        "down"
    }

    fn reliability(&self) -> f64 {
        0.9
    }

    async fn fetch(&self, _location: &Location) -> Result<Vec<EnvironmentalReading>, SourceError> {
        Err(SourceError::Api {
            status_code: 503,
            message: "maintenance".into(),
        })
    }
}

fn severe_pm25_profile() -> HealthProfile {
    HealthProfile::new("severe")
        .with_condition("asthma", Severity::Severe)
        .with_trigger(MetricKind::Pm25)
}

fn profiles() -> Arc<dyn ProfileStore> {
    Arc::new(StaticProfileStore::new([
        severe_pm25_profile(),
        HealthProfile::new("healthy"),
    ]))
}

fn service_over(config: &AppConfig, sources: Vec<Arc<dyn DataSource>>) -> BriefingService {
    let fusion = sources.into_iter().fold(
        FusionEngine::new(FusionSettings::from(&config.fusion)),
        |engine, source| engine.add(source, Duration::from_secs(1)),
    );
    BriefingService::new(config, fusion, profiles())
}

fn here() -> Location {
    Location::new(40.7128, -74.0060)
}

// ── E2E: Personalized Scoring ───────────────────────────────────────────

#[tokio::test]
async fn e2e_very_unhealthy_pm25_dominates_for_sensitive_user() {
    let smoke = StaticSource::new("smoke", 0.9).with_reading(
        MetricKind::Pm25,
        200.0,
        Unit::MicrogramsPerCubicMeter,
    );
    let service = service_over(&AppConfig::default(), vec![Arc::new(smoke)]);

    let score = service.risk(&here(), "severe").await.unwrap();

    assert!(score.value > 80.0, "score was {}", score.value);
    assert!(score.value <= 100.0);
    let dominant = score.dominant_factor().unwrap();
    assert_eq!(
        dominant.source,
        FactorSource::Metric {
            metric: MetricKind::Pm25
        }
    );
    assert!(dominant.trigger);

    let unavailable = score.unavailable_metrics();
    assert_eq!(unavailable.len(), MetricKind::ALL.len() - 1);
    assert!(!unavailable.contains(&MetricKind::Pm25));
}

#[tokio::test]
async fn e2e_same_air_scores_lower_for_healthy_user() {
    let service = service_over(
        &AppConfig::default(),
        vec![Arc::new(StaticSource::demo_air()), Arc::new(StaticSource::demo_weather())],
    );
    let sensitive = service.risk(&here(), "severe").await.unwrap();
    let healthy = service.risk(&here(), "healthy").await.unwrap();
    assert!(sensitive.value > healthy.value);
    assert!(healthy.unavailable_metrics().is_empty());
}

// ── E2E: Fusion ─────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_single_responder_keeps_value_with_lower_confidence() {
    let air = StaticSource::new("air", 0.9).with_reading(
        MetricKind::Ozone,
        60.0,
        Unit::PartsPerBillion,
    );
    let service = service_over(&AppConfig::default(), vec![Arc::new(air), Arc::new(DownSource)]);

    let snapshot = service.snapshot(&here()).await.unwrap();
    let ozone = snapshot.consensus(MetricKind::Ozone).unwrap();
    assert_eq!(ozone.value, 60.0);
    assert!(ozone.confidence < 0.9);
    assert_eq!(snapshot.sources_queried, 2);
    assert_eq!(snapshot.sources_responded, 1);
}

#[tokio::test]
async fn e2e_total_source_loss_is_data_unavailable() {
    let service = service_over(&AppConfig::default(), vec![Arc::new(DownSource)]);
    let err = service.risk(&here(), "healthy").await.unwrap_err();
    assert_eq!(err.kind(), "data_unavailable");
}

// ── E2E: Cache TTL ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn e2e_cache_serves_until_ttl_then_refuses() {
    let mut config = AppConfig::default();
    config.cache.ttl_secs = 600;
    let source = Arc::new(CountingSource::new(StaticSource::demo_air()));
    let service = service_over(&config, vec![source.clone()]);

    service.snapshot(&here()).await.unwrap();
    tokio::time::advance(Duration::from_secs(599)).await;
    service.snapshot(&here()).await.unwrap();
    assert_eq!(source.calls(), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    service.snapshot(&here()).await.unwrap();
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn e2e_nearby_points_share_a_cache_cell() {
    let source = Arc::new(CountingSource::new(StaticSource::demo_air()));
    let service = service_over(&AppConfig::default(), vec![source.clone()]);

    service.snapshot(&Location::new(40.7128, -74.0060)).await.unwrap();
    service.snapshot(&Location::new(40.7131, -74.0062)).await.unwrap();
    assert_eq!(source.calls(), 1);

    service.snapshot(&Location::new(41.5, -74.0)).await.unwrap();
    assert_eq!(source.calls(), 2);
}

// ── E2E: Briefing Pipeline ──────────────────────────────────────────────

#[tokio::test]
async fn e2e_offline_briefing_is_complete() {
    let config = AppConfig::default();
    let service = BriefingService::from_config(&config, &SourceRegistry::offline(), profiles()).unwrap();

    let record = service.briefing(&here(), "severe", Some(6)).await.unwrap();

    assert!(!record.partial_data);
    assert!(record.unavailable_metrics.is_empty());
    assert_eq!(record.trends.len(), MetricKind::ALL.len());
    assert_eq!(record.recommendations.len(), 3);

    let temp = record.conditions.temperature.unwrap();
    assert_eq!(temp.metric.value, 18.0);
    assert_eq!(temp.imperial.value, 64.4);
    assert!(record.summary.contains(record.risk.band.label()));
}

#[tokio::test]
async fn e2e_comfortable_day_gets_no_thermal_extremes() {
    let weather = StaticSource::new("weather", 0.9)
        .with_reading(MetricKind::Temperature, 68.0, Unit::Fahrenheit)
        .with_reading(MetricKind::WindSpeed, 3.0, Unit::MetersPerSecond);
    let service = service_over(&AppConfig::default(), vec![Arc::new(weather)]);

    for _ in 0..10 {
        let record = service.briefing(&here(), "healthy", None).await.unwrap();
        for item in &record.recommendations {
            assert!(!item.id.starts_with("cold-"), "{}", item.id);
            assert!(!item.id.starts_with("heat-"), "{}", item.id);
        }
    }
}

#[tokio::test]
async fn e2e_recommendations_cycle_before_repeating() {
    let service =
        BriefingService::from_config(&AppConfig::default(), &SourceRegistry::offline(), profiles()).unwrap();

    // Three educational items apply to the demo conditions.
    let mut seen = Vec::new();
    for _ in 0..3 {
        let record = service.briefing(&here(), "healthy", None).await.unwrap();
        for item in record.recommendations.iter().filter(|i| i.id.starts_with("edu-")) {
            assert!(!seen.contains(&item.id), "{} repeated early", item.id);
            seen.push(item.id.clone());
        }
    }
    assert_eq!(seen.len(), 3);
}

// ── E2E: Gateway API (router only, no server) ──────────────────────────

fn gateway_state(compute_budget: u32) -> breathwise_gateway::SharedApiState {
    let mut config = AppConfig::default();
    config.admission.compute = BudgetConfig {
        max_requests: compute_budget,
        window_secs: 60,
    };
    Arc::new(breathwise_gateway::ApiV1State {
        service: Arc::new(
            BriefingService::from_config(&config, &SourceRegistry::offline(), profiles()).unwrap(),
        ),
        admission: Arc::new(AdmissionController::new(&config.admission)),
        admin_token: None,
        bearer_tokens: Vec::new(),
    })
}

#[tokio::test]
async fn e2e_gateway_admission_rolls_over() {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    tokio::time::pause();
    let state = gateway_state(3);
    let request = || {
        Request::builder()
            .uri("/v1/briefing?lat=40.7128&lon=-74.0060&user=severe")
            .body(Body::empty())
            .unwrap()
    };

    for _ in 0..3 {
        let resp = breathwise_gateway::build_router(state.clone(), "http://localhost:8080")
            .oneshot(request())
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    let resp = breathwise_gateway::build_router(state.clone(), "http://localhost:8080")
        .oneshot(request())
        .await
        .unwrap();
    assert_eq!(resp.status(), 429);
    assert!(resp.headers().contains_key("retry-after"));

    tokio::time::advance(Duration::from_secs(61)).await;
    let resp = breathwise_gateway::build_router(state, "http://localhost:8080")
        .oneshot(request())
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn e2e_gateway_error_bodies_are_structured() {
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    let app = breathwise_gateway::build_router(gateway_state(10), "http://localhost:8080");
    let req = Request::builder()
        .uri("/v1/risk?lat=40.7&lon=-74.0&user=nobody")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), 404);

    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["kind"], "profile_not_found");
    assert!(json["error"]["message"].as_str().unwrap().contains("nobody"));
    assert!(json["error"].get("retry_after_secs").is_none());
}

// ── E2E: Configuration System ───────────────────────────────────────────

#[tokio::test]
async fn e2e_config_defaults_and_validation() {
    let config = AppConfig::default();
    config.validate().unwrap();
    assert_eq!(config.cache.ttl_secs, 600);
    assert!(config.gateway.port > 0);

    let toml_str = toml::to_string_pretty(&config).expect("Config should serialize");
    let reparsed: AppConfig = toml::from_str(&toml_str).expect("Config should parse back");
    assert_eq!(reparsed.gateway.port, config.gateway.port);
    assert_eq!(reparsed.scoring.synergy.len(), config.scoring.synergy.len());

    let mut broken = config.clone();
    broken.content.bands.cold_below_c = 30.0;
    assert!(broken.validate().is_err());
}
