//! HTTP API gateway for Breathwise.
//!
//! Exposes the health check and the v1 API for risk scores, briefings,
//! snapshots, and cache administration.
//!
//! Built on Axum for high performance async HTTP.

pub mod api_v1;
pub mod error;

use axum::extract::{ConnectInfo, DefaultBodyLimit};
use axum::{
    Router,
    extract::State,
    http::{HeaderValue, Method, header},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::get,
};
use breathwise_admission::{AdmissionController, EndpointClass, RequestKind};
use breathwise_briefing::BriefingService;
use breathwise_config::AppConfig;
use breathwise_providers::{SourceRegistry, StaticProfileStore};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

pub use api_v1::{ApiV1State, SharedApiState};
pub use error::ApiError;

/// Build the full router: `/health` plus the v1 API under `/v1`.
///
/// Layers applied:
/// - Per-caller admission control by endpoint class (health is exempt)
/// - CORS restricted to the configured origin
/// - Request body size limit (64 KB)
/// - HTTP trace logging
pub fn build_router(state: SharedApiState, cors_origin: &str) -> Router {
    let cors = match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new().allow_origin(AllowOrigin::exact(origin)),
        Err(_) => {
            warn!(origin = %cors_origin, "Invalid CORS origin, cross-origin requests disabled");
            CorsLayer::new()
        }
    }
    .allow_methods([Method::GET, Method::POST])
    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", api_v1::v1_router(state.clone()))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(middleware::from_fn_with_state(state, admission_middleware))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig, registry: SourceRegistry) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let profiles = Arc::new(StaticProfileStore::new(config.profiles.clone()));
    let service = Arc::new(BriefingService::from_config(&config, &registry, profiles)?);
    let admission = Arc::new(AdmissionController::new(&config.admission));

    service.spawn_sweepers();
    Arc::clone(&admission).spawn_sweeper();

    let state = Arc::new(ApiV1State {
        service,
        admission,
        admin_token: config.gateway.admin_token.clone(),
        bearer_tokens: config.gateway.bearer_tokens.clone(),
    });
    let app = build_router(state, &config.gateway.cors_origin);

    info!(
        addr = %addr,
        sources = registry.len(),
        forecast = registry.forecast().is_some(),
        profiles = config.profiles.len(),
        "Gateway starting"
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

// --- Admission ---

/// Which budget a path draws from. `None` means exempt.
fn endpoint_class(path: &str) -> Option<EndpointClass> {
    match path {
        "/health" => None,
        "/v1/cache/invalidate" => Some(EndpointClass::Auth),
        "/v1/risk" | "/v1/briefing" => Some(EndpointClass::Compute),
        _ => Some(EndpointClass::Read),
    }
}

/// Who a request is charged to. A bearer token only identifies the caller
/// when it is a configured credential; anything else is charged to the
/// peer address, so rotating junk headers buys no extra budget.
fn caller_key(state: &ApiV1State, req: &axum::extract::Request) -> String {
    if let Some(token) = api_v1::bearer_token(req.headers()) {
        if state.is_admin(token) {
            return "admin".into();
        }
        if let Some(index) = state.caller_token(token) {
            return format!("token:{index}");
        }
    }
    match req.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => format!("ip:{}", addr.ip()),
        None => "anonymous".into(),
    }
}

/// Admission middleware: rejects over-budget requests with 429 and
/// `Retry-After` before any work is done.
async fn admission_middleware(
    State(state): State<SharedApiState>,
    req: axum::extract::Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(class) = endpoint_class(req.uri().path()) else {
        return Ok(next.run(req).await);
    };

    let caller = caller_key(&state, &req);
    let kind = if req.method() == Method::OPTIONS {
        RequestKind::Preflight
    } else {
        RequestKind::Regular
    };

    let decision = state.admission.check(&caller, class, kind);
    if !decision.allowed {
        return Err(ApiError::rate_limited(decision.retry_after_secs().unwrap_or(1)));
    }

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    Ok(response)
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use breathwise_config::BudgetConfig;
    use breathwise_core::profile::HealthProfile;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state(compute_budget: u32) -> SharedApiState {
        let mut config = AppConfig::default();
        config.admission.compute = BudgetConfig {
            max_requests: compute_budget,
            window_secs: 60,
        };
        let profiles = Arc::new(StaticProfileStore::new([HealthProfile::new("u1")]));
        Arc::new(ApiV1State {
            service: Arc::new(
                BriefingService::from_config(&config, &SourceRegistry::offline(), profiles).unwrap(),
            ),
            admission: Arc::new(AdmissionController::new(&config.admission)),
            admin_token: Some("root".into()),
            bearer_tokens: vec!["a".into(), "b".into()],
        })
    }

    fn from_peer(mut req: Request<Body>, ip: [u8; 4], port: u16) -> Request<Body> {
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((ip, port))));
        req
    }

    fn get(uri: &str, caller: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("Authorization", caller)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = build_router(test_state(1), "http://localhost:8080");
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_is_exempt_from_admission() {
        let state = test_state(1);
        for _ in 0..5 {
            let response = build_router(state.clone(), "http://localhost:8080")
                .oneshot(get("/health", "Bearer a"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn compute_budget_rejects_with_retry_after() {
        let state = test_state(2);
        let uri = "/v1/risk?lat=40.7&lon=-74.0&user=u1";

        for remaining in ["1", "0"] {
            let response = build_router(state.clone(), "http://localhost:8080")
                .oneshot(get(uri, "Bearer a"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()["x-ratelimit-remaining"], remaining);
        }

        let response = build_router(state.clone(), "http://localhost:8080")
            .oneshot(get(uri, "Bearer a"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["kind"], "rate_limited");
        assert!(json["error"]["retry_after_secs"].as_u64().unwrap() >= 1);

        // Another caller and another class still get through.
        let response = build_router(state.clone(), "http://localhost:8080")
            .oneshot(get(uri, "Bearer b"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let response = build_router(state, "http://localhost:8080")
            .oneshot(get("/v1/snapshot?lat=40.7&lon=-74.0", "Bearer a"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unrecognised_tokens_share_the_peer_budget() {
        let state = test_state(1);
        let uri = "/v1/risk?lat=40.7&lon=-74.0&user=u1";

        let mut admitted = 0;
        for i in 0..20u16 {
            let req = from_peer(get(uri, &format!("Bearer junk{i}")), [203, 0, 113, 7], 40_000 + i);
            let response = build_router(state.clone(), "http://localhost:8080")
                .oneshot(req)
                .await
                .unwrap();
            if response.status() == StatusCode::OK {
                admitted += 1;
            } else {
                assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
            }
        }
        assert_eq!(admitted, 1);
        assert_eq!(state.admission.tracked(), 1);

        // Another address has its own budget.
        let req = from_peer(get(uri, "Bearer junk0"), [198, 51, 100, 1], 40_000);
        let response = build_router(state.clone(), "http://localhost:8080")
            .oneshot(req)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn configured_token_is_charged_separately_from_its_peer() {
        let state = test_state(1);
        let uri = "/v1/risk?lat=40.7&lon=-74.0&user=u1";
        let peer = [203, 0, 113, 9];

        let anonymous = from_peer(
            Request::builder().uri(uri).body(Body::empty()).unwrap(),
            peer,
            1,
        );
        let response = build_router(state.clone(), "http://localhost:8080")
            .oneshot(anonymous)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        for caller in ["Bearer a", "Bearer root"] {
            let response = build_router(state.clone(), "http://localhost:8080")
                .oneshot(from_peer(get(uri, caller), peer, 2))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{caller}");
        }

        let response = build_router(state.clone(), "http://localhost:8080")
            .oneshot(from_peer(get(uri, "Bearer a"), peer, 3))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn classes_by_path() {
        assert_eq!(endpoint_class("/health"), None);
        assert_eq!(endpoint_class("/v1/briefing"), Some(EndpointClass::Compute));
        assert_eq!(endpoint_class("/v1/cache/stats"), Some(EndpointClass::Read));
        assert_eq!(endpoint_class("/v1/cache/invalidate"), Some(EndpointClass::Auth));
    }
}
