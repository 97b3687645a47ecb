//! HTTP API v1.
//!
//! Endpoints:
//!
//! - `GET  /v1/risk`: Personalized risk score
//! - `GET  /v1/briefing`: Full briefing with trends and advice
//! - `GET  /v1/snapshot`: Fused environmental snapshot
//! - `GET  /v1/cache/stats`: Snapshot cache counters
//! - `POST /v1/cache/invalidate`: Drop cached snapshots by glob (admin)

use axum::{
    Router,
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Query, State},
    http::{HeaderMap, header},
    response::Json,
    routing::{get, post},
};
use breathwise_admission::AdmissionController;
use breathwise_briefing::BriefingService;
use breathwise_cache::CacheStats;
use breathwise_core::briefing::BriefingRecord;
use breathwise_core::location::Location;
use breathwise_core::risk::RiskScore;
use breathwise_core::snapshot::FusedSnapshot;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::error::ApiError;

// ── State ─────────────────────────────────────────────────────────────────

/// Shared state for the v1 API.
pub struct ApiV1State {
    pub service: Arc<BriefingService>,
    pub admission: Arc<AdmissionController>,
    /// Bearer token for administrative endpoints, if configured.
    pub admin_token: Option<String>,
    /// Bearer tokens that identify API callers for admission control.
    pub bearer_tokens: Vec<String>,
}

pub type SharedApiState = Arc<ApiV1State>;

impl ApiV1State {
    pub fn is_admin(&self, provided: &str) -> bool {
        self.admin_token
            .as_deref()
            .is_some_and(|expected| token_matches(expected, provided))
    }

    /// Index of the configured caller token `provided` matches. Every
    /// configured token is compared.
    pub fn caller_token(&self, provided: &str) -> Option<usize> {
        self.bearer_tokens
            .iter()
            .enumerate()
            .fold(None, |found, (i, expected)| {
                if token_matches(expected, provided) { Some(i) } else { found }
            })
    }
}

/// Constant-time token comparison.
fn token_matches(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

/// The token from an `Authorization: Bearer <token>` header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedApiState) -> Router {
    Router::new()
        .route("/risk", get(risk_handler))
        .route("/briefing", get(briefing_handler))
        .route("/snapshot", get(snapshot_handler))
        .route("/cache/stats", get(cache_stats_handler))
        .route("/cache/invalidate", post(invalidate_handler))
        .with_state(state)
}

// ── Requests ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
pub struct RiskQuery {
    pub lat: f64,
    pub lon: f64,
    pub user: String,
}

#[derive(Debug, Deserialize)]
pub struct BriefingQuery {
    pub lat: f64,
    pub lon: f64,
    pub user: String,
    #[serde(default)]
    pub horizon_hours: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvalidateRequest {
    pub pattern: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvalidateResponse {
    pub removed: usize,
}

fn query<T>(q: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    q.map(|Query(v)| v).map_err(|e| ApiError::invalid(e.body_text()))
}

fn location(lat: f64, lon: f64) -> Result<Location, ApiError> {
    Location::checked(lat, lon).map_err(|e| ApiError::Domain(e.into()))
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn risk_handler(
    State(state): State<SharedApiState>,
    q: Result<Query<RiskQuery>, QueryRejection>,
) -> Result<Json<RiskScore>, ApiError> {
    let q = query(q)?;
    let loc = location(q.lat, q.lon)?;
    let score = state.service.risk(&loc, &q.user).await?;
    Ok(Json(score))
}

async fn briefing_handler(
    State(state): State<SharedApiState>,
    q: Result<Query<BriefingQuery>, QueryRejection>,
) -> Result<Json<BriefingRecord>, ApiError> {
    let q = query(q)?;
    let loc = location(q.lat, q.lon)?;
    let record = state.service.briefing(&loc, &q.user, q.horizon_hours).await?;
    Ok(Json(record))
}

async fn snapshot_handler(
    State(state): State<SharedApiState>,
    q: Result<Query<LocationQuery>, QueryRejection>,
) -> Result<Json<FusedSnapshot>, ApiError> {
    let q = query(q)?;
    let loc = location(q.lat, q.lon)?;
    let snapshot = state.service.snapshot(&loc).await?;
    Ok(Json(snapshot.as_ref().clone()))
}

async fn cache_stats_handler(State(state): State<SharedApiState>) -> Json<CacheStats> {
    Json(state.service.cache().stats())
}

/// `POST /v1/cache/invalidate`: requires `Authorization: Bearer <admin
/// token>` when an admin token is configured.
async fn invalidate_handler(
    State(state): State<SharedApiState>,
    headers: HeaderMap,
    body: Result<Json<InvalidateRequest>, JsonRejection>,
) -> Result<Json<InvalidateResponse>, ApiError> {
    if state.admin_token.is_some() && !bearer_token(&headers).is_some_and(|token| state.is_admin(token)) {
        warn!("Unauthorized cache invalidation attempt");
        return Err(ApiError::Unauthorized(
            "missing or invalid admin bearer token".into(),
        ));
    }

    let Json(req) = body.map_err(|e| ApiError::invalid(e.body_text()))?;
    let removed = state.service.cache().invalidate(&req.pattern)?;
    info!(pattern = %req.pattern, removed, "Cache invalidated");
    Ok(Json(InvalidateResponse { removed }))
}
