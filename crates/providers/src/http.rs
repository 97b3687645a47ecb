//! Shared HTTP plumbing for JSON-speaking upstream sources.

use breathwise_core::error::SourceError;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::time::Duration;
use tracing::warn;

/// Build a client with a request timeout. Falls back to a default client if
/// the TLS backend cannot be initialised with custom settings.
pub(crate) fn client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("breathwise/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Failed to build HTTP client, using defaults");
            reqwest::Client::new()
        })
}

/// Send a request and decode a JSON body, mapping failures to `SourceError`.
pub(crate) async fn send_json(
    source_id: &str,
    request: reqwest::RequestBuilder,
) -> Result<serde_json::Value, SourceError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            SourceError::Timeout(format!("{source_id}: {e}"))
        } else {
            SourceError::Network(format!("{source_id}: {e}"))
        }
    })?;

    let status = response.status().as_u16();
    if !(200..300).contains(&status) {
        let body = response.text().await.unwrap_or_default();
        warn!(source = %source_id, status, body = %body, "Source returned error");
        return Err(SourceError::Api {
            status_code: status,
            message: body,
        });
    }

    response
        .json()
        .await
        .map_err(|e| SourceError::InvalidPayload(format!("{source_id}: {e}")))
}

/// Parse an upstream timestamp. Accepts RFC 3339 and the zone-less
/// `YYYY-MM-DDTHH:MM` form, which is interpreted as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .map(|naive| naive.and_utc())
}
