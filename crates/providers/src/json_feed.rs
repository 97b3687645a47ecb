//! Generic JSON feed adapter.
//!
//! Any HTTP endpoint that returns readings in the Breathwise wire format can
//! be plugged in through configuration:
//!
//! ```json
//! {"readings": [{"kind": "pm25", "value": 12.5, "unit": "ug/m3",
//!                "observed_at": "2025-06-01T12:00:00Z"}]}
//! ```
//!
//! The URL is a template; `{lat}` and `{lon}` are substituted per request.

use async_trait::async_trait;
use breathwise_core::error::SourceError;
use breathwise_core::location::Location;
use breathwise_core::metric::{MetricKind, Unit};
use breathwise_core::reading::EnvironmentalReading;
use breathwise_core::source::DataSource;
use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::http::{client, parse_timestamp, send_json};

pub struct JsonFeedSource {
    id: String,
    url_template: String,
    reliability: f64,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct FeedPayload {
    readings: Vec<FeedReading>,
}

#[derive(Debug, Deserialize)]
struct FeedReading {
    kind: MetricKind,
    value: f64,
    unit: Unit,
    #[serde(default)]
    observed_at: Option<String>,
}

impl JsonFeedSource {
    pub fn new(
        id: impl Into<String>,
        url_template: impl Into<String>,
        reliability: f64,
        timeout: Duration,
    ) -> Self {
        Self {
            id: id.into(),
            url_template: url_template.into(),
            reliability,
            api_key: None,
            client: client(timeout),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn url_for(&self, location: &Location) -> String {
        self.url_template
            .replace("{lat}", &location.latitude.to_string())
            .replace("{lon}", &location.longitude.to_string())
    }

    fn decode(&self, body: serde_json::Value) -> Result<Vec<EnvironmentalReading>, SourceError> {
        let payload: FeedPayload = serde_json::from_value(body)
            .map_err(|e| SourceError::InvalidPayload(format!("{}: {e}", self.id)))?;

        let fetched_at = Utc::now();
        Ok(payload
            .readings
            .into_iter()
            .map(|r| {
                let observed_at = r
                    .observed_at
                    .as_deref()
                    .and_then(parse_timestamp)
                    .unwrap_or(fetched_at);
                EnvironmentalReading::new(r.kind, r.value, r.unit, &self.id, observed_at, self.reliability)
            })
            .collect())
    }
}

#[async_trait]
impl DataSource for JsonFeedSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn reliability(&self) -> f64 {
        self.reliability
    }

    async fn fetch(&self, location: &Location) -> Result<Vec<EnvironmentalReading>, SourceError> {
        let url = self.url_for(location);
        debug!(source = %self.id, url = %url, "Querying JSON feed");

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let body = send_json(&self.id, request).await?;
        self.decode(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn feed() -> JsonFeedSource {
        JsonFeedSource::new(
            "city-sensors",
            "https://sensors.example.org/v1/near?lat={lat}&lon={lon}",
            0.7,
            Duration::from_secs(2),
        )
    }

    #[test]
    fn url_template_substitution() {
        let url = feed().url_for(&Location::new(51.5, -0.12));
        assert_eq!(url, "https://sensors.example.org/v1/near?lat=51.5&lon=-0.12");
    }

    #[test]
    fn decodes_readings_with_source_reliability() {
        let body = json!({
            "readings": [
                {"kind": "pm25", "value": 12.5, "unit": "ug/m3", "observed_at": "2025-06-01T12:00:00Z"},
                {"kind": "temperature", "value": 68.0, "unit": "F"}
            ]
        });
        let readings = feed().decode(body).unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].observed_at, Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap());
        assert!(readings.iter().all(|r| r.reliability == 0.7 && r.source_id == "city-sensors"));
        assert!((readings[1].canonical_value().unwrap() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_metric_is_invalid_payload() {
        let body = json!({"readings": [{"kind": "pollen", "value": 3.0, "unit": "index"}]});
        let err = feed().decode(body).unwrap_err();
        assert!(matches!(err, SourceError::InvalidPayload(_)));
    }
}
