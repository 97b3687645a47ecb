//! Open-Meteo adapters.
//!
//! Open-Meteo splits air quality and weather across two hosts with the same
//! query shape, so one adapter type covers both and is parameterised by
//! [`Endpoint`]. The forecast provider reuses both endpoints' hourly series.

use async_trait::async_trait;
use breathwise_core::error::SourceError;
use breathwise_core::location::Location;
use breathwise_core::metric::{MetricKind, Unit};
use breathwise_core::reading::EnvironmentalReading;
use breathwise_core::source::{DataSource, ForecastProvider};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::http::{client, parse_timestamp, send_json};

type Field = (&'static str, MetricKind, Unit);

const AIR_QUALITY_FIELDS: &[Field] = &[
    ("pm2_5", MetricKind::Pm25, Unit::MicrogramsPerCubicMeter),
    ("pm10", MetricKind::Pm10, Unit::MicrogramsPerCubicMeter),
    ("ozone", MetricKind::Ozone, Unit::MicrogramsPerCubicMeter),
    ("nitrogen_dioxide", MetricKind::No2, Unit::MicrogramsPerCubicMeter),
    ("sulphur_dioxide", MetricKind::So2, Unit::MicrogramsPerCubicMeter),
    ("carbon_monoxide", MetricKind::Co, Unit::MicrogramsPerCubicMeter),
    ("uv_index", MetricKind::UvIndex, Unit::Index),
];

const WEATHER_FIELDS: &[Field] = &[
    ("temperature_2m", MetricKind::Temperature, Unit::Celsius),
    ("relative_humidity_2m", MetricKind::Humidity, Unit::Percent),
    ("wind_speed_10m", MetricKind::WindSpeed, Unit::KilometersPerHour),
];

/// Which Open-Meteo API an adapter talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    AirQuality,
    Weather,
}

impl Endpoint {
    fn fields(self) -> &'static [Field] {
        match self {
            Endpoint::AirQuality => AIR_QUALITY_FIELDS,
            Endpoint::Weather => WEATHER_FIELDS,
        }
    }

    fn default_id(self) -> &'static str {
        match self {
            Endpoint::AirQuality => "open-meteo-air",
            Endpoint::Weather => "open-meteo-weather",
        }
    }

    fn variables(self) -> String {
        self.fields()
            .iter()
            .map(|(name, _, _)| *name)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Current conditions from one Open-Meteo endpoint.
pub struct OpenMeteoSource {
    id: String,
    endpoint: Endpoint,
    base_url: String,
    reliability: f64,
    client: reqwest::Client,
}

impl OpenMeteoSource {
    pub fn new(
        endpoint: Endpoint,
        base_url: impl Into<String>,
        reliability: f64,
        timeout: Duration,
    ) -> Self {
        Self {
            id: endpoint.default_id().to_string(),
            endpoint,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            reliability,
            client: client(timeout),
        }
    }

    /// Air-quality adapter (pollutants and UV).
    pub fn air_quality(base_url: impl Into<String>, reliability: f64, timeout: Duration) -> Self {
        Self::new(Endpoint::AirQuality, base_url, reliability, timeout)
    }

    /// Weather adapter (temperature, humidity, wind).
    pub fn weather(base_url: impl Into<String>, reliability: f64, timeout: Duration) -> Self {
        Self::new(Endpoint::Weather, base_url, reliability, timeout)
    }

    async fn query(&self, location: &Location, extra: &[(&str, String)]) -> Result<Value, SourceError> {
        let mut params = vec![
            ("latitude", location.latitude.to_string()),
            ("longitude", location.longitude.to_string()),
            ("timezone", "GMT".to_string()),
        ];
        params.extend(extra.iter().map(|(k, v)| (*k, v.clone())));

        debug!(source = %self.id, %location, "Querying Open-Meteo");
        send_json(&self.id, self.client.get(&self.base_url).query(&params)).await
    }

    async fn fetch_hourly(
        &self,
        location: &Location,
        horizon: Duration,
    ) -> Result<Vec<EnvironmentalReading>, SourceError> {
        let hours = horizon.as_secs().div_ceil(3600).max(1);
        let body = self
            .query(
                location,
                &[
                    ("hourly", self.endpoint.variables()),
                    ("forecast_hours", (hours + 1).to_string()),
                ],
            )
            .await?;
        let target = Utc::now() + chrono::Duration::seconds(horizon.as_secs() as i64);
        parse_hourly(self.endpoint, &self.id, self.reliability, &body, target)
    }
}

#[async_trait]
impl DataSource for OpenMeteoSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn reliability(&self) -> f64 {
        self.reliability
    }

    async fn fetch(&self, location: &Location) -> Result<Vec<EnvironmentalReading>, SourceError> {
        let body = self
            .query(location, &[("current", self.endpoint.variables())])
            .await?;
        parse_current(self.endpoint, &self.id, self.reliability, &body)
    }

    async fn health_check(&self) -> Result<bool, SourceError> {
        let origin = Location::new(0.0, 0.0);
        Ok(self.fetch(&origin).await.is_ok())
    }
}

/// Forecast provider backed by the hourly series of both endpoints.
pub struct OpenMeteoForecast {
    air: OpenMeteoSource,
    weather: OpenMeteoSource,
}

impl OpenMeteoForecast {
    pub fn new(air: OpenMeteoSource, weather: OpenMeteoSource) -> Self {
        Self { air, weather }
    }
}

#[async_trait]
impl ForecastProvider for OpenMeteoForecast {
    fn id(&self) -> &str {
        "open-meteo-forecast"
    }

    async fn fetch_forecast(
        &self,
        location: &Location,
        horizon: Duration,
    ) -> Result<Vec<EnvironmentalReading>, SourceError> {
        let (air, weather) = futures::join!(
            self.air.fetch_hourly(location, horizon),
            self.weather.fetch_hourly(location, horizon)
        );

        match (air, weather) {
            (Ok(mut a), Ok(w)) => {
                a.extend(w);
                Ok(a)
            }
            (Ok(readings), Err(e)) | (Err(e), Ok(readings)) => {
                warn!(error = %e, "Partial forecast: one Open-Meteo endpoint failed");
                Ok(readings)
            }
            (Err(e), Err(_)) => Err(e),
        }
    }
}

fn parse_current(
    endpoint: Endpoint,
    source_id: &str,
    reliability: f64,
    body: &Value,
) -> Result<Vec<EnvironmentalReading>, SourceError> {
    let current = body
        .get("current")
        .and_then(Value::as_object)
        .ok_or_else(|| SourceError::InvalidPayload(format!("{source_id}: missing 'current'")))?;

    let observed_at = current
        .get("time")
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
        .ok_or_else(|| SourceError::InvalidPayload(format!("{source_id}: missing 'current.time'")))?;

    Ok(endpoint
        .fields()
        .iter()
        .filter_map(|(name, kind, unit)| {
            // Open-Meteo reports null for variables a model does not cover.
            let value = current.get(*name)?.as_f64()?;
            Some(EnvironmentalReading::new(
                *kind,
                value,
                *unit,
                source_id,
                observed_at,
                reliability,
            ))
        })
        .collect())
}

fn parse_hourly(
    endpoint: Endpoint,
    source_id: &str,
    reliability: f64,
    body: &Value,
    target: DateTime<Utc>,
) -> Result<Vec<EnvironmentalReading>, SourceError> {
    let hourly = body
        .get("hourly")
        .and_then(Value::as_object)
        .ok_or_else(|| SourceError::InvalidPayload(format!("{source_id}: missing 'hourly'")))?;

    let times: Vec<DateTime<Utc>> = hourly
        .get("time")
        .and_then(Value::as_array)
        .map(|ts| ts.iter().filter_map(Value::as_str).filter_map(parse_timestamp).collect())
        .unwrap_or_default();

    // First slot at or after the target, else the last one we were given.
    let Some(index) = times
        .iter()
        .position(|t| *t >= target)
        .or_else(|| times.len().checked_sub(1))
    else {
        return Err(SourceError::InvalidPayload(format!("{source_id}: empty hourly series")));
    };
    let observed_at = times[index];

    Ok(endpoint
        .fields()
        .iter()
        .filter_map(|(name, kind, unit)| {
            let value = hourly.get(*name)?.as_array()?.get(index)?.as_f64()?;
            Some(EnvironmentalReading::new(
                *kind,
                value,
                *unit,
                source_id,
                observed_at,
                reliability,
            ))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn parses_current_air_quality() {
        let body = json!({
            "latitude": 52.52,
            "longitude": 13.41,
            "current": {
                "time": "2025-06-01T12:00",
                "interval": 3600,
                "pm2_5": 18.4,
                "pm10": 25.0,
                "ozone": 96.0,
                "nitrogen_dioxide": 21.5,
                "sulphur_dioxide": null,
                "carbon_monoxide": 210.0,
                "uv_index": 5.2
            }
        });

        let readings = parse_current(Endpoint::AirQuality, "open-meteo-air", 0.8, &body).unwrap();
        assert_eq!(readings.len(), 6);
        assert!(readings.iter().all(|r| r.source_id == "open-meteo-air"));
        assert!(readings.iter().all(|r| r.reliability == 0.8));

        let pm25 = readings.iter().find(|r| r.kind == MetricKind::Pm25).unwrap();
        assert_eq!(pm25.value, 18.4);
        assert_eq!(pm25.observed_at, Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap());

        // Ozone arrives as µg/m³ and becomes ppb in canonical form.
        let ozone = readings.iter().find(|r| r.kind == MetricKind::Ozone).unwrap();
        assert!((ozone.canonical_value().unwrap() - 48.9).abs() < 0.1);

        assert!(!readings.iter().any(|r| r.kind == MetricKind::So2));
    }

    #[test]
    fn parses_current_weather_wind_in_kmh() {
        let body = json!({
            "current": {
                "time": "2025-06-01T12:00",
                "temperature_2m": 21.3,
                "relative_humidity_2m": 64,
                "wind_speed_10m": 18.0
            }
        });
        let readings = parse_current(Endpoint::Weather, "open-meteo-weather", 0.9, &body).unwrap();
        assert_eq!(readings.len(), 3);
        let wind = readings.iter().find(|r| r.kind == MetricKind::WindSpeed).unwrap();
        assert!((wind.canonical_value().unwrap() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn missing_current_block_is_invalid_payload() {
        let err = parse_current(Endpoint::Weather, "w", 0.9, &json!({"error": true})).unwrap_err();
        assert!(matches!(err, SourceError::InvalidPayload(_)));
    }

    #[test]
    fn hourly_picks_first_slot_at_or_after_target() {
        let body = json!({
            "hourly": {
                "time": ["2025-06-01T12:00", "2025-06-01T13:00", "2025-06-01T14:00"],
                "temperature_2m": [20.0, 22.0, 25.0],
                "relative_humidity_2m": [60, 58, null],
                "wind_speed_10m": [10.0, 12.0, 14.4]
            }
        });
        let target = Utc.with_ymd_and_hms(2025, 6, 1, 13, 30, 0).unwrap();
        let readings = parse_hourly(Endpoint::Weather, "w", 0.9, &body, target).unwrap();

        let temp = readings.iter().find(|r| r.kind == MetricKind::Temperature).unwrap();
        assert_eq!(temp.value, 25.0);
        assert!(!readings.iter().any(|r| r.kind == MetricKind::Humidity));

        // Past the end of the series: use the last slot.
        let late = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();
        let readings = parse_hourly(Endpoint::Weather, "w", 0.9, &body, late).unwrap();
        assert_eq!(readings[0].observed_at, Utc.with_ymd_and_hms(2025, 6, 1, 14, 0, 0).unwrap());
    }

    #[test]
    fn empty_hourly_series_is_invalid() {
        let body = json!({"hourly": {"time": []}});
        let err = parse_hourly(Endpoint::Weather, "w", 0.9, &body, Utc::now()).unwrap_err();
        assert!(matches!(err, SourceError::InvalidPayload(_)));
    }

    #[test]
    fn query_variables_cover_every_field() {
        assert_eq!(
            Endpoint::AirQuality.variables(),
            "pm2_5,pm10,ozone,nitrogen_dioxide,sulphur_dioxide,carbon_monoxide,uv_index"
        );
        assert_eq!(
            Endpoint::Weather.variables(),
            "temperature_2m,relative_humidity_2m,wind_speed_10m"
        );
    }
}
