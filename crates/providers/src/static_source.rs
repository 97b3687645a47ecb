//! Fixed-value sources for offline mode and tests.

use async_trait::async_trait;
use breathwise_core::error::SourceError;
use breathwise_core::location::Location;
use breathwise_core::metric::{MetricKind, Unit};
use breathwise_core::reading::EnvironmentalReading;
use breathwise_core::source::{DataSource, ForecastProvider};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Returns the same readings for every location.
#[derive(Debug, Clone)]
pub struct StaticSource {
    id: String,
    reliability: f64,
    readings: Vec<(MetricKind, f64, Unit)>,
    observed_at: Option<DateTime<Utc>>,
}

impl StaticSource {
    pub fn new(id: impl Into<String>, reliability: f64) -> Self {
        Self {
            id: id.into(),
            reliability,
            readings: Vec::new(),
            observed_at: None,
        }
    }

    pub fn with_reading(mut self, kind: MetricKind, value: f64, unit: Unit) -> Self {
        self.readings.push((kind, value, unit));
        self
    }

    /// Pin the observation time instead of stamping each fetch with now.
    pub fn observed_at(mut self, at: DateTime<Utc>) -> Self {
        self.observed_at = Some(at);
        self
    }

    /// A plausible mild spring afternoon, used by `--offline`.
    pub fn demo_air() -> Self {
        Self::new("demo-air", 0.8)
            .with_reading(MetricKind::Pm25, 14.0, Unit::MicrogramsPerCubicMeter)
            .with_reading(MetricKind::Pm10, 22.0, Unit::MicrogramsPerCubicMeter)
            .with_reading(MetricKind::Ozone, 48.0, Unit::PartsPerBillion)
            .with_reading(MetricKind::No2, 18.0, Unit::PartsPerBillion)
            .with_reading(MetricKind::So2, 2.0, Unit::PartsPerBillion)
            .with_reading(MetricKind::Co, 0.3, Unit::PartsPerMillion)
            .with_reading(MetricKind::UvIndex, 4.0, Unit::Index)
    }

    pub fn demo_weather() -> Self {
        Self::new("demo-weather", 0.9)
            .with_reading(MetricKind::Temperature, 18.0, Unit::Celsius)
            .with_reading(MetricKind::Humidity, 55.0, Unit::Percent)
            .with_reading(MetricKind::WindSpeed, 4.0, Unit::MetersPerSecond)
    }

    fn readings_at(&self, now: DateTime<Utc>) -> Vec<EnvironmentalReading> {
        let at = self.observed_at.unwrap_or(now);
        self.readings
            .iter()
            .map(|(kind, value, unit)| {
                EnvironmentalReading::new(*kind, *value, *unit, &self.id, at, self.reliability)
            })
            .collect()
    }
}

#[async_trait]
impl DataSource for StaticSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn reliability(&self) -> f64 {
        self.reliability
    }

    async fn fetch(&self, _location: &Location) -> Result<Vec<EnvironmentalReading>, SourceError> {
        Ok(self.readings_at(Utc::now()))
    }
}

/// Forecast provider that answers from fixed readings.
#[derive(Debug, Clone)]
pub struct StaticForecast {
    inner: StaticSource,
}

impl StaticForecast {
    pub fn new(inner: StaticSource) -> Self {
        Self { inner }
    }

    /// Slightly worse air and warmer air later in the day.
    pub fn demo() -> Self {
        Self::new(
            StaticSource::new("demo-forecast", 0.7)
                .with_reading(MetricKind::Pm25, 21.0, Unit::MicrogramsPerCubicMeter)
                .with_reading(MetricKind::Ozone, 60.0, Unit::PartsPerBillion)
                .with_reading(MetricKind::Temperature, 22.0, Unit::Celsius),
        )
    }
}

#[async_trait]
impl ForecastProvider for StaticForecast {
    fn id(&self) -> &str {
        &self.inner.id
    }

    async fn fetch_forecast(
        &self,
        _location: &Location,
        horizon: Duration,
    ) -> Result<Vec<EnvironmentalReading>, SourceError> {
        let at = Utc::now() + chrono::Duration::seconds(horizon.as_secs() as i64);
        Ok(self.inner.readings_at(at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_source_stamps_its_identity() {
        let source = StaticSource::new("fixture", 0.5)
            .with_reading(MetricKind::Pm25, 40.0, Unit::MicrogramsPerCubicMeter);
        let readings = source.fetch(&Location::new(10.0, 10.0)).await.unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].source_id, "fixture");
        assert_eq!(readings[0].reliability, 0.5);
    }

    #[tokio::test]
    async fn demo_fixtures_cover_every_metric() {
        let loc = Location::new(0.0, 0.0);
        let mut kinds: Vec<MetricKind> = StaticSource::demo_air()
            .fetch(&loc)
            .await
            .unwrap()
            .into_iter()
            .chain(StaticSource::demo_weather().fetch(&loc).await.unwrap())
            .map(|r| r.kind)
            .collect();
        kinds.sort();
        assert_eq!(kinds, MetricKind::ALL.to_vec());
    }

    #[tokio::test]
    async fn static_forecast_is_stamped_at_horizon() {
        let forecast = StaticForecast::demo();
        let readings = forecast
            .fetch_forecast(&Location::new(0.0, 0.0), Duration::from_secs(6 * 3600))
            .await
            .unwrap();
        assert!(readings[0].observed_at > Utc::now() + chrono::Duration::hours(5));
    }
}
