//! Collaborator traits: the abstraction over upstream providers and the
//! profile store.
//!
//! A `DataSource` knows how to fetch current readings for a location from
//! one upstream provider. Every source is treated as untrusted: it may fail,
//! lie, or hang, and callers bound it with a timeout.
//!
//! Implementations: Open-Meteo (air quality, weather), generic JSON feeds,
//! static fixtures.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{ProfileError, SourceError};
use crate::location::Location;
use crate::profile::HealthProfile;
use crate::reading::EnvironmentalReading;

/// The core DataSource trait.
///
/// Fusion calls `fetch()` on every configured source concurrently without
/// knowing which provider sits behind it.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Stable identifier (e.g., "open-meteo-air").
    fn id(&self) -> &str;

    /// Trust weight in (0, 1] applied to every reading from this source.
    fn reliability(&self) -> f64;

    /// Fetch current readings for a location.
    async fn fetch(&self, location: &Location) -> Result<Vec<EnvironmentalReading>, SourceError>;

    /// Health check: can we reach the source?
    async fn health_check(&self) -> Result<bool, SourceError> {
        Ok(true)
    }
}

/// Supplies predicted readings at a horizon.
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    fn id(&self) -> &str;

    async fn fetch_forecast(
        &self,
        location: &Location,
        horizon: Duration,
    ) -> Result<Vec<EnvironmentalReading>, SourceError>;
}

/// Read-only access to health profiles owned elsewhere.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_health_profile(&self, user_ref: &str) -> Result<HealthProfile, ProfileError>;
}
