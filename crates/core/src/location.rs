//! Geographic locations and the quantized grid used to share cached data
//! between nearby callers.

use serde::{Deserialize, Serialize};

use crate::error::ComputationError;

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Build a location, rejecting out-of-range or non-finite coordinates.
    pub fn checked(latitude: f64, longitude: f64) -> Result<Self, ComputationError> {
        let loc = Self::new(latitude, longitude);
        loc.validate()?;
        Ok(loc)
    }

    pub fn validate(&self) -> Result<(), ComputationError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ComputationError::InvalidLocation(format!(
                "latitude {} out of range [-90, 90]",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ComputationError::InvalidLocation(format!(
                "longitude {} out of range [-180, 180]",
                self.longitude
            )));
        }
        Ok(())
    }

    /// Snap this location onto a grid of `precision_deg` degrees.
    pub fn quantize(&self, precision_deg: f64) -> QuantizedLocation {
        let micro = (precision_deg * 1e6).round().max(1.0) as u64;
        let step = micro as f64 / 1e6;
        QuantizedLocation {
            lat_ticks: (self.latitude / step).round() as i64,
            lon_ticks: (self.longitude / step).round() as i64,
            precision_micro: micro,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4},{:.4}", self.latitude, self.longitude)
    }
}

/// A grid cell. Two locations in the same cell share cache entries and
/// trend baselines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuantizedLocation {
    lat_ticks: i64,
    lon_ticks: i64,
    precision_micro: u64,
}

impl QuantizedLocation {
    fn step(&self) -> f64 {
        self.precision_micro as f64 / 1e6
    }

    fn decimals(&self) -> usize {
        let mut micro = self.precision_micro;
        let mut decimals = 6;
        while decimals > 0 && micro % 10 == 0 {
            micro /= 10;
            decimals -= 1;
        }
        decimals
    }

    /// Center of the cell.
    pub fn center(&self) -> Location {
        Location::new(
            self.lat_ticks as f64 * self.step(),
            self.lon_ticks as f64 * self.step(),
        )
    }
}

impl std::fmt::Display for QuantizedLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let center = self.center();
        let d = self.decimals();
        write!(f, "{:.*},{:.*}", d, center.latitude, d, center.longitude)
    }
}
