//! Metric kinds, units, and canonical-unit conversion.
//!
//! Every threshold comparison in the system happens in the canonical unit
//! of the metric involved. Display units are derived from canonical values
//! at the very end and never flow back into decision logic.

use serde::{Deserialize, Serialize};

use crate::error::ComputationError;

/// Molar volume of an ideal gas at 25 °C and 1 atm, in litres per mole.
const MOLAR_VOLUME_L: f64 = 24.45;

/// An environmental quantity tracked by the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Pm25,
    Pm10,
    Ozone,
    No2,
    So2,
    Co,
    Temperature,
    Humidity,
    WindSpeed,
    UvIndex,
}

impl MetricKind {
    /// All metric kinds, in display order.
    pub const ALL: [MetricKind; 10] = [
        MetricKind::Pm25,
        MetricKind::Pm10,
        MetricKind::Ozone,
        MetricKind::No2,
        MetricKind::So2,
        MetricKind::Co,
        MetricKind::Temperature,
        MetricKind::Humidity,
        MetricKind::WindSpeed,
        MetricKind::UvIndex,
    ];

    /// The single unit used for all threshold logic on this metric.
    pub fn canonical_unit(self) -> Unit {
        match self {
            MetricKind::Pm25 | MetricKind::Pm10 => Unit::MicrogramsPerCubicMeter,
            MetricKind::Ozone | MetricKind::No2 | MetricKind::So2 => Unit::PartsPerBillion,
            MetricKind::Co => Unit::PartsPerMillion,
            MetricKind::Temperature => Unit::Celsius,
            MetricKind::Humidity => Unit::Percent,
            MetricKind::WindSpeed => Unit::MetersPerSecond,
            MetricKind::UvIndex => Unit::Index,
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            MetricKind::Pm25 => "PM2.5",
            MetricKind::Pm10 => "PM10",
            MetricKind::Ozone => "Ozone",
            MetricKind::No2 => "Nitrogen dioxide",
            MetricKind::So2 => "Sulfur dioxide",
            MetricKind::Co => "Carbon monoxide",
            MetricKind::Temperature => "Temperature",
            MetricKind::Humidity => "Humidity",
            MetricKind::WindSpeed => "Wind speed",
            MetricKind::UvIndex => "UV index",
        }
    }

    /// Short stable code used in cache keys.
    pub fn code(self) -> &'static str {
        match self {
            MetricKind::Pm25 => "pm25",
            MetricKind::Pm10 => "pm10",
            MetricKind::Ozone => "o3",
            MetricKind::No2 => "no2",
            MetricKind::So2 => "so2",
            MetricKind::Co => "co",
            MetricKind::Temperature => "temp",
            MetricKind::Humidity => "rh",
            MetricKind::WindSpeed => "wind",
            MetricKind::UvIndex => "uv",
        }
    }

    /// Whether this metric is an airborne pollutant (as opposed to weather).
    pub fn is_pollutant(self) -> bool {
        matches!(
            self,
            MetricKind::Pm25
                | MetricKind::Pm10
                | MetricKind::Ozone
                | MetricKind::No2
                | MetricKind::So2
                | MetricKind::Co
        )
    }

    /// Absolute scale below which relative disagreement between sources is
    /// measured against this floor instead of the value itself, so that
    /// readings near zero do not look wildly divergent.
    pub fn divergence_floor(self) -> f64 {
        match self {
            MetricKind::Pm25 | MetricKind::Pm10 => 10.0,
            MetricKind::Ozone | MetricKind::No2 | MetricKind::So2 => 10.0,
            MetricKind::Co => 1.0,
            MetricKind::Temperature => 10.0,
            MetricKind::Humidity => 20.0,
            MetricKind::WindSpeed => 3.0,
            MetricKind::UvIndex => 2.0,
        }
    }

    fn molar_mass(self) -> Option<f64> {
        match self {
            MetricKind::Ozone => Some(48.00),
            MetricKind::No2 => Some(46.01),
            MetricKind::So2 => Some(64.07),
            MetricKind::Co => Some(28.01),
            _ => None,
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A measurement unit as reported by an upstream source or used for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "ug/m3", alias = "µg/m³", alias = "μg/m³")]
    MicrogramsPerCubicMeter,
    #[serde(rename = "mg/m3")]
    MilligramsPerCubicMeter,
    #[serde(rename = "ppb")]
    PartsPerBillion,
    #[serde(rename = "ppm")]
    PartsPerMillion,
    #[serde(rename = "C", alias = "°C")]
    Celsius,
    #[serde(rename = "F", alias = "°F")]
    Fahrenheit,
    #[serde(rename = "K")]
    Kelvin,
    #[serde(rename = "%")]
    Percent,
    #[serde(rename = "m/s")]
    MetersPerSecond,
    #[serde(rename = "km/h")]
    KilometersPerHour,
    #[serde(rename = "mph")]
    MilesPerHour,
    #[serde(rename = "kn")]
    Knots,
    #[serde(rename = "index")]
    Index,
}

impl Unit {
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::MicrogramsPerCubicMeter => "µg/m³",
            Unit::MilligramsPerCubicMeter => "mg/m³",
            Unit::PartsPerBillion => "ppb",
            Unit::PartsPerMillion => "ppm",
            Unit::Celsius => "°C",
            Unit::Fahrenheit => "°F",
            Unit::Kelvin => "K",
            Unit::Percent => "%",
            Unit::MetersPerSecond => "m/s",
            Unit::KilometersPerHour => "km/h",
            Unit::MilesPerHour => "mph",
            Unit::Knots => "kn",
            Unit::Index => "index",
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Convert `value` expressed in `unit` into the canonical unit of `kind`.
pub fn to_canonical(kind: MetricKind, value: f64, unit: Unit) -> Result<f64, ComputationError> {
    let invalid = || ComputationError::InvalidReading { kind, unit };
    let converted = match (kind, unit) {
        (MetricKind::Pm25 | MetricKind::Pm10, Unit::MicrogramsPerCubicMeter) => value,
        (MetricKind::Pm25 | MetricKind::Pm10, Unit::MilligramsPerCubicMeter) => value * 1000.0,

        (MetricKind::Ozone | MetricKind::No2 | MetricKind::So2, u) => {
            let mw = kind.molar_mass().ok_or_else(invalid)?;
            match u {
                Unit::PartsPerBillion => value,
                Unit::PartsPerMillion => value * 1000.0,
                Unit::MicrogramsPerCubicMeter => value * MOLAR_VOLUME_L / mw,
                Unit::MilligramsPerCubicMeter => value * 1000.0 * MOLAR_VOLUME_L / mw,
                _ => return Err(invalid()),
            }
        }

        (MetricKind::Co, u) => {
            let mw = kind.molar_mass().ok_or_else(invalid)?;
            match u {
                Unit::PartsPerMillion => value,
                Unit::PartsPerBillion => value / 1000.0,
                Unit::MilligramsPerCubicMeter => value * MOLAR_VOLUME_L / mw,
                Unit::MicrogramsPerCubicMeter => value * MOLAR_VOLUME_L / (mw * 1000.0),
                _ => return Err(invalid()),
            }
        }

        (MetricKind::Temperature, Unit::Celsius) => value,
        (MetricKind::Temperature, Unit::Fahrenheit) => (value - 32.0) * 5.0 / 9.0,
        (MetricKind::Temperature, Unit::Kelvin) => value - 273.15,

        (MetricKind::Humidity, Unit::Percent) => value,

        (MetricKind::WindSpeed, Unit::MetersPerSecond) => value,
        (MetricKind::WindSpeed, Unit::KilometersPerHour) => value / 3.6,
        (MetricKind::WindSpeed, Unit::MilesPerHour) => value * 0.44704,
        (MetricKind::WindSpeed, Unit::Knots) => value * 0.514_444,

        (MetricKind::UvIndex, Unit::Index) => value,

        _ => return Err(invalid()),
    };
    Ok(converted)
}

/// Convert a canonical value of `kind` into `target` for display.
pub fn from_canonical(kind: MetricKind, value: f64, target: Unit) -> Result<f64, ComputationError> {
    if target == kind.canonical_unit() {
        return Ok(value);
    }
    // Every supported conversion is affine, so invert it from two sample points.
    let zero = to_canonical(kind, 0.0, target)?;
    let one = to_canonical(kind, 1.0, target)?;
    let slope = one - zero;
    if slope == 0.0 {
        return Err(ComputationError::InvalidReading { kind, unit: target });
    }
    Ok((value - zero) / slope)
}
