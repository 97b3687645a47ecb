//! Trend classification.
//!
//! A change within the deadband is stable. Outside it, the direction comes
//! from the metric's hazard index rather than the raw value, so a falling
//! temperature on a cold day reads as worsening and on a hot day as
//! improving.

use breathwise_core::briefing::{Trend, TrendEntry, TrendReference};
use breathwise_core::metric::MetricKind;
use breathwise_scoring::hazard_index;

/// Classify `current` against a forecast value (which lies ahead of it).
pub fn against_forecast(kind: MetricKind, current: f64, forecast: f64, deadband: f64) -> TrendEntry {
    TrendEntry {
        trend: direction(kind, current, forecast, deadband),
        reference: TrendReference::Forecast,
        current,
        reference_value: Some(forecast),
    }
}

/// Classify `current` against a historical baseline (which lies behind it).
pub fn against_baseline(kind: MetricKind, current: f64, baseline: f64, deadband: f64) -> TrendEntry {
    TrendEntry {
        trend: direction(kind, baseline, current, deadband),
        reference: TrendReference::Baseline,
        current,
        reference_value: Some(baseline),
    }
}

pub fn unknown(current: f64) -> TrendEntry {
    TrendEntry {
        trend: Trend::Unknown,
        reference: TrendReference::None,
        current,
        reference_value: None,
    }
}

fn direction(kind: MetricKind, earlier: f64, later: f64, deadband: f64) -> Trend {
    if (later - earlier).abs() <= deadband {
        return Trend::Stable;
    }
    let (before, after) = (hazard_index(kind, earlier), hazard_index(kind, later));
    if after > before {
        Trend::Worsening
    } else if after < before {
        Trend::Improving
    } else {
        Trend::Stable
    }
}
