//! Display values. Canonical values go in, audience-facing quantities come
//! out; nothing here feeds back into decisions.

use breathwise_core::briefing::{DisplayConditions, DualQuantity, Quantity};
use breathwise_core::error::ComputationError;
use breathwise_core::metric::{MetricKind, Unit, from_canonical};
use breathwise_core::snapshot::FusedSnapshot;

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn quantity(kind: MetricKind, canonical: f64, unit: Unit) -> Result<Quantity, ComputationError> {
    Ok(Quantity {
        value: round1(from_canonical(kind, canonical, unit)?),
        unit,
    })
}

fn dual(kind: MetricKind, canonical: f64, metric: Unit, imperial: Unit) -> Result<DualQuantity, ComputationError> {
    Ok(DualQuantity {
        metric: quantity(kind, canonical, metric)?,
        imperial: quantity(kind, canonical, imperial)?,
    })
}

/// Temperature in °C and °F, wind in km/h and mph, everything else in its
/// canonical unit.
pub fn display_conditions(snapshot: &FusedSnapshot) -> Result<DisplayConditions, ComputationError> {
    let mut conditions = DisplayConditions::default();

    for kind in snapshot.available_kinds() {
        let Some(value) = snapshot.value(kind) else {
            continue;
        };
        match kind {
            MetricKind::Temperature => {
                conditions.temperature = Some(dual(kind, value, Unit::Celsius, Unit::Fahrenheit)?);
            }
            MetricKind::WindSpeed => {
                conditions.wind_speed = Some(dual(kind, value, Unit::KilometersPerHour, Unit::MilesPerHour)?);
            }
            _ => {
                conditions
                    .other
                    .insert(kind, quantity(kind, value, kind.canonical_unit())?);
            }
        }
    }
    Ok(conditions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::snapshot_with;

    #[test]
    fn dual_units_for_temperature_and_wind() {
        let snap = snapshot_with(&[
            (MetricKind::Temperature, 20.0),
            (MetricKind::WindSpeed, 10.0),
            (MetricKind::Pm25, 12.34),
        ]);
        let c = display_conditions(&snap).unwrap();

        let t = c.temperature.unwrap();
        assert_eq!(t.metric, Quantity { value: 20.0, unit: Unit::Celsius });
        assert_eq!(t.imperial, Quantity { value: 68.0, unit: Unit::Fahrenheit });

        let w = c.wind_speed.unwrap();
        assert_eq!(w.metric.value, 36.0);
        assert_eq!(w.imperial.value, 22.4);

        assert_eq!(c.other[&MetricKind::Pm25].value, 12.3);
        assert!(!c.other.contains_key(&MetricKind::Temperature));
    }

    #[test]
    fn missing_metrics_are_omitted() {
        let c = display_conditions(&snapshot_with(&[(MetricKind::Ozone, 40.0)])).unwrap();
        assert!(c.temperature.is_none());
        assert!(c.wind_speed.is_none());
        assert_eq!(c.other.len(), 1);
    }
}
