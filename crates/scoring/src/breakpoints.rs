//! Hazard index tables.
//!
//! Each metric maps a canonical-unit value onto a 0–500 index by linear
//! interpolation between breakpoints. Pollutant tables follow the US EPA AQI
//! breakpoints; the weather tables are U-shaped where both extremes are
//! harmful (cold and heat stress, dry and saturated air, stagnant and gusty
//! wind). Values beyond either end clamp to the end index.

use breathwise_core::metric::MetricKind;

/// Sub-scores saturate at this index ("hazardous" onset).
const INDEX_SATURATION: f64 = 300.0;

/// (value in canonical unit, index)
type Table = &'static [(f64, f64)];

const PM25: Table = &[
    (0.0, 0.0),
    (9.0, 50.0),
    (35.4, 100.0),
    (55.4, 150.0),
    (125.4, 200.0),
    (225.4, 300.0),
    (325.4, 500.0),
];

const PM10: Table = &[
    (0.0, 0.0),
    (54.0, 50.0),
    (154.0, 100.0),
    (254.0, 150.0),
    (354.0, 200.0),
    (424.0, 300.0),
    (604.0, 500.0),
];

const OZONE: Table = &[
    (0.0, 0.0),
    (54.0, 50.0),
    (70.0, 100.0),
    (85.0, 150.0),
    (105.0, 200.0),
    (200.0, 300.0),
    (404.0, 500.0),
];

const NO2: Table = &[
    (0.0, 0.0),
    (53.0, 50.0),
    (100.0, 100.0),
    (360.0, 150.0),
    (649.0, 200.0),
    (1249.0, 300.0),
    (2049.0, 500.0),
];

const SO2: Table = &[
    (0.0, 0.0),
    (35.0, 50.0),
    (75.0, 100.0),
    (185.0, 150.0),
    (304.0, 200.0),
    (604.0, 300.0),
    (1004.0, 500.0),
];

const CO: Table = &[
    (0.0, 0.0),
    (4.4, 50.0),
    (9.4, 100.0),
    (12.4, 150.0),
    (15.4, 200.0),
    (30.4, 300.0),
    (50.4, 500.0),
];

const TEMPERATURE: Table = &[
    (-30.0, 300.0),
    (-15.0, 200.0),
    (-5.0, 100.0),
    (5.0, 50.0),
    (10.0, 0.0),
    (24.0, 0.0),
    (27.0, 50.0),
    (32.0, 100.0),
    (35.0, 150.0),
    (39.0, 200.0),
    (43.0, 300.0),
    (50.0, 500.0),
];

const HUMIDITY: Table = &[
    (0.0, 100.0),
    (20.0, 50.0),
    (30.0, 0.0),
    (60.0, 0.0),
    (70.0, 50.0),
    (85.0, 100.0),
    (100.0, 150.0),
];

const WIND: Table = &[
    (0.0, 50.0),
    (2.0, 25.0),
    (3.0, 0.0),
    (10.0, 0.0),
    (15.0, 75.0),
    (20.0, 150.0),
    (30.0, 300.0),
];

const UV: Table = &[
    (0.0, 0.0),
    (2.0, 25.0),
    (5.0, 75.0),
    (7.0, 125.0),
    (10.0, 200.0),
    (11.0, 250.0),
    (16.0, 400.0),
];

fn table(kind: MetricKind) -> Table {
    match kind {
        MetricKind::Pm25 => PM25,
        MetricKind::Pm10 => PM10,
        MetricKind::Ozone => OZONE,
        MetricKind::No2 => NO2,
        MetricKind::So2 => SO2,
        MetricKind::Co => CO,
        MetricKind::Temperature => TEMPERATURE,
        MetricKind::Humidity => HUMIDITY,
        MetricKind::WindSpeed => WIND,
        MetricKind::UvIndex => UV,
    }
}

/// Hazard index on 0–500 for a canonical value.
pub fn hazard_index(kind: MetricKind, value: f64) -> f64 {
    let points = table(kind);
    let (first, last) = (points[0], points[points.len() - 1]);
    if value <= first.0 {
        return first.1;
    }
    if value >= last.0 {
        return last.1;
    }
    for pair in points.windows(2) {
        let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
        if value <= x1 {
            return y0 + (value - x0) * (y1 - y0) / (x1 - x0);
        }
    }
    last.1
}

/// Normalized 0–100 sub-score: `min(index, 300) / 3`.
pub fn sub_score(kind: MetricKind, value: f64) -> f64 {
    hazard_index(kind, value).min(INDEX_SATURATION) / (INDEX_SATURATION / 100.0)
}
