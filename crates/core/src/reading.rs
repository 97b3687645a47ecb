//! Raw readings as reported by upstream sources.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ComputationError;
use crate::metric::{MetricKind, Unit, to_canonical};

/// One measurement from one source. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalReading {
    pub kind: MetricKind,
    pub value: f64,
    pub unit: Unit,
    pub source_id: String,
    pub observed_at: DateTime<Utc>,
    /// Trust weight of the reporting source, in (0, 1].
    pub reliability: f64,
}

impl EnvironmentalReading {
    pub fn new(
        kind: MetricKind,
        value: f64,
        unit: Unit,
        source_id: impl Into<String>,
        observed_at: DateTime<Utc>,
        reliability: f64,
    ) -> Self {
        Self {
            kind,
            value,
            unit,
            source_id: source_id.into(),
            observed_at,
            reliability,
        }
    }

    /// The value expressed in the canonical unit of its metric.
    pub fn canonical_value(&self) -> Result<f64, ComputationError> {
        to_canonical(self.kind, self.value, self.unit)
    }

    /// Whether this reading can participate in consensus at all.
    pub fn is_usable(&self) -> bool {
        self.value.is_finite() && self.reliability.is_finite() && self.reliability > 0.0
    }
}
