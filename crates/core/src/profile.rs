//! Personal health profiles. Owned by an external store; read-only here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::ComputationError;
use crate::metric::MetricKind;

/// How strongly a condition affects the person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

/// A diagnosed condition, e.g. asthma or COPD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub name: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthProfile {
    pub user_ref: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Metrics the user reports as personal triggers.
    #[serde(default)]
    pub triggers: BTreeSet<MetricKind>,
    /// Optional extra sensitivity multiplier; 1.0 when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<f64>,
}

impl HealthProfile {
    pub fn new(user_ref: impl Into<String>) -> Self {
        Self {
            user_ref: user_ref.into(),
            conditions: Vec::new(),
            triggers: BTreeSet::new(),
            sensitivity: None,
        }
    }

    pub fn with_condition(mut self, name: impl Into<String>, severity: Severity) -> Self {
        self.conditions.push(Condition {
            name: name.into(),
            severity,
        });
        self
    }

    pub fn with_trigger(mut self, kind: MetricKind) -> Self {
        self.triggers.insert(kind);
        self
    }

    pub fn with_sensitivity(mut self, sensitivity: f64) -> Self {
        self.sensitivity = Some(sensitivity);
        self
    }

    /// Highest severity across all conditions.
    pub fn max_severity(&self) -> Option<Severity> {
        self.conditions.iter().map(|c| c.severity).max()
    }

    pub fn is_trigger(&self, kind: MetricKind) -> bool {
        self.triggers.contains(&kind)
    }

    /// Reject profiles whose shape would make a score meaningless.
    pub fn validate(&self) -> Result<(), ComputationError> {
        if self.user_ref.trim().is_empty() {
            return Err(ComputationError::InvalidProfile("empty user reference".into()));
        }
        if let Some(c) = self.conditions.iter().find(|c| c.name.trim().is_empty()) {
            return Err(ComputationError::InvalidProfile(format!(
                "condition with empty name (severity {:?})",
                c.severity
            )));
        }
        if let Some(s) = self.sensitivity {
            if !s.is_finite() || s <= 0.0 || s > 3.0 {
                return Err(ComputationError::InvalidProfile(format!(
                    "sensitivity {s} outside (0, 3]"
                )));
            }
        }
        Ok(())
    }
}
