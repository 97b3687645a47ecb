//! # Breathwise Core
//!
//! Domain types, traits, and error definitions for the Breathwise
//! environmental-health risk engine. This crate has **zero framework
//! dependencies**: it defines the domain model that all other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator is defined as a trait here. Implementations live in
//! their respective crates. This enables:
//! - Swapping upstream providers via configuration
//! - Easy testing with mock/stub sources
//! - Clean dependency graph (all crates depend inward on core)

pub mod briefing;
pub mod error;
pub mod location;
pub mod metric;
pub mod profile;
pub mod reading;
pub mod recommendation;
pub mod risk;
pub mod snapshot;
pub mod source;

// Re-export key types at crate root for ergonomics
pub use briefing::{BriefingRecord, DisplayConditions, DualQuantity, Forecast, Quantity, Trend, TrendEntry, TrendReference};
pub use error::{ComputationError, Error, ProfileError, Result, SourceError};
pub use location::{Location, QuantizedLocation};
pub use metric::{MetricKind, Unit};
pub use profile::{Condition, HealthProfile, Severity};
pub use reading::EnvironmentalReading;
pub use recommendation::{ApplicabilityBands, Applicability, Category, RecommendationItem, ThermalBand, WindBand};
pub use risk::{FactorSource, RiskBand, RiskFactor, RiskScore};
pub use snapshot::{ConsensusValue, FusedSnapshot, MetricValue};
pub use source::{DataSource, ForecastProvider, ProfileStore};
