//! Upstream data sources for Breathwise.
//!
//! All adapters implement the `breathwise_core::DataSource` trait.
//! The registry builds them from configuration and the fusion engine
//! reconciles their readings.

mod http;

pub mod fusion;
pub mod json_feed;
pub mod open_meteo;
pub mod profiles;
pub mod registry;
pub mod static_source;

pub use fusion::{FusionEngine, FusionSettings};
pub use json_feed::JsonFeedSource;
pub use open_meteo::{OpenMeteoForecast, OpenMeteoSource};
pub use profiles::StaticProfileStore;
pub use registry::{SourceRegistry, build_from_config};
pub use static_source::{StaticForecast, StaticSource};
