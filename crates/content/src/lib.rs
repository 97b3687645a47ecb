//! Recommendation content for Breathwise briefings.
//!
//! - [`RecommendationPool`]: validated, read-only set of items
//! - [`RecencyState`] / [`RecencyStore`]: what each user saw recently
//! - [`VariationSelector`]: picks applicable, fresh, consistent items

pub mod pool;
pub mod recency;
pub mod selector;

pub use pool::RecommendationPool;
pub use recency::{RecencyState, RecencyStore};
pub use selector::VariationSelector;
