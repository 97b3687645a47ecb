//! # Breathwise Scoring
//!
//! Turns a fused snapshot and a health profile into a 0–100 risk score
//! with a per-factor explanation. The model is a plain function of its
//! inputs and the configured weights; nothing is learned or cached.

pub mod breakpoints;
pub mod scorer;
pub mod synergy;

pub use breakpoints::{hazard_index, sub_score};
pub use scorer::RiskScorer;
