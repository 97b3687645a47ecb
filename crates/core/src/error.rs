//! Error types for the Breathwise domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

use crate::metric::{MetricKind, Unit};

/// The top-level error type for all Breathwise operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Upstream source errors ---
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    // --- Data availability ---
    #[error("Environmental data unavailable: {reason}")]
    DataUnavailable { reason: String },

    // --- Admission control ---
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    // --- Scoring / assembly faults ---
    #[error("Computation error: {0}")]
    Computation(#[from] ComputationError),

    // --- Profile store ---
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    // --- Caller input ---
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// A single upstream source failed. Fusion absorbs these; they only
/// lower confidence and are never surfaced to callers directly.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Source not configured: {0}")]
    NotConfigured(String),
}

#[derive(Debug, Clone, Error)]
pub enum ComputationError {
    #[error("Invalid health profile: {0}")]
    InvalidProfile(String),

    #[error("Non-finite value while scoring {metric}")]
    NonFinite { metric: String },

    #[error("Contradictory recommendations: {first} and {second}")]
    Contradiction { first: String, second: String },

    #[error("Cannot convert {kind} from {unit}")]
    InvalidReading { kind: MetricKind, unit: Unit },

    #[error("Invalid location: {0}")]
    InvalidLocation(String),
}

#[derive(Debug, Clone, Error)]
pub enum ProfileError {
    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("Profile store unavailable: {0}")]
    Unavailable(String),
}

impl Error {
    /// Stable machine-readable kind, used in API error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Source(_) | Error::DataUnavailable { .. } => "data_unavailable",
            Error::RateLimited { .. } => "rate_limited",
            Error::Profile(ProfileError::NotFound(_)) => "profile_not_found",
            Error::InvalidRequest(_) | Error::Computation(ComputationError::InvalidLocation(_)) => {
                "invalid_request"
            }
            Error::Profile(ProfileError::Unavailable(_))
            | Error::Computation(_)
            | Error::Config { .. }
            | Error::Serialization(_)
            | Error::Internal(_) => "internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_error_displays_correctly() {
        let err = Error::Source(SourceError::Api {
            status_code: 503,
            message: "upstream down".into(),
        });
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("upstream down"));
    }

    #[test]
    fn computation_error_displays_correctly() {
        let err = Error::Computation(ComputationError::Contradiction {
            first: "cold-layers".into(),
            second: "heat-hydrate".into(),
        });
        assert!(err.to_string().contains("cold-layers"));
        assert!(err.to_string().contains("heat-hydrate"));
    }

    #[test]
    fn error_kinds_are_distinct() {
        assert_eq!(
            Error::DataUnavailable { reason: "x".into() }.kind(),
            "data_unavailable"
        );
        assert_eq!(Error::RateLimited { retry_after_secs: 3 }.kind(), "rate_limited");
        assert_eq!(
            Error::Computation(ComputationError::InvalidProfile("x".into())).kind(),
            "internal_error"
        );
        assert_eq!(
            Error::Profile(ProfileError::NotFound("u1".into())).kind(),
            "profile_not_found"
        );
    }
}
