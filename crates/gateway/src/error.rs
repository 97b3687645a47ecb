//! JSON error responses.
//!
//! Every failure leaves the gateway as
//! `{"error":{"kind","message","retry_after_secs"?}}` with a status code
//! derived from the kind.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use breathwise_core::error::Error;
use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

#[derive(Debug)]
pub enum ApiError {
    Domain(Error),
    Unauthorized(String),
}

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ApiError::Domain(Error::InvalidRequest(message.into()))
    }

    pub fn rate_limited(retry_after_secs: u64) -> Self {
        ApiError::Domain(Error::RateLimited { retry_after_secs })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Domain(e) => e.kind(),
            ApiError::Unauthorized(_) => "unauthorized",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            "data_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "invalid_request" => StatusCode::BAD_REQUEST,
            "profile_not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError::Domain(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let retry_after_secs = match &self {
            ApiError::Domain(Error::RateLimited { retry_after_secs }) => Some(*retry_after_secs),
            _ => None,
        };
        let message = match &self {
            ApiError::Domain(e) => e.to_string(),
            ApiError::Unauthorized(m) => m.clone(),
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %message, "Request failed");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                kind: self.kind().to_string(),
                message,
                retry_after_secs,
            },
        };
        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
