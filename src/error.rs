//! Service error types with HTTP status code mapping.
//!
//! [`BoxofficeError`] is the central error type for the service. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//! Variants are grouped into three families: not-found (the referenced entity
//! does not exist), operational conflict (the request is well-formed but the
//! current state refuses it), and infrastructure (a collaborator failed and
//! the outcome is unknown or negative).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 4001,
///     "message": "insufficient availability for tier 'General Admission'",
///     "details": "2 remaining"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`BoxofficeError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category            | HTTP Status                      |
/// |-----------|---------------------|----------------------------------|
/// | 1000–1999 | Validation          | 400 Bad Request                  |
/// | 2000–2999 | Not Found           | 404 Not Found                    |
/// | 3000–3999 | Infrastructure      | 500 / 502 / 503                  |
/// | 4000–4999 | Operational Conflict| 401 / 403 / 409                  |
#[derive(Debug, thiserror::Error)]
pub enum BoxofficeError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Ticket tier with the given ID was not found.
    #[error("ticket tier not found: {0}")]
    TierNotFound(uuid::Uuid),

    /// Event with the given slug or ID was not found.
    #[error("event not found: {0}")]
    EventNotFound(String),

    /// Order with the given ID or payment order reference was not found.
    #[error("order not found: {0}")]
    OrderNotFound(String),

    /// A requested tier cannot cover the quantity once soft locks and the
    /// durable count are considered.
    #[error("insufficient availability for tier '{tier_name}'")]
    InsufficientAvailability {
        /// Display name of the exhausted tier.
        tier_name: String,
        /// Units still sellable at the time of the check.
        available: i32,
    },

    /// No resolvable caller identity on the request.
    #[error("missing or invalid user identity")]
    Unauthenticated,

    /// Webhook or client payment signature did not verify.
    #[error("invalid payment signature")]
    InvalidSignature,

    /// The authenticated caller does not own the referenced order.
    #[error("order does not belong to the caller")]
    NotOrderOwner,

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Soft lock store is unreachable or rejected the operation.
    #[error("soft lock store unavailable: {0}")]
    SoftLockUnavailable(String),

    /// The upstream payment gateway failed to create or confirm an order.
    #[error("payment gateway failure: {0}")]
    PaymentGatewayFailure(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BoxofficeError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::TierNotFound(_) => 2001,
            Self::EventNotFound(_) => 2002,
            Self::OrderNotFound(_) => 2003,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
            Self::SoftLockUnavailable(_) => 3002,
            Self::PaymentGatewayFailure(_) => 3003,
            Self::InsufficientAvailability { .. } => 4001,
            Self::InvalidSignature => 4002,
            Self::NotOrderOwner => 4003,
            Self::Unauthenticated => 4004,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::TierNotFound(_) | Self::EventNotFound(_) | Self::OrderNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::InsufficientAvailability { .. } => StatusCode::CONFLICT,
            Self::InvalidSignature | Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::NotOrderOwner => StatusCode::FORBIDDEN,
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::SoftLockUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::PaymentGatewayFailure(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Optional details string surfaced in the JSON envelope.
    #[must_use]
    pub fn details(&self) -> Option<String> {
        match self {
            Self::InsufficientAvailability { available, .. } => {
                Some(format!("{available} remaining"))
            }
            _ => None,
        }
    }
}

impl IntoResponse for BoxofficeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: self.details(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn variants_map_to_expected_statuses_and_codes() {
        let cases = [
            (
                BoxofficeError::InvalidRequest("bad".to_string()),
                StatusCode::BAD_REQUEST,
                1001,
            ),
            (
                BoxofficeError::TierNotFound(uuid::Uuid::nil()),
                StatusCode::NOT_FOUND,
                2001,
            ),
            (
                BoxofficeError::EventNotFound("gone".to_string()),
                StatusCode::NOT_FOUND,
                2002,
            ),
            (
                BoxofficeError::InsufficientAvailability {
                    tier_name: "GA".to_string(),
                    available: 0,
                },
                StatusCode::CONFLICT,
                4001,
            ),
            (BoxofficeError::InvalidSignature, StatusCode::UNAUTHORIZED, 4002),
            (BoxofficeError::NotOrderOwner, StatusCode::FORBIDDEN, 4003),
            (BoxofficeError::Unauthenticated, StatusCode::UNAUTHORIZED, 4004),
            (
                BoxofficeError::SoftLockUnavailable("down".to_string()),
                StatusCode::SERVICE_UNAVAILABLE,
                3002,
            ),
            (
                BoxofficeError::PaymentGatewayFailure("timeout".to_string()),
                StatusCode::BAD_GATEWAY,
                3003,
            ),
        ];

        for (error, status, code) in cases {
            assert_eq!(error.status_code(), status, "{error}");
            assert_eq!(error.error_code(), code, "{error}");
        }
    }

    #[tokio::test]
    async fn response_body_carries_the_error_envelope() {
        let error = BoxofficeError::InsufficientAvailability {
            tier_name: "General Admission".to_string(),
            available: 2,
        };
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let error = body.get("error").unwrap();
        assert_eq!(error.get("code").unwrap(), 4001);
        assert_eq!(error.get("details").unwrap(), "2 remaining");
        let Some(message) = error.get("message").and_then(|m| m.as_str()) else {
            panic!("message missing");
        };
        assert!(message.contains("General Admission"));
    }
}
