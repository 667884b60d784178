//! Server error types with HTTP status code mapping.
//!
//! [`ServerError`] is the central error type for the service. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{EventId, OrganizerId, PassTypeId, ProfileId, RegistrationId, TicketId};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 4001,
///     "message": "pass type is sold out",
///     "details": null
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
    /// Numeric error code (see code ranges on [`ServerError`]).
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
/// | Range     | Category          | HTTP Status                  |
/// |-----------|-------------------|------------------------------|
/// | 1000–1999 | Validation / Auth | 400 / 401 / 403              |
/// | 2000–2999 | Not Found / State | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server            | 500 Internal Server Error    |
/// | 4000–4999 | Domain rules      | 422 Unprocessable Entity     |
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Missing or invalid session token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed to perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Event with the given ID was not found.
    #[error("event not found: {0}")]
    EventNotFound(EventId),

    /// Pass type with the given ID was not found.
    #[error("pass type not found: {0}")]
    PassTypeNotFound(PassTypeId),

    /// Registration with the given ID was not found.
    #[error("registration not found: {0}")]
    RegistrationNotFound(RegistrationId),

    /// Ticket with the given ID was not found.
    #[error("ticket not found: {0}")]
    TicketNotFound(TicketId),

    /// Organizer with the given ID was not found.
    #[error("organizer not found: {0}")]
    OrganizerNotFound(OrganizerId),

    /// Profile with the given ID was not found.
    #[error("profile not found: {0}")]
    ProfileNotFound(ProfileId),

    /// The entity is not in a state that permits the operation.
    #[error("state conflict: {0}")]
    StateConflict(String),

    /// Pass type has no remaining quantity.
    #[error("pass type is sold out")]
    SoldOut,

    /// Event has reached its participant limit.
    #[error("event is at capacity")]
    EventFull,

    /// Payment signature did not verify against the shared secret.
    #[error("payment signature mismatch")]
    SignatureMismatch,

    /// Event publication attempted while the organizer is unverified.
    #[error("organizer is not verified: {0}")]
    OrganizerNotVerified(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::Unauthorized(_) => 1100,
            Self::Forbidden(_) => 1101,
            Self::EventNotFound(_) => 2001,
            Self::PassTypeNotFound(_) => 2002,
            Self::RegistrationNotFound(_) => 2003,
            Self::TicketNotFound(_) => 2004,
            Self::OrganizerNotFound(_) => 2005,
            Self::ProfileNotFound(_) => 2006,
            Self::StateConflict(_) => 2101,
            Self::SoldOut => 4001,
            Self::EventFull => 4002,
            Self::SignatureMismatch => 4101,
            Self::OrganizerNotVerified(_) => 4201,
            Self::PersistenceError(_) => 3001,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::EventNotFound(_)
            | Self::PassTypeNotFound(_)
            | Self::RegistrationNotFound(_)
            | Self::TicketNotFound(_)
            | Self::OrganizerNotFound(_)
            | Self::ProfileNotFound(_) => StatusCode::NOT_FOUND,
            Self::StateConflict(_) => StatusCode::CONFLICT,
            Self::SoldOut
            | Self::EventFull
            | Self::SignatureMismatch
            | Self::OrganizerNotVerified(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.error_code(), "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
