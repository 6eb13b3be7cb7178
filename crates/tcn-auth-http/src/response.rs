//! Mapping of verification outcomes to HTTP responses.
//!
//! | Error kind | Status |
//! |------------|--------|
//! | `Rejected(_)` | `401 Unauthorized` |
//! | `Encoding` | `400 Bad Request` |
//! | `Configuration` | `500 Internal Server Error` |
//!
//! Error bodies are JSON:
//!
//! ```json
//! {"error":"unauthorized","reason":"stale","message":"...","requestId":"..."}
//! ```

use http::StatusCode;
use http::header::{CONTENT_TYPE, HeaderValue, WWW_AUTHENTICATE};
use serde::Serialize;
use tcn_auth::{AuthError, ErrorKind};

use crate::body::GatewayBody;

/// JSON error document returned to rejected callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Short error class, e.g. `unauthorized`.
    pub error: &'static str,
    /// Rejection reason (`malformed`, `stale`, `unknown_token`, `bad_signature`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    /// Human-readable detail.
    pub message: String,
    /// Request identifier, also sent as `x-request-id`.
    pub request_id: String,
}

/// HTTP status for an authentication error.
#[must_use]
pub fn status_for(err: &AuthError) -> StatusCode {
    match err.kind() {
        ErrorKind::Rejected(_) => StatusCode::UNAUTHORIZED,
        ErrorKind::Encoding => StatusCode::BAD_REQUEST,
        ErrorKind::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Build the error response for a failed verification.
///
/// Unauthorized responses carry a `WWW-Authenticate` challenge naming the
/// expected scheme marker.
#[must_use]
pub fn auth_error_response(
    err: &AuthError,
    service_marker: &str,
    request_id: &str,
) -> http::Response<GatewayBody> {
    let status = status_for(err);
    let body = ErrorBody {
        error: match err.kind() {
            ErrorKind::Rejected(_) => "unauthorized",
            ErrorKind::Encoding => "bad_request",
            ErrorKind::Configuration => "internal_error",
        },
        reason: err.rejection().map(tcn_auth::Rejection::as_str),
        message: err.to_string(),
        request_id: request_id.to_owned(),
    };

    let mut response = json_response(status, &body);
    if status == StatusCode::UNAUTHORIZED {
        if let Ok(challenge) = HeaderValue::from_str(service_marker) {
            response.headers_mut().insert(WWW_AUTHENTICATE, challenge);
        }
    }
    response
}

/// Build a JSON response with the given status.
#[must_use]
pub fn json_response<T: Serialize + ?Sized>(
    status: StatusCode,
    value: &T,
) -> http::Response<GatewayBody> {
    let mut response = http::Response::new(GatewayBody::json(value));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}
