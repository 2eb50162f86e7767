//! Authentication rejections and WWW-Authenticate construction.
//!
//! Every rejection the gate produces carries a status code, a JSON body of
//! the form `{"error": "<message>"}` and a `WWW-Authenticate` challenge that
//! points the client at the protected-resource metadata (RFC 6750 Section 3,
//! RFC 9728 Section 5.1).

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};

/// Why the gate refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization: Bearer <token>` header, or an empty token.
    #[error("Missing Bearer token")]
    MissingToken,

    /// The verifier rejected the token for any reason.
    #[error("Invalid token")]
    InvalidToken,

    /// The verifier could not be constructed at startup.
    #[error("Authentication service unavailable")]
    ServiceUnavailable,

    /// The verifier did not answer within the configured timeout.
    #[error("Token validation timed out")]
    Timeout,
}

impl AuthError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// The JSON body sent to the client.
    pub fn body(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }
}

/// Builds the challenge header value for a given metadata URL.
pub fn www_authenticate(resource_metadata_url: &str) -> String {
    format!(
        "Bearer realm=\"OAuth\", resource_metadata=\"{}\"",
        resource_metadata_url
    )
}

/// An [`AuthError`] paired with the challenge to send alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub error: AuthError,
    pub www_authenticate: String,
}

impl Rejection {
    pub fn new(error: AuthError, www_authenticate: impl Into<String>) -> Self {
        Self {
            error,
            www_authenticate: www_authenticate.into(),
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let mut response =
            (self.error.status_code(), axum::Json(self.error.body())).into_response();
        let challenge = HeaderValue::from_str(&self.www_authenticate)
            .unwrap_or_else(|_| HeaderValue::from_static("Bearer realm=\"OAuth\""));
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, challenge);
        response
    }
}
