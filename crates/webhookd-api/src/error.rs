//! Mapping of domain failures onto HTTP responses.
//!
//! Every error body has the shape `{"error": {"code": ..., "message": ...}}`.

use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use webhookd_auth::AuthError;
use webhookd_core::CoreError;

/// Error response with code and message.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error details including code and message
    pub error: ErrorDetail,
}

/// Detailed error information.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Machine-readable error code
    pub code: &'static str,
    /// Human-readable error description
    pub message: String,
}

/// Errors surfaced by handlers and middleware.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Hook-layer failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Authentication failure.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Unreadable request body.
    #[error("{0}")]
    BadRequest(String),

    /// No such hook, or the hook is inactive.
    #[error("not found")]
    NotFound,

    /// The hook answers to a different method.
    #[error("method not allowed")]
    MethodNotAllowed,
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Core(e) if e.is_validation() => StatusCode::BAD_REQUEST,
            Self::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(e) if e.is_server_side() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    /// Stable error code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Core(CoreError::UnsupportedMethod(_)) => "unsupported_method",
            Self::Core(CoreError::Storage(_)) => "internal_error",
            Self::Auth(AuthError::Misconfigured) => "auth_not_configured",
            Self::Auth(AuthError::KeySource(_)) => "auth_unavailable",
            Self::Auth(_) => "unauthorized",
            Self::BadRequest(_) => "bad_request",
            Self::NotFound => "not_found",
            Self::MethodNotAllowed => "method_not_allowed",
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::Core(CoreError::Storage(_)) => "internal error".to_string(),
            Self::Auth(AuthError::KeySource(_)) => "signing keys unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = ErrorResponse { error: ErrorDetail { code: self.code(), message: self.public_message() } };
        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use webhookd_auth::KeySourceError;

    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (ApiError::from(CoreError::UnsupportedMethod("TRACE".into())), StatusCode::BAD_REQUEST),
            (ApiError::from(CoreError::Storage("down".into())), StatusCode::INTERNAL_SERVER_ERROR),
            (ApiError::from(AuthError::Misconfigured), StatusCode::SERVICE_UNAVAILABLE),
            (ApiError::from(AuthError::KeySource(KeySourceError::Empty)), StatusCode::SERVICE_UNAVAILABLE),
            (ApiError::from(AuthError::InvalidIssuer), StatusCode::UNAUTHORIZED),
            (ApiError::from(AuthError::MalformedHeader), StatusCode::UNAUTHORIZED),
            (ApiError::NotFound, StatusCode::NOT_FOUND),
            (ApiError::MethodNotAllowed, StatusCode::METHOD_NOT_ALLOWED),
        ];

        for (error, status) in cases {
            assert_eq!(error.status(), status, "{error:?}");
        }
    }

    #[test]
    fn unauthorized_responses_challenge_for_bearer() {
        let response = ApiError::from(AuthError::MissingToken).into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[WWW_AUTHENTICATE], "Bearer");
    }

    #[test]
    fn storage_details_are_not_leaked() {
        let error = ApiError::from(CoreError::Storage("password=hunter2".into()));
        assert_eq!(error.public_message(), "internal error");
    }
}
