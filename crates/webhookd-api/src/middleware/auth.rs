//! Bearer token authentication middleware.
//!
//! Runs the route group's [`AuthGate`] and stores the verified claims in the
//! request extensions for downstream handlers.

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use webhookd_auth::{AuthGate, AuthOutcome};

use crate::error::ApiError;

/// Axum middleware that authenticates requests with the given gate.
///
/// On success the [`webhookd_auth::VerifiedClaims`] are inserted into the
/// request extensions; anonymous and pre-flight requests pass through
/// without claims.
pub async fn authenticate(
    State(gate): State<AuthGate>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = req.into_parts();

    let outcome = gate.authenticate(&parts.method, &parts.headers, &parts.uri).await?;
    if let AuthOutcome::Verified(claims) = outcome {
        parts.extensions.insert(claims);
    }

    Ok(next.run(Request::from_parts(parts, body)).await)
}
