//! Debug endpoints: route table and token echo.

use std::collections::HashMap;

use axum::{extract::State, Extension, Json};
use serde::Serialize;
use tracing::instrument;
use webhookd_auth::{AuthError, VerifiedClaims};
use webhookd_core::{Hook, HookMethod};

use crate::{error::ApiError, AppState};

/// Every route the server answers, in registration order.
pub const ROUTES: &[RouteEntry] = &[
    RouteEntry { method: "POST", path: "/v1/webhooks" },
    RouteEntry { method: "DELETE", path: "/v1/webhooks/{id}" },
    RouteEntry { method: "GET", path: "/v1/hooks/{id}" },
    RouteEntry { method: "POST", path: "/v1/hooks/{id}" },
    RouteEntry { method: "PUT", path: "/v1/hooks/{id}" },
    RouteEntry { method: "PATCH", path: "/v1/hooks/{id}" },
    RouteEntry { method: "DELETE", path: "/v1/hooks/{id}" },
    RouteEntry { method: "OPTIONS", path: "/v1/hooks/{id}" },
    RouteEntry { method: "GET", path: "/v1/debug/routes" },
    RouteEntry { method: "GET", path: "/v1/debug/private" },
];

/// One route in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouteEntry {
    /// HTTP method.
    pub method: &'static str,
    /// Path pattern.
    pub path: &'static str,
}

/// Hook details shown in the route listing. Bodies are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookSummary {
    /// Hook ID.
    pub id: String,
    /// Method the hook answers to.
    pub method: HookMethod,
    /// Whether the hook still answers.
    pub active: bool,
    /// Successful invocations so far.
    pub counter: u64,
    /// Replayed headers.
    pub headers: HashMap<String, String>,
}

impl From<Hook> for HookSummary {
    fn from(hook: Hook) -> Self {
        Self {
            id: hook.id.to_string(),
            method: hook.method,
            active: hook.active,
            counter: hook.counter,
            headers: hook.headers,
        }
    }
}

/// Response of `GET /v1/debug/routes`.
#[derive(Debug, Serialize)]
pub struct RoutesResponse {
    /// Static route table.
    pub routes: &'static [RouteEntry],
    /// Every registered hook keyed by ID.
    pub hooks: HashMap<String, HookSummary>,
}

/// Response of `GET /v1/debug/private`.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human-readable message.
    pub message: String,
}

/// Lists the route table and every registered hook.
#[instrument(name = "list_routes", skip_all)]
pub async fn list_routes(State(state): State<AppState>) -> Result<Json<RoutesResponse>, ApiError> {
    let hooks = state
        .hooks
        .list_hooks()
        .await?
        .into_iter()
        .map(|(id, hook)| (id.to_string(), HookSummary::from(hook)))
        .collect();

    Ok(Json(RoutesResponse { routes: ROUTES, hooks }))
}

/// Echoes the caller's raw bearer token.
#[instrument(name = "private_message", skip_all)]
pub async fn private_message(
    claims: Option<Extension<VerifiedClaims>>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Some(Extension(claims)) = claims else {
        return Err(AuthError::MissingToken.into());
    };

    Ok(Json(MessageResponse { message: format!("This is my token: {}!", claims.raw()) }))
}
