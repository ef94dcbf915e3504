//! Health check handler for service monitoring.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, instrument};
use webhookd_core::{Clock, HookService};

use crate::AppState;

/// Health check response structure.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service health status
    pub status: HealthStatus,
    /// Timestamp when health check was performed
    pub timestamp: DateTime<Utc>,
    /// Service version information
    pub version: String,
    /// Number of registered hooks, active or not
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hooks: Option<usize>,
    /// Whether bearer tokens can be verified
    pub auth_configured: bool,
}

/// Overall health status enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All systems operational
    Healthy,
    /// Hook storage is failing
    Unhealthy,
}

/// Health service that encapsulates clock dependency for testable health
/// checks.
pub struct HealthService {
    clock: Arc<dyn Clock>,
}

impl HealthService {
    /// Creates a new health service with the given clock.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Checks hook storage and reports service health.
    pub async fn health_check(&self, hooks: &HookService, auth_configured: bool) -> HealthResponse {
        debug!("Performing health check");

        let timestamp = self.clock.now_utc();

        let (status, count) = match hooks.count_hooks().await {
            Ok(count) => (HealthStatus::Healthy, Some(count)),
            Err(e) => {
                error!(error = %e, "Hook storage health check failed");
                (HealthStatus::Unhealthy, None)
            },
        };

        HealthResponse {
            status,
            timestamp,
            version: env!("CARGO_PKG_VERSION").to_string(),
            hooks: count,
            auth_configured,
        }
    }
}

/// Health check endpoint handler.
///
/// Never authenticated; answers `503` only when hook storage fails.
#[instrument(name = "health_check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Response {
    let health_service = HealthService::new(state.clock.clone());
    let response = health_service.health_check(&state.hooks, state.auth.is_configured()).await;

    let status_code = match response.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    debug!(status = ?response.status, hooks = ?response.hooks, "Health check completed");

    (status_code, Json(response)).into_response()
}
