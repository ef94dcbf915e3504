//! Hook registration and deactivation.

use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use webhookd_auth::VerifiedClaims;
use webhookd_core::{CreatedHook, HookId, NewHook};

use crate::{error::ApiError, AppState};

/// Request body for registering a hook.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateWebhookRequest {
    /// Method the hook answers to; empty means `GET`.
    #[serde(default)]
    pub method: String,
    /// Body replayed on every invocation.
    #[serde(default)]
    pub body: String,
    /// Headers replayed on every invocation.
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
}

impl From<CreateWebhookRequest> for NewHook {
    fn from(req: CreateWebhookRequest) -> Self {
        let new_hook = NewHook::new(req.method, req.body);
        match req.headers {
            Some(headers) => new_hook.with_headers(headers),
            None => new_hook,
        }
    }
}

/// Response body for a deactivated hook.
#[derive(Debug, Serialize)]
pub struct DeactivateResponse {
    /// Always `deactivated`.
    pub message: &'static str,
    /// Identifier of the deactivated hook.
    pub id: HookId,
}

/// Registers a hook and returns its ID and invocation path.
#[instrument(name = "create_webhook", skip_all)]
pub async fn create_webhook(
    State(state): State<AppState>,
    claims: Option<Extension<VerifiedClaims>>,
    payload: Result<Json<CreateWebhookRequest>, JsonRejection>,
) -> Result<Json<CreatedHook>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let created = state.hooks.create_hook(request.into()).await?;

    if let Some(subject) = claims.as_ref().and_then(|Extension(claims)| claims.subject()) {
        info!(hook_id = %created.id, subject, "Hook registered by authenticated caller");
    }

    Ok(Json(created))
}

/// Deactivates a hook. Unknown IDs answer `404`.
#[instrument(name = "deactivate_webhook", skip(state))]
pub async fn deactivate_webhook(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeactivateResponse>, ApiError> {
    let id = HookId::from(id);

    match state.hooks.deactivate_hook(&id).await? {
        Some(hook) => Ok(Json(DeactivateResponse { message: "deactivated", id: hook.id })),
        None => Err(ApiError::NotFound),
    }
}
