//! Hook invocation.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, instrument};
use webhookd_core::{HookId, Invocation, Replay};

use crate::{error::ApiError, AppState};

/// Invokes a hook with the request's method and replays its response.
#[instrument(name = "invoke_hook", skip(state))]
pub async fn invoke_hook(
    State(state): State<AppState>,
    method: Method,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = HookId::from(id);

    match state.hooks.invoke(&id, method.as_str()).await? {
        Invocation::Replay(replay) => {
            debug!(hook_id = %id, counter = replay.counter, "Replaying hook");
            Ok(replay_response(replay))
        },
        Invocation::NotFound => Err(ApiError::NotFound),
        Invocation::MethodNotAllowed => Err(ApiError::MethodNotAllowed),
    }
}

/// Builds the replayed response. `Content-Length` comes from the body.
pub fn replay_response(replay: Replay) -> Response {
    let mut response = (StatusCode::OK, Body::from(replay.body)).into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));

    for (name, value) in &replay.headers {
        match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            },
            _ => debug!(header = %name, "Skipping header that is not valid HTTP"),
        }
    }

    response
}
