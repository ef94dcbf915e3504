//! Invocation dispatch, independent of the HTTP framework.
//!
//! Decides whether an inbound request replays a hook and records the call.
//! The transport layer only has to turn an [`Invocation`] into a response.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{error::Result, models::HookId, storage::HookRepository};

/// Header never replayed from a stored hook; the transport computes it.
const CONTENT_LENGTH: &str = "content-length";

/// Outcome of invoking a hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// The hook matched; replay this response.
    Replay(Replay),
    /// No such hook, or the hook was deactivated.
    NotFound,
    /// The hook exists but answers to a different method.
    MethodNotAllowed,
}

/// Canned response to emit for a matched hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replay {
    /// Response payload.
    pub body: String,
    /// Response headers, without `Content-Length`.
    pub headers: HashMap<String, String>,
    /// Invocation count including this call.
    pub counter: u64,
}

/// Matches inbound requests against stored hooks.
#[derive(Debug, Clone)]
pub struct InvocationDispatcher {
    repository: Arc<dyn HookRepository>,
}

impl InvocationDispatcher {
    /// Creates a dispatcher over the given repository.
    pub fn new(repository: Arc<dyn HookRepository>) -> Self {
        Self { repository }
    }

    /// Dispatches one inbound request.
    ///
    /// Checks existence and activity first, then the method, and only then
    /// records the call, so rejected requests never move the counter.
    ///
    /// # Errors
    ///
    /// Propagates storage failures from the repository.
    pub async fn dispatch(
        &self,
        id: &HookId,
        method: &str,
        now: DateTime<Utc>,
    ) -> Result<Invocation> {
        let hook = match self.repository.get(id).await? {
            Some(hook) if hook.active => hook,
            _ => {
                debug!(hook_id = %id, "Hook not found or inactive");
                return Ok(Invocation::NotFound);
            },
        };

        if !hook.matches_method(method) {
            debug!(hook_id = %id, expected = %hook.method, received = method, "Method mismatch");
            return Ok(Invocation::MethodNotAllowed);
        }

        let Some(hook) = self.repository.touch(id, now).await? else {
            return Ok(Invocation::NotFound);
        };

        let headers = hook
            .headers
            .into_iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case(CONTENT_LENGTH))
            .collect();

        Ok(Invocation::Replay(Replay { body: hook.body, headers, counter: hook.counter }))
    }
}
