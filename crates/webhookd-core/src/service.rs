//! Application service for hook management and invocation.
//!
//! Binds the persistence port to a clock so the transport layer never
//! handles timestamps itself.

use std::{collections::HashMap, sync::Arc};

use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    dispatch::{Invocation, InvocationDispatcher},
    error::Result,
    models::{Hook, HookId},
    storage::{HookRepository, NewHook},
    time::Clock,
};

/// Path prefix under which hooks are invoked.
pub const HOOK_PATH_PREFIX: &str = "/v1/hooks/";

/// Result of registering a hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedHook {
    /// Identifier of the new hook.
    pub id: HookId,
    /// Invocation path, `/v1/hooks/{id}`.
    pub path: String,
}

impl CreatedHook {
    fn for_hook(hook: &Hook) -> Self {
        Self { id: hook.id.clone(), path: format!("{HOOK_PATH_PREFIX}{}", hook.id) }
    }
}

/// Hook operations exposed to the transport layer.
#[derive(Debug, Clone)]
pub struct HookService {
    repository: Arc<dyn HookRepository>,
    dispatcher: InvocationDispatcher,
    clock: Arc<dyn Clock>,
}

impl HookService {
    /// Creates a service over a repository and clock.
    pub fn new(repository: Arc<dyn HookRepository>, clock: Arc<dyn Clock>) -> Self {
        let dispatcher = InvocationDispatcher::new(repository.clone());
        Self { repository, dispatcher, clock }
    }

    /// Registers a new hook.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::UnsupportedMethod` for methods outside the
    /// allow-list.
    #[instrument(skip(self, new_hook), fields(method = %new_hook.method))]
    pub async fn create_hook(&self, new_hook: NewHook) -> Result<CreatedHook> {
        let hook = self.repository.create(new_hook, self.clock.now_utc()).await?;
        info!(hook_id = %hook.id, method = %hook.method, "Hook created");
        Ok(CreatedHook::for_hook(&hook))
    }

    /// Returns a hook by ID.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn get_hook(&self, id: &HookId) -> Result<Option<Hook>> {
        self.repository.get(id).await
    }

    /// Deactivates a hook, returning it if it exists.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    #[instrument(skip(self), fields(hook_id = %id))]
    pub async fn deactivate_hook(&self, id: &HookId) -> Result<Option<Hook>> {
        let hook = self.repository.deactivate(id).await?;
        if hook.is_some() {
            info!(hook_id = %id, "Hook deactivated");
        }
        Ok(hook)
    }

    /// Invokes a hook with the inbound request method.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn invoke(&self, id: &HookId, method: &str) -> Result<Invocation> {
        self.dispatcher.dispatch(id, method, self.clock.now_utc()).await
    }

    /// Returns a snapshot of every hook.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn list_hooks(&self) -> Result<HashMap<HookId, Hook>> {
        self.repository.list().await
    }

    /// Number of registered hooks, active or not.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn count_hooks(&self) -> Result<usize> {
        self.repository.count().await
    }
}
