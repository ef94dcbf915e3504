//! In-memory hook registry.
//!
//! A single `RwLock` guards the map: reads share it, every mutation takes
//! the write guard for the whole read-modify-write, so a `touch` racing a
//! `deactivate` on the same hook is always one fully applied after the
//! other.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::{HookRepository, NewHook};
use crate::{
    error::Result,
    models::{Hook, HookId},
};

/// Process-local hook store.
///
/// Each instance is independent; nothing is shared between registries.
#[derive(Debug, Default)]
pub struct HookRegistry {
    hooks: RwLock<HashMap<HookId, Hook>>,
}

impl HookRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored hooks, active or not.
    pub async fn len(&self) -> usize {
        self.hooks.read().await.len()
    }

    /// Returns whether the registry holds no hooks.
    pub async fn is_empty(&self) -> bool {
        self.hooks.read().await.is_empty()
    }

    async fn update(&self, id: &HookId, apply: impl FnOnce(&mut Hook)) -> Option<Hook> {
        let mut hooks = self.hooks.write().await;
        let hook = hooks.get_mut(id)?;
        apply(hook);
        Some(hook.clone())
    }
}

#[async_trait]
impl HookRepository for HookRegistry {
    async fn create(&self, new_hook: NewHook, now: DateTime<Utc>) -> Result<Hook> {
        let hook = Hook::new(HookId::new(), &new_hook.method, new_hook.body, new_hook.headers, now)?;

        let mut hooks = self.hooks.write().await;
        hooks.insert(hook.id.clone(), hook.clone());

        debug!(hook_id = %hook.id, method = %hook.method, "Hook registered");
        Ok(hook)
    }

    async fn get(&self, id: &HookId) -> Result<Option<Hook>> {
        Ok(self.hooks.read().await.get(id).cloned())
    }

    async fn deactivate(&self, id: &HookId) -> Result<Option<Hook>> {
        Ok(self.update(id, Hook::deactivate).await)
    }

    async fn touch(&self, id: &HookId, now: DateTime<Utc>) -> Result<Option<Hook>> {
        Ok(self.update(id, |hook| hook.touch(now)).await)
    }

    async fn list(&self) -> Result<HashMap<HookId, Hook>> {
        Ok(self.hooks.read().await.clone())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.len().await)
    }
}
