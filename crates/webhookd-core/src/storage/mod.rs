//! Persistence port for hooks.
//!
//! Everything above this module talks to hooks through `HookRepository`.
//! The only implementation shipped is the in-memory [`memory::HookRegistry`];
//! a table-backed store must honour the same contract:
//!
//! - a missing ID is `Ok(None)`, never an error
//! - every returned `Hook` is an independent copy
//! - mutations of one ID are applied atomically with respect to each other

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::Result,
    models::{Hook, HookId},
};

pub mod memory;

/// Parameters for registering a hook.
#[derive(Debug, Clone, Default)]
pub struct NewHook {
    /// Requested method; validated against the allow-list.
    pub method: String,
    /// Body to replay.
    pub body: String,
    /// Headers to replay; `None` means no headers.
    pub headers: Option<HashMap<String, String>>,
}

impl NewHook {
    /// Creates hook parameters without headers.
    pub fn new(method: impl Into<String>, body: impl Into<String>) -> Self {
        Self { method: method.into(), body: body.into(), headers: None }
    }

    /// Sets the replayed headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }
}

/// Storage operations for hooks.
#[async_trait]
pub trait HookRepository: Send + Sync + std::fmt::Debug + 'static {
    /// Validates and stores a new hook under a freshly generated ID.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::UnsupportedMethod` for methods outside the
    /// allow-list.
    async fn create(&self, new_hook: NewHook, now: DateTime<Utc>) -> Result<Hook>;

    /// Finds a hook by ID.
    async fn get(&self, id: &HookId) -> Result<Option<Hook>>;

    /// Deactivates a hook. Deactivating an inactive hook is a no-op that
    /// still returns it.
    async fn deactivate(&self, id: &HookId) -> Result<Option<Hook>>;

    /// Records one invocation. Does not look at `active`.
    async fn touch(&self, id: &HookId, now: DateTime<Utc>) -> Result<Option<Hook>>;

    /// Returns a snapshot of every hook.
    async fn list(&self) -> Result<HashMap<HookId, Hook>>;

    /// Counts stored hooks, active or not, without copying them.
    async fn count(&self) -> Result<usize>;
}
