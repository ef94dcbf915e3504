//! Hook entity and strongly-typed identifiers.
//!
//! A hook is a stub endpoint: it remembers one HTTP method, a canned body and
//! a set of response headers, and counts how often it was invoked. Hooks are
//! only ever mutated inside a repository; everything handed out is a clone.

use std::{collections::HashMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Opaque hook identifier.
///
/// Generated from a random UUID at creation time and never reused. Callers
/// only ever see it as a string path segment.
///
/// # Example
///
/// ```
/// use webhookd_core::models::HookId;
/// let id = HookId::new();
/// println!("/v1/hooks/{id}");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HookId(String);

impl HookId {
    /// Creates a new random hook ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for HookId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for HookId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for HookId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// HTTP methods a hook may be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HookMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
    /// `OPTIONS`
    Options,
}

impl HookMethod {
    /// Every supported method, in registration order.
    pub const ALL: [Self; 6] =
        [Self::Get, Self::Post, Self::Put, Self::Patch, Self::Delete, Self::Options];

    /// Returns the canonical uppercase method name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
        }
    }

    /// Returns whether an inbound request method matches this one.
    ///
    /// The inbound method is normalized first, so `" get "` and `""` both
    /// match [`HookMethod::Get`].
    pub fn matches(self, inbound: &str) -> bool {
        normalize_method(inbound).eq_ignore_ascii_case(self.as_str())
    }
}

impl fmt::Display for HookMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_method(s);
        Self::ALL
            .into_iter()
            .find(|method| method.as_str() == normalized)
            .ok_or(CoreError::UnsupportedMethod(normalized))
    }
}

/// Trims and uppercases a method name; empty means `GET`.
pub fn normalize_method(method: &str) -> String {
    let trimmed = method.trim();
    if trimmed.is_empty() {
        HookMethod::Get.as_str().to_string()
    } else {
        trimmed.to_ascii_uppercase()
    }
}

/// A registered hook and its invocation statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hook {
    /// Unique identifier for this hook.
    pub id: HookId,

    /// Method the hook answers to.
    pub method: HookMethod,

    /// Body replayed verbatim on every invocation.
    pub body: String,

    /// Headers applied to every invocation response.
    pub headers: HashMap<String, String>,

    /// Inactive hooks report not-found on invocation.
    pub active: bool,

    /// Number of successful invocations.
    pub counter: u64,

    /// Time of the last successful invocation; the Unix epoch until then.
    pub last_call: DateTime<Utc>,

    /// When this hook was created.
    pub created: DateTime<Utc>,
}

impl Hook {
    /// Builds a fresh, active hook.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::UnsupportedMethod` if `method` is outside the
    /// allow-list after normalization.
    pub fn new(
        id: HookId,
        method: &str,
        body: impl Into<String>,
        headers: Option<HashMap<String, String>>,
        now: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        let method = method.parse::<HookMethod>()?;

        Ok(Self {
            id,
            method,
            body: body.into(),
            headers: headers.unwrap_or_default(),
            active: true,
            counter: 0,
            last_call: DateTime::<Utc>::UNIX_EPOCH,
            created: now,
        })
    }

    /// Marks the hook inactive. Deactivation is permanent.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Records one invocation at `now`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.counter = self.counter.saturating_add(1);
        self.last_call = now;
    }

    /// Returns whether the inbound request method matches this hook.
    pub fn matches_method(&self, inbound: &str) -> bool {
        self.method.matches(inbound)
    }

    /// Returns whether the hook has been invoked at least once.
    pub fn was_called(&self) -> bool {
        self.counter > 0
    }
}
