//! Shared application state handed to every handler.

use std::{sync::Arc, time::Duration};

use webhookd_auth::{AuthGate, KeySourceError};
use webhookd_core::{Clock, HookRegistry, HookService, RealClock};

use crate::config::Config;

/// Which route groups require a bearer token.
///
/// `/v1/debug/private` always does; `/healthz` never does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteProtection {
    /// `/v1/webhooks` and `/v1/debug/routes`.
    pub management: bool,
    /// `/v1/hooks/{id}`.
    pub invocation: bool,
}

/// State shared by all handlers. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Hook management and invocation.
    pub hooks: HookService,
    /// Authentication policy for protected route groups.
    pub auth: AuthGate,
    /// Route groups requiring authentication.
    pub protection: RouteProtection,
    /// Upper bound on handling a single request.
    pub request_timeout: Duration,
    /// Clock for response timestamps.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Creates state with no route groups protected and a 30 second timeout.
    pub fn new(hooks: HookService, auth: AuthGate, clock: Arc<dyn Clock>) -> Self {
        Self {
            hooks,
            auth,
            protection: RouteProtection::default(),
            request_timeout: Duration::from_secs(30),
            clock,
        }
    }

    /// Builds the production wiring: an in-memory registry, the real clock
    /// and an auth gate from the OAuth settings.
    ///
    /// # Errors
    ///
    /// Returns `KeySourceError` if the JWKS HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, KeySourceError> {
        let clock: Arc<dyn Clock> = Arc::new(RealClock::new());
        let hooks = HookService::new(Arc::new(HookRegistry::new()), clock.clone());
        let auth = AuthGate::new(&config.to_auth_config())?;

        Ok(Self::new(hooks, auth, clock)
            .with_protection(config.route_protection())
            .with_request_timeout(config.request_timeout()))
    }

    /// Sets which route groups require authentication.
    #[must_use]
    pub fn with_protection(mut self, protection: RouteProtection) -> Self {
        self.protection = protection;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
