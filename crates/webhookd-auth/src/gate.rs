//! Per-request authentication policy.

use std::{sync::Arc, time::Duration};

use http::{HeaderMap, Method, Uri};
use tracing::{debug, instrument};

use crate::{
    claims::VerifiedClaims,
    error::{AuthConfigError, AuthError, KeySourceError},
    extract::{extract_token, TokenExtractor},
    jwks::{KeyCache, DEFAULT_CACHE_TTL, DEFAULT_FETCH_TIMEOUT},
    verifier::TokenVerifier,
};

/// Authentication settings.
///
/// `jwks_url`, `issuer` and `audience` are all-or-nothing: either every one
/// is set and tokens can be verified, or none is and protected routes answer
/// with `AuthError::Misconfigured`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Also authenticate pre-flight `OPTIONS` requests.
    pub enable_auth_on_options: bool,
    /// Token sources, tried in order.
    pub token_extractors: Vec<TokenExtractor>,
    /// JWKS document URL.
    pub jwks_url: String,
    /// Required `iss` claim.
    pub issuer: String,
    /// Required member of the `aud` claim.
    pub audience: String,
    /// Maximum age of the cached key set.
    pub cache_ttl: Duration,
    /// Bound on a single JWKS request.
    pub fetch_timeout: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enable_auth_on_options: false,
            token_extractors: TokenExtractor::DEFAULT.to_vec(),
            jwks_url: String::new(),
            issuer: String::new(),
            audience: String::new(),
            cache_ttl: DEFAULT_CACHE_TTL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl AuthConfig {
    /// Returns whether tokens can be verified with these settings.
    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    /// Returns whether no OAuth setting is present at all.
    pub fn is_unset(&self) -> bool {
        self.missing().len() == 3
    }

    /// Checks the settings for startup.
    ///
    /// # Errors
    ///
    /// - `AuthConfigError::Incomplete` if only part of the OAuth triple is set
    /// - `AuthConfigError::ZeroDuration` for a zero TTL or fetch timeout
    pub fn validate(&self) -> Result<(), AuthConfigError> {
        let missing = self.missing();
        if !missing.is_empty() && missing.len() < 3 {
            return Err(AuthConfigError::Incomplete(missing));
        }
        if self.cache_ttl.is_zero() {
            return Err(AuthConfigError::ZeroDuration("cache_ttl"));
        }
        if self.fetch_timeout.is_zero() {
            return Err(AuthConfigError::ZeroDuration("fetch_timeout"));
        }
        Ok(())
    }

    fn missing(&self) -> Vec<&'static str> {
        [("jwks_url", &self.jwks_url), ("issuer", &self.issuer), ("audience", &self.audience)]
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect()
    }
}

/// Result of a request that passed the gate.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    /// A token was presented and verified.
    Verified(VerifiedClaims),
    /// No token was presented and credentials are optional.
    Anonymous,
    /// Pre-flight request; verification skipped.
    Bypassed,
}

impl AuthOutcome {
    /// Verified claims, if any.
    pub fn claims(&self) -> Option<&VerifiedClaims> {
        match self {
            Self::Verified(claims) => Some(claims),
            Self::Anonymous | Self::Bypassed => None,
        }
    }
}

/// Token extraction and verification policy for a group of routes.
///
/// Cloning shares the underlying verifier and key cache.
#[derive(Debug, Clone)]
pub struct AuthGate {
    verifier: Option<Arc<TokenVerifier>>,
    extractors: Arc<[TokenExtractor]>,
    enable_auth_on_options: bool,
    credentials_optional: bool,
}

impl AuthGate {
    /// Builds a gate, including its key cache when the settings are
    /// complete. Incomplete settings produce a gate that rejects every
    /// non-bypassed request with `AuthError::Misconfigured`.
    ///
    /// # Errors
    ///
    /// Returns `KeySourceError::Unavailable` if the HTTP client for the key
    /// cache cannot be built.
    pub fn new(config: &AuthConfig) -> Result<Self, KeySourceError> {
        let verifier = if config.is_complete() {
            let keys = KeyCache::new(&config.jwks_url, config.cache_ttl, config.fetch_timeout)?;
            Some(TokenVerifier::new(Arc::new(keys), &config.issuer, &config.audience))
        } else {
            None
        };
        Ok(Self::from_parts(config, verifier))
    }

    /// Builds a gate around an existing verifier. Pass `None` for a gate
    /// that reports `Misconfigured`.
    pub fn from_parts(config: &AuthConfig, verifier: Option<TokenVerifier>) -> Self {
        Self {
            verifier: verifier.map(Arc::new),
            extractors: config.token_extractors.clone().into(),
            enable_auth_on_options: config.enable_auth_on_options,
            credentials_optional: false,
        }
    }

    /// Returns a gate sharing this one's verifier that lets requests without
    /// a token through as [`AuthOutcome::Anonymous`].
    #[must_use]
    pub fn credentials_optional(&self) -> Self {
        Self { credentials_optional: true, ..self.clone() }
    }

    /// Returns whether tokens can be verified.
    pub fn is_configured(&self) -> bool {
        self.verifier.is_some()
    }

    /// Verifier behind this gate, if configured.
    pub fn verifier(&self) -> Option<&TokenVerifier> {
        self.verifier.as_deref()
    }

    /// Authenticates one request.
    ///
    /// # Errors
    ///
    /// Returns `Misconfigured` when no verifier is available, any extraction
    /// error, `MissingToken` when credentials are required and absent, and
    /// any verification error.
    #[instrument(skip_all, fields(method = %method))]
    pub async fn authenticate(
        &self,
        method: &Method,
        headers: &HeaderMap,
        uri: &Uri,
    ) -> Result<AuthOutcome, AuthError> {
        if method == Method::OPTIONS && !self.enable_auth_on_options {
            return Ok(AuthOutcome::Bypassed);
        }

        let Some(verifier) = &self.verifier else {
            debug!("Authentication requested but not configured");
            return Err(AuthError::Misconfigured);
        };

        let outcome = match extract_token(&self.extractors, headers, uri)? {
            Some(token) => verifier.verify(&token).await.map(AuthOutcome::Verified),
            None if self.credentials_optional => Ok(AuthOutcome::Anonymous),
            None => Err(AuthError::MissingToken),
        };

        if let Err(e) = &outcome {
            debug!(error = %e, "Request rejected");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> AuthConfig {
        AuthConfig {
            jwks_url: "http://127.0.0.1:9/jwks.json".to_string(),
            issuer: "issuer".to_string(),
            audience: "audience".to_string(),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn all_or_nothing_validation() {
        assert!(AuthConfig::default().validate().is_ok());
        assert!(AuthConfig::default().is_unset());
        assert!(complete().validate().is_ok());
        assert!(complete().is_complete());

        let partial = AuthConfig { audience: String::new(), ..complete() };
        assert_eq!(partial.validate(), Err(AuthConfigError::Incomplete(vec!["audience"])));
    }

    #[test]
    fn zero_durations_are_rejected() {
        let config = AuthConfig { cache_ttl: Duration::ZERO, ..complete() };
        assert_eq!(config.validate(), Err(AuthConfigError::ZeroDuration("cache_ttl")));
    }

    #[tokio::test]
    async fn unconfigured_gate_is_misconfigured_except_for_preflight() {
        let gate = AuthGate::new(&AuthConfig::default()).unwrap();
        let uri: Uri = "/".parse().unwrap();

        assert!(!gate.is_configured());
        assert_eq!(
            gate.authenticate(&Method::GET, &HeaderMap::new(), &uri).await,
            Err(AuthError::Misconfigured)
        );
        assert_eq!(
            gate.authenticate(&Method::OPTIONS, &HeaderMap::new(), &uri).await,
            Ok(AuthOutcome::Bypassed)
        );
    }

    #[tokio::test]
    async fn optional_credentials_admit_anonymous_requests() {
        let gate = AuthGate::new(&complete()).unwrap();
        let uri: Uri = "/".parse().unwrap();

        assert_eq!(
            gate.authenticate(&Method::GET, &HeaderMap::new(), &uri).await,
            Err(AuthError::MissingToken)
        );
        assert_eq!(
            gate.credentials_optional().authenticate(&Method::GET, &HeaderMap::new(), &uri).await,
            Ok(AuthOutcome::Anonymous)
        );
    }
}
