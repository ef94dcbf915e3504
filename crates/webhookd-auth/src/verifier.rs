//! RS256 bearer-token verification.

use std::sync::Arc;

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::{
    claims::{Audience, VerifiedClaims},
    error::AuthError,
    jwks::KeyCache,
};

/// Verifies tokens against the keys in a [`KeyCache`].
///
/// Checks run in a fixed order: header and algorithm, key lookup,
/// signature (plus `exp`/`nbf` when present), issuer, audience. The
/// algorithm is checked before any key lookup so a token can never force a
/// JWKS fetch unless it at least claims RS256.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    keys: Arc<KeyCache>,
    issuer: String,
    audience: String,
    validation: Validation,
}

impl TokenVerifier {
    /// Creates a verifier for tokens issued by `issuer` for `audience`.
    pub fn new(keys: Arc<KeyCache>, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.required_spec_claims.clear();
        // Audience and issuer are checked by hand to classify failures.
        validation.validate_aud = false;

        Self { keys, issuer: issuer.into(), audience: audience.into(), validation }
    }

    /// Key cache backing this verifier.
    pub fn key_cache(&self) -> &Arc<KeyCache> {
        &self.keys
    }

    /// Verifies a raw token.
    ///
    /// # Errors
    ///
    /// - `InvalidToken` for undecodable tokens, algorithms other than RS256,
    ///   a missing `kid`, bad signatures, or expired tokens
    /// - `UnknownKey` if `kid` is not published even after a refresh
    /// - `KeySource` if that refresh failed
    /// - `InvalidIssuer` / `InvalidAudience` for claim mismatches
    #[instrument(skip_all)]
    pub async fn verify(&self, raw: &str) -> Result<VerifiedClaims, AuthError> {
        let header = decode_header(raw).map_err(|e| {
            debug!(error = %e, "Token header rejected");
            AuthError::InvalidToken
        })?;

        if header.alg != Algorithm::RS256 {
            debug!(alg = ?header.alg, "Token algorithm rejected");
            return Err(AuthError::InvalidToken);
        }

        let Some(kid) = header.kid.filter(|kid| !kid.is_empty()) else {
            debug!("Token has no kid");
            return Err(AuthError::InvalidToken);
        };

        let key = self.resolve_key(&kid).await?;

        let claims = decode::<Map<String, Value>>(raw, &key, &self.validation)
            .map_err(|e| {
                debug!(kid = %kid, error = %e, "Token signature rejected");
                AuthError::InvalidToken
            })?
            .claims;

        if claims.get("iss").and_then(Value::as_str) != Some(self.issuer.as_str()) {
            debug!(kid = %kid, "Token issuer rejected");
            return Err(AuthError::InvalidIssuer);
        }

        if !Audience::from_claims(&claims).is_some_and(|aud| aud.contains(&self.audience)) {
            debug!(kid = %kid, "Token audience rejected");
            return Err(AuthError::InvalidAudience);
        }

        Ok(VerifiedClaims::new(raw.to_string(), claims))
    }

    async fn resolve_key(&self, kid: &str) -> Result<Arc<DecodingKey>, AuthError> {
        if let Some(key) = self.keys.get_key(kid).await {
            return Ok(key);
        }

        self.keys.refresh().await?;

        self.keys.get_key(kid).await.ok_or_else(|| {
            debug!(kid, "Token kid not published");
            AuthError::UnknownKey
        })
    }
}
