//! Token minting for authentication tests.

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};

use crate::{fixtures::KeyPair, TEST_AUDIENCE, TEST_ISSUER};

/// Builds signed JWTs with controllable header and claims.
///
/// Defaults to the test issuer and audience, a subject, and an expiry one
/// hour from now.
///
/// ```
/// use webhookd_testing::{KeyPair, TokenBuilder};
///
/// let token = TokenBuilder::new().audience_list(["other", "webhookd-api"]).sign(&KeyPair::primary());
/// assert_eq!(token.split('.').count(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct TokenBuilder {
    claims: Map<String, Value>,
    kid: Option<String>,
    omit_kid: bool,
}

impl Default for TokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenBuilder {
    /// Creates a builder with default claims.
    pub fn new() -> Self {
        let mut claims = Map::new();
        claims.insert("iss".to_string(), json!(TEST_ISSUER));
        claims.insert("aud".to_string(), json!(TEST_AUDIENCE));
        claims.insert("sub".to_string(), json!("test-user"));
        claims.insert("exp".to_string(), json!(Utc::now().timestamp() + 3600));
        Self { claims, kid: None, omit_kid: false }
    }

    /// Sets the `iss` claim.
    #[must_use]
    pub fn issuer(self, issuer: &str) -> Self {
        self.claim("iss", json!(issuer))
    }

    /// Sets `aud` to a single string.
    #[must_use]
    pub fn audience(self, audience: &str) -> Self {
        self.claim("aud", json!(audience))
    }

    /// Sets `aud` to an array of strings.
    #[must_use]
    pub fn audience_list<'a>(self, audiences: impl IntoIterator<Item = &'a str>) -> Self {
        self.claim("aud", Value::Array(audiences.into_iter().map(|a| json!(a)).collect()))
    }

    /// Sets `exp` relative to now.
    #[must_use]
    pub fn expires_in(self, seconds: i64) -> Self {
        self.claim("exp", json!(Utc::now().timestamp() + seconds))
    }

    /// Sets or replaces an arbitrary claim.
    #[must_use]
    pub fn claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Removes a claim.
    #[must_use]
    pub fn without_claim(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Overrides the header `kid`; by default the signing key's `kid` is used.
    #[must_use]
    pub fn kid(mut self, kid: &str) -> Self {
        self.kid = Some(kid.to_string());
        self
    }

    /// Leaves `kid` out of the header.
    #[must_use]
    pub fn without_kid(mut self) -> Self {
        self.omit_kid = true;
        self
    }

    /// Signs with RS256 using the fixture key.
    ///
    /// # Panics
    ///
    /// Panics if the fixture key cannot be loaded.
    pub fn sign(&self, key: &KeyPair) -> String {
        self.sign_rsa(key, Algorithm::RS256)
    }

    /// Signs with another RSA algorithm (`RS384`, `RS512`, `PS256`, ...)
    /// using the fixture key.
    ///
    /// # Panics
    ///
    /// Panics if the fixture key cannot be loaded or `algorithm` is not an
    /// RSA algorithm.
    pub fn sign_rsa(&self, key: &KeyPair, algorithm: Algorithm) -> String {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key_pem.as_bytes())
            .unwrap_or_else(|e| panic!("fixture key {} is not a valid RSA PEM: {e}", key.kid));
        self.encode(algorithm, key.kid, &encoding_key)
    }

    /// Signs with HS256 using a shared secret, keeping the RS256 key's `kid`.
    ///
    /// # Panics
    ///
    /// Panics if encoding fails.
    pub fn sign_hs256(&self, kid: &str, secret: &[u8]) -> String {
        self.encode(Algorithm::HS256, kid, &EncodingKey::from_secret(secret))
    }

    fn encode(&self, algorithm: Algorithm, default_kid: &str, key: &EncodingKey) -> String {
        let mut header = Header::new(algorithm);
        if !self.omit_kid {
            header.kid = Some(self.kid.clone().unwrap_or_else(|| default_kid.to_string()));
        }
        encode(&header, &self.claims, key).unwrap_or_else(|e| panic!("token encoding failed: {e}"))
    }
}
