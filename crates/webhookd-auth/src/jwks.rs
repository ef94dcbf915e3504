//! Signing-key cache backed by a remote JWKS document.
//!
//! Keys are published as X.509 certificates (`x5c`) and indexed by `kid`.
//! The whole key map is swapped on each successful refresh, never edited
//! in place, so a reader sees either the previous set or the new one.
//!
//! Refreshes are serialized by a mutex and double-checked: a caller that
//! waited on another caller's refresh finds the cache fresh and returns
//! without touching the network. Readers take only the snapshot read lock
//! and never wait on I/O.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use base64::{engine::general_purpose::STANDARD, Engine};
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};
use webhookd_core::{Clock, RealClock};
use x509_parser::{parse_x509_certificate, public_key::PublicKey};

use crate::error::KeySourceError;

/// Default maximum age of a key set before it is refetched.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default bound on a single JWKS request.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// JWKS document. Members other than `keys` are ignored.
#[derive(Debug, Deserialize)]
struct JwkSet {
    #[serde(default)]
    keys: Vec<Jwk>,
}

/// The parts of a JWK this cache reads.
#[derive(Debug, Deserialize)]
struct Jwk {
    #[serde(default)]
    kid: Option<String>,
    #[serde(default)]
    x5c: Option<Vec<String>>,
}

#[derive(Default)]
struct KeySnapshot {
    keys: HashMap<String, Arc<DecodingKey>>,
    fetched_at: Option<Instant>,
}

/// Cache of RSA verification keys fetched from a JWKS endpoint.
pub struct KeyCache {
    url: String,
    ttl: Duration,
    http_client: reqwest::Client,
    clock: Arc<dyn Clock>,
    snapshot: RwLock<KeySnapshot>,
    refresh_lock: Mutex<()>,
}

impl KeyCache {
    /// Creates an empty cache for `url` with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `KeySourceError::Unavailable` if the HTTP client cannot be
    /// built.
    pub fn new(
        url: impl Into<String>,
        ttl: Duration,
        fetch_timeout: Duration,
    ) -> Result<Self, KeySourceError> {
        let http_client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .map_err(|e| KeySourceError::Unavailable(format!("HTTP client: {e}")))?;
        Ok(Self::with_http_client(url, ttl, http_client))
    }

    /// Creates an empty cache using a preconfigured HTTP client.
    pub fn with_http_client(url: impl Into<String>, ttl: Duration, http_client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            ttl,
            http_client,
            clock: Arc::new(RealClock::new()),
            snapshot: RwLock::new(KeySnapshot::default()),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Replaces the clock used to age the snapshot.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// JWKS endpoint this cache reads from.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the key for `kid` if the snapshot holds it and is within its
    /// time-to-live.
    pub async fn get_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let snapshot = self.snapshot.read().await;
        if !self.within_ttl(snapshot.fetched_at) {
            return None;
        }
        snapshot.keys.get(kid).cloned()
    }

    /// Returns whether the snapshot is non-empty and within its time-to-live.
    pub async fn is_fresh(&self) -> bool {
        let snapshot = self.snapshot.read().await;
        !snapshot.keys.is_empty() && self.within_ttl(snapshot.fetched_at)
    }

    /// Number of keys in the current snapshot, stale or not.
    pub async fn len(&self) -> usize {
        self.snapshot.read().await.keys.len()
    }

    /// Returns whether no keys have been loaded.
    pub async fn is_empty(&self) -> bool {
        self.snapshot.read().await.keys.is_empty()
    }

    /// Refetches the key set unless another caller already refreshed it.
    ///
    /// On success the snapshot is replaced with exactly the keys parsed from
    /// the new document. On failure the previous snapshot is kept. Dropping
    /// the returned future aborts the request and releases the refresh lock.
    ///
    /// # Errors
    ///
    /// - `KeySourceError::Unavailable` on transport failure, non-success
    ///   status, or an undecodable document
    /// - `KeySourceError::Empty` if no entry yielded a usable RSA key
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn refresh(&self) -> Result<(), KeySourceError> {
        let _guard = self.refresh_lock.lock().await;

        if self.is_fresh().await {
            debug!("Key set already refreshed, skipping fetch");
            return Ok(());
        }

        let document = self.fetch().await?;
        let total = document.keys.len();
        let keys = parse_key_set(document);

        if keys.is_empty() {
            warn!(entries = total, "JWKS contained no usable keys");
            return Err(KeySourceError::Empty);
        }

        let loaded = keys.len();
        *self.snapshot.write().await = KeySnapshot { keys, fetched_at: Some(self.clock.now()) };

        info!(loaded, skipped = total - loaded, "Signing keys refreshed");
        Ok(())
    }

    fn within_ttl(&self, fetched_at: Option<Instant>) -> bool {
        fetched_at.is_some_and(|at| self.clock.now().saturating_duration_since(at) <= self.ttl)
    }

    async fn fetch(&self) -> Result<JwkSet, KeySourceError> {
        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| KeySourceError::Unavailable(format!("HTTP error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(KeySourceError::Unavailable(format!("HTTP status {status}")));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| KeySourceError::Unavailable(format!("JSON parse error: {e}")))
    }
}

impl std::fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCache").field("url", &self.url).field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

fn parse_key_set(document: JwkSet) -> HashMap<String, Arc<DecodingKey>> {
    let mut keys = HashMap::with_capacity(document.keys.len());

    for jwk in document.keys {
        let Some(kid) = jwk.kid.filter(|kid| !kid.is_empty()) else {
            debug!("Skipping JWKS entry without kid");
            continue;
        };

        let Some(certificate) = jwk.x5c.as_deref().and_then(<[String]>::first) else {
            debug!(kid = %kid, "Skipping JWKS entry without x5c");
            continue;
        };

        match decoding_key_from_x5c(certificate) {
            Ok(key) => {
                keys.insert(kid, Arc::new(key));
            },
            Err(reason) => debug!(kid = %kid, reason, "Skipping JWKS entry"),
        }
    }

    keys
}

fn decoding_key_from_x5c(certificate: &str) -> Result<DecodingKey, &'static str> {
    let der = STANDARD.decode(certificate.trim()).map_err(|_| "invalid base64")?;
    let (_, cert) = parse_x509_certificate(&der).map_err(|_| "invalid certificate")?;
    let spki = cert.public_key();

    match spki.parsed() {
        // The subject key bit string of an RSA certificate is the PKCS#1
        // RSAPublicKey structure.
        Ok(PublicKey::RSA(_)) => Ok(DecodingKey::from_rsa_der(&spki.subject_public_key.data)),
        Ok(_) => Err("not an RSA key"),
        Err(_) => Err("unreadable public key"),
    }
}
