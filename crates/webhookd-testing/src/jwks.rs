//! Mock JWKS endpoint backed by wiremock.

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::fixtures::KeyPair;

const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Returns the JWKS entry publishing `key` through its certificate.
pub fn jwk_entry(key: &KeyPair) -> Value {
    json!({
        "kty": "RSA",
        "use": "sig",
        "alg": "RS256",
        "kid": key.kid,
        "x5c": [key.x5c()],
    })
}

/// Wraps entries in a `{ "keys": [...] }` document.
pub fn jwks_document(entries: impl IntoIterator<Item = Value>) -> Value {
    json!({ "keys": entries.into_iter().collect::<Vec<_>>() })
}

/// A local HTTP server publishing a JWKS document.
pub struct JwksServer {
    server: MockServer,
}

impl JwksServer {
    /// Starts a server with nothing mounted; every request gets a 404.
    pub async fn start() -> Self {
        Self { server: MockServer::start().await }
    }

    /// Starts a server publishing the given keys.
    pub async fn with_keys(keys: &[KeyPair]) -> Self {
        let server = Self::start().await;
        server.publish(jwks_document(keys.iter().map(jwk_entry))).await;
        server
    }

    /// URL of the JWKS document.
    pub fn url(&self) -> String {
        format!("{}{JWKS_PATH}", self.server.uri())
    }

    /// Replaces whatever is published with `document`.
    pub async fn publish(&self, document: Value) {
        self.respond_with(ResponseTemplate::new(200).set_body_json(document)).await;
    }

    /// Replaces whatever is published with `document`, served after `delay`.
    pub async fn publish_delayed(&self, document: Value, delay: Duration) {
        self.respond_with(ResponseTemplate::new(200).set_body_json(document).set_delay(delay))
            .await;
    }

    /// Makes the endpoint answer with a bare status code.
    pub async fn fail_with(&self, status: u16) {
        self.respond_with(ResponseTemplate::new(status)).await;
    }

    /// Makes the endpoint answer with a body that is not a JWKS document.
    pub async fn serve_garbage(&self) {
        self.respond_with(ResponseTemplate::new(200).set_body_string("not json")).await;
    }

    /// Number of requests received since start or the last `publish`.
    pub async fn request_count(&self) -> usize {
        self.server.received_requests().await.map_or(0, |requests| requests.len())
    }

    async fn respond_with(&self, template: ResponseTemplate) {
        self.server.reset().await;
        Mock::given(method("GET")).and(path(JWKS_PATH)).respond_with(template).mount(&self.server).await;
    }
}

impl std::fmt::Debug for JwksServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksServer").field("url", &self.url()).finish()
    }
}
