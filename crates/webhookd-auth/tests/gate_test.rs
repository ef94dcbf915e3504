//! Request-level policy: extraction, pre-flight bypass, optional credentials.

use std::{sync::Arc, time::Duration};

use http::{header::AUTHORIZATION, HeaderMap, HeaderValue, Method, Uri};
use webhookd_auth::{
    AuthConfig, AuthError, AuthGate, AuthOutcome, KeyCache, TokenExtractor, TokenVerifier,
};
use webhookd_testing::{JwksServer, KeyPair, TestClock, TokenBuilder, TEST_AUDIENCE, TEST_ISSUER};

fn config(server: &JwksServer) -> AuthConfig {
    AuthConfig {
        jwks_url: server.url(),
        issuer: TEST_ISSUER.to_string(),
        audience: TEST_AUDIENCE.to_string(),
        ..AuthConfig::default()
    }
}

fn gate(server: &JwksServer, config: &AuthConfig) -> AuthGate {
    let keys = KeyCache::new(server.url(), config.cache_ttl, Duration::from_secs(5))
        .unwrap()
        .with_clock(Arc::new(TestClock::new()));
    AuthGate::from_parts(config, Some(TokenVerifier::new(Arc::new(keys), TEST_ISSUER, TEST_AUDIENCE)))
}

fn bearer(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}")).unwrap());
    headers
}

fn root() -> Uri {
    Uri::from_static("/v1/hooks/abc")
}

#[tokio::test]
async fn header_token_is_verified() {
    let server = JwksServer::with_keys(&[KeyPair::primary()]).await;
    let gate = gate(&server, &config(&server));
    let token = TokenBuilder::new().sign(&KeyPair::primary());

    let outcome = gate.authenticate(&Method::GET, &bearer(&token), &root()).await.unwrap();

    assert_eq!(outcome.claims().map(|c| c.raw()), Some(token.as_str()));
}

#[tokio::test]
async fn missing_token_is_rejected() {
    let server = JwksServer::with_keys(&[KeyPair::primary()]).await;
    let gate = gate(&server, &config(&server));

    assert_eq!(
        gate.authenticate(&Method::POST, &HeaderMap::new(), &root()).await,
        Err(AuthError::MissingToken)
    );
}

#[tokio::test]
async fn query_token_requires_params_extractor() {
    let server = JwksServer::with_keys(&[KeyPair::primary()]).await;
    let token = TokenBuilder::new().sign(&KeyPair::primary());
    let uri: Uri = format!("/v1/hooks/abc?access_token={token}").parse().unwrap();

    let headers_only = gate(&server, &config(&server));
    assert_eq!(
        headers_only.authenticate(&Method::GET, &HeaderMap::new(), &uri).await,
        Err(AuthError::MissingToken)
    );

    let with_params = AuthConfig {
        token_extractors: vec![TokenExtractor::Headers, TokenExtractor::Params],
        ..config(&server)
    };
    let outcome =
        gate(&server, &with_params).authenticate(&Method::GET, &HeaderMap::new(), &uri).await.unwrap();
    assert!(matches!(outcome, AuthOutcome::Verified(_)));
}

#[tokio::test]
async fn malformed_header_does_not_fall_back_to_params() {
    let server = JwksServer::with_keys(&[KeyPair::primary()]).await;
    let token = TokenBuilder::new().sign(&KeyPair::primary());
    let uri: Uri = format!("/v1/hooks/abc?token={token}").parse().unwrap();
    let config = AuthConfig {
        token_extractors: vec![TokenExtractor::Headers, TokenExtractor::Params],
        ..config(&server)
    };

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_static("Token abc"));

    assert_eq!(
        gate(&server, &config).authenticate(&Method::GET, &headers, &uri).await,
        Err(AuthError::MalformedHeader)
    );
    assert_eq!(server.request_count().await, 0);
}

#[tokio::test]
async fn preflight_bypasses_unless_enabled() {
    let server = JwksServer::with_keys(&[KeyPair::primary()]).await;

    let gate_default = gate(&server, &config(&server));
    assert_eq!(
        gate_default.authenticate(&Method::OPTIONS, &HeaderMap::new(), &root()).await,
        Ok(AuthOutcome::Bypassed)
    );

    let strict = AuthConfig { enable_auth_on_options: true, ..config(&server) };
    assert_eq!(
        gate(&server, &strict).authenticate(&Method::OPTIONS, &HeaderMap::new(), &root()).await,
        Err(AuthError::MissingToken)
    );
}

#[tokio::test]
async fn optional_credentials_still_verify_presented_tokens() {
    let server = JwksServer::with_keys(&[KeyPair::primary()]).await;
    let gate = gate(&server, &config(&server)).credentials_optional();

    let bad = TokenBuilder::new().issuer("elsewhere").sign(&KeyPair::primary());
    assert_eq!(
        gate.authenticate(&Method::GET, &bearer(&bad), &root()).await,
        Err(AuthError::InvalidIssuer)
    );
    assert_eq!(
        gate.authenticate(&Method::GET, &HeaderMap::new(), &root()).await,
        Ok(AuthOutcome::Anonymous)
    );
}

#[tokio::test]
async fn incomplete_config_is_misconfigured_before_any_fetch() {
    let server = JwksServer::with_keys(&[KeyPair::primary()]).await;
    let partial = AuthConfig { issuer: String::new(), ..config(&server) };
    let gate = AuthGate::new(&partial).unwrap();
    let token = TokenBuilder::new().sign(&KeyPair::primary());

    assert_eq!(
        gate.authenticate(&Method::GET, &bearer(&token), &root()).await,
        Err(AuthError::Misconfigured)
    );
    assert_eq!(server.request_count().await, 0);
}

#[tokio::test]
async fn gate_built_from_config_verifies_tokens() {
    let server = JwksServer::with_keys(&[KeyPair::primary()]).await;
    let gate = AuthGate::new(&config(&server)).unwrap();
    let token = TokenBuilder::new().sign(&KeyPair::primary());

    assert!(gate.is_configured());
    assert!(gate.authenticate(&Method::DELETE, &bearer(&token), &root()).await.is_ok());
}
