//! Key cache behaviour against a mock JWKS endpoint.

use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use serde_json::json;
use webhookd_auth::{KeyCache, KeySourceError};
use webhookd_testing::{jwk_entry, jwks_document, JwksServer, KeyPair, TestClock};

const TTL: Duration = Duration::from_secs(300);

fn cache(server: &JwksServer, clock: &TestClock) -> KeyCache {
    KeyCache::new(server.url(), TTL, Duration::from_secs(5))
        .unwrap()
        .with_clock(Arc::new(clock.clone()))
}

#[tokio::test]
async fn starts_cold() {
    let server = JwksServer::with_keys(&[KeyPair::primary()]).await;
    let cache = cache(&server, &TestClock::new());

    assert!(cache.is_empty().await);
    assert!(!cache.is_fresh().await);
    assert!(cache.get_key("primary").await.is_none());
    assert_eq!(server.request_count().await, 0);
}

#[tokio::test]
async fn refresh_loads_published_keys() {
    let server = JwksServer::with_keys(&[KeyPair::primary(), KeyPair::secondary()]).await;
    let cache = cache(&server, &TestClock::new());

    cache.refresh().await.unwrap();

    assert_eq!(cache.len().await, 2);
    assert!(cache.is_fresh().await);
    assert!(cache.get_key("primary").await.is_some());
    assert!(cache.get_key("secondary").await.is_some());
}

#[tokio::test]
async fn snapshot_is_replaced_not_merged() {
    let server = JwksServer::with_keys(&[KeyPair::primary()]).await;
    let clock = TestClock::new();
    let cache = cache(&server, &clock);
    cache.refresh().await.unwrap();

    server.publish(jwks_document([jwk_entry(&KeyPair::secondary())])).await;
    clock.advance(TTL + Duration::from_secs(1));
    cache.refresh().await.unwrap();

    assert_eq!(cache.len().await, 1);
    assert!(cache.get_key("primary").await.is_none());
    assert!(cache.get_key("secondary").await.is_some());
}

#[tokio::test]
async fn fresh_cache_skips_the_network() {
    let server = JwksServer::with_keys(&[KeyPair::primary()]).await;
    let cache = cache(&server, &TestClock::new());

    cache.refresh().await.unwrap();
    cache.refresh().await.unwrap();

    assert_eq!(server.request_count().await, 1);
}

#[tokio::test]
async fn keys_expire_after_ttl() {
    let server = JwksServer::with_keys(&[KeyPair::primary()]).await;
    let clock = TestClock::new();
    let cache = cache(&server, &clock);
    cache.refresh().await.unwrap();

    clock.advance(TTL);
    assert!(cache.get_key("primary").await.is_some());

    clock.advance(Duration::from_secs(1));
    assert!(cache.get_key("primary").await.is_none());
    assert!(!cache.is_fresh().await);

    cache.refresh().await.unwrap();
    assert!(cache.get_key("primary").await.is_some());
    assert_eq!(server.request_count().await, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_refreshes_issue_one_request() {
    let server = JwksServer::start().await;
    server
        .publish_delayed(jwks_document([jwk_entry(&KeyPair::primary())]), Duration::from_millis(200))
        .await;
    let cache = Arc::new(cache(&server, &TestClock::new()));

    let refreshes = (0..16).map(|_| {
        let cache = cache.clone();
        tokio::spawn(async move { cache.refresh().await })
    });
    for result in join_all(refreshes).await {
        result.unwrap().unwrap();
    }

    assert_eq!(server.request_count().await, 1);
}

#[tokio::test]
async fn partially_usable_document_loads_valid_entries() {
    let server = JwksServer::start().await;
    server
        .publish(json!({
            "keys": [
                jwk_entry(&KeyPair::primary()),
                { "kid": "secondary", "kty": "RSA" }
            ]
        }))
        .await;
    let cache = cache(&server, &TestClock::new());

    cache.refresh().await.unwrap();

    assert_eq!(cache.len().await, 1);
    assert!(cache.get_key("primary").await.is_some());
    assert!(cache.get_key("secondary").await.is_none());
}

#[tokio::test]
async fn document_without_usable_keys_is_empty_error() {
    let server = JwksServer::start().await;
    server.publish(json!({ "keys": [{ "kid": "a" }] })).await;
    let cache = cache(&server, &TestClock::new());

    assert_eq!(cache.refresh().await, Err(KeySourceError::Empty));
    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn failed_refresh_keeps_previous_snapshot() {
    let server = JwksServer::with_keys(&[KeyPair::primary()]).await;
    let clock = TestClock::new();
    let cache = cache(&server, &clock);
    cache.refresh().await.unwrap();

    server.fail_with(500).await;
    clock.advance(TTL + Duration::from_secs(1));

    assert!(matches!(cache.refresh().await, Err(KeySourceError::Unavailable(_))));
    assert_eq!(cache.len().await, 1);
}

#[tokio::test]
async fn undecodable_document_is_unavailable() {
    let server = JwksServer::start().await;
    server.serve_garbage().await;
    let cache = cache(&server, &TestClock::new());

    assert!(matches!(cache.refresh().await, Err(KeySourceError::Unavailable(_))));
}

#[tokio::test]
async fn unreachable_endpoint_is_unavailable() {
    let cache = KeyCache::new("http://127.0.0.1:9/jwks.json", TTL, Duration::from_secs(1)).unwrap();

    assert!(matches!(cache.refresh().await, Err(KeySourceError::Unavailable(_))));
}

#[tokio::test]
async fn dropped_refresh_releases_the_lock() {
    let server = JwksServer::start().await;
    server
        .publish_delayed(jwks_document([jwk_entry(&KeyPair::primary())]), Duration::from_secs(5))
        .await;
    let cache = cache(&server, &TestClock::new());

    let timed_out = tokio::time::timeout(Duration::from_millis(100), cache.refresh()).await;
    assert!(timed_out.is_err());

    server.publish(jwks_document([jwk_entry(&KeyPair::primary())])).await;
    tokio::time::timeout(Duration::from_secs(5), cache.refresh()).await.unwrap().unwrap();
    assert!(cache.get_key("primary").await.is_some());
}
