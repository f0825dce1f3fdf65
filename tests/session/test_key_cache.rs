// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fetch-on-miss cache behavior through the session context

use futures_util::future::join;
use keygate::backend::{KeyOpType, MockKeyService};
use keygate::config::DEFAULT_ENDPOINT;
use keygate::{BackendError, KeyCacheConfig, KeyGateError, SessionContext};
use std::sync::Arc;
use std::time::Duration;

async fn ready_context(backend: &MockKeyService) -> SessionContext {
    let ctx = SessionContext::new(Arc::new(backend.clone()), DEFAULT_ENDPOINT);
    ctx.init("tok").await.unwrap();
    ctx.create_session("alice", "pw").await.unwrap();
    ctx
}

#[tokio::test]
async fn test_miss_fetches_once_then_hits() {
    let backend = MockKeyService::new();
    backend.insert_key("K", &[1u8; 32]).await;
    let ctx = ready_context(&backend).await;

    assert!(!ctx.is_cached("K").await);
    let first = ctx.get_key("K").await.unwrap();
    let second = ctx.get_key("K").await.unwrap();

    assert_eq!(first.as_bytes(), &[1u8; 32]);
    assert_eq!(first, second);
    assert_eq!(backend.call_counts().await.read, 1);

    let stats = ctx.cache_stats().await;
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 1);
}

#[tokio::test]
async fn test_create_does_not_populate_cache() {
    let backend = MockKeyService::new();
    let ctx = ready_context(&backend).await;

    ctx.key_operation(KeyOpType::Create, "K", Some(&[4u8; 32]))
        .await
        .unwrap();
    assert!(!ctx.is_cached("K").await);

    ctx.key_operation(KeyOpType::Read, "K", None).await.unwrap();
    assert!(ctx.is_cached("K").await);
    assert_eq!(ctx.get_key("K").await.unwrap().as_bytes(), &[4u8; 32]);
}

#[tokio::test]
async fn test_update_leaves_cached_copy_until_read() {
    let backend = MockKeyService::new();
    backend.insert_key("K", &[1u8; 32]).await;
    let ctx = ready_context(&backend).await;

    ctx.get_key("K").await.unwrap();
    ctx.key_operation(KeyOpType::Update, "K", Some(&[2u8; 32]))
        .await
        .unwrap();

    // Read-through cache: the update is not observed until the next READ
    assert_eq!(ctx.get_key("K").await.unwrap().as_bytes(), &[1u8; 32]);

    ctx.key_operation(KeyOpType::Read, "K", None).await.unwrap();
    assert_eq!(ctx.get_key("K").await.unwrap().as_bytes(), &[2u8; 32]);
}

#[tokio::test]
async fn test_delete_evicts_and_next_lookup_goes_to_backend() {
    let backend = MockKeyService::new();
    backend.insert_key("K", &[1u8; 32]).await;
    let ctx = ready_context(&backend).await;

    ctx.get_key("K").await.unwrap();
    ctx.key_operation(KeyOpType::Delete, "K", None).await.unwrap();

    assert!(!ctx.is_cached("K").await);
    assert_eq!(ctx.cache_stats().await.wipes, 1);

    assert!(matches!(
        ctx.get_key("K").await,
        Err(KeyGateError::KeyNotFound { .. })
    ));
    assert_eq!(backend.call_counts().await.read, 2);
}

#[tokio::test]
async fn test_recreated_key_is_fetched_fresh() {
    let backend = MockKeyService::new();
    let ctx = ready_context(&backend).await;

    ctx.key_operation(KeyOpType::Create, "K", Some(&[1u8; 32]))
        .await
        .unwrap();
    ctx.get_key("K").await.unwrap();
    ctx.key_operation(KeyOpType::Delete, "K", None).await.unwrap();
    ctx.key_operation(KeyOpType::Create, "K", Some(&[2u8; 32]))
        .await
        .unwrap();

    assert_eq!(ctx.get_key("K").await.unwrap().as_bytes(), &[2u8; 32]);
}

#[tokio::test]
async fn test_unknown_key_not_found_and_not_cached() {
    let backend = MockKeyService::new();
    let ctx = ready_context(&backend).await;

    match ctx.get_key("missing").await {
        Err(KeyGateError::KeyNotFound { key_name }) => assert_eq!(key_name, "missing"),
        other => panic!("Expected KeyNotFound, got {:?}", other),
    }
    assert_eq!(ctx.cached_key_count().await, 0);

    assert!(matches!(
        ctx.encrypt("missing", "AES-256-GCM", b"x").await,
        Err(KeyGateError::KeyNotFound { .. })
    ));
}

#[tokio::test]
async fn test_delete_unknown_key() {
    let backend = MockKeyService::new();
    let ctx = ready_context(&backend).await;

    assert!(matches!(
        ctx.key_operation(KeyOpType::Delete, "missing", None).await,
        Err(KeyGateError::KeyNotFound { .. })
    ));
}

#[tokio::test]
async fn test_backend_failure_during_fetch() {
    let backend = MockKeyService::new();
    backend.insert_key("K", &[1u8; 32]).await;
    let ctx = ready_context(&backend).await;
    backend
        .inject_error(BackendError::Rejected {
            status: 500,
            message: "internal".to_string(),
        })
        .await;

    match ctx.get_key("K").await {
        Err(KeyGateError::BackendUnavailable { operation, source }) => {
            assert_eq!(operation, "key_op:READ");
            assert!(matches!(source, BackendError::Rejected { status: 500, .. }));
        }
        other => panic!("Expected BackendUnavailable, got {:?}", other),
    }
    assert!(!ctx.is_cached("K").await);

    // Nothing is retried implicitly; the next call succeeds on its own
    assert!(ctx.get_key("K").await.is_ok());
}

#[tokio::test]
async fn test_unsupported_operation_from_backend() {
    let backend = MockKeyService::new();
    let ctx = ready_context(&backend).await;
    backend
        .inject_error(BackendError::UnsupportedOperation("UPDATE".to_string()))
        .await;

    assert!(matches!(
        ctx.key_operation(KeyOpType::Update, "K", Some(&[1u8; 32])).await,
        Err(KeyGateError::UnsupportedOperation { .. })
    ));
}

#[tokio::test]
async fn test_concurrent_misses_are_not_deduplicated() {
    let backend = MockKeyService::new().with_latency(Duration::from_millis(30));
    backend.insert_key("K", &[1u8; 32]).await;
    let ctx = ready_context(&backend).await;

    let (a, b) = join(ctx.get_key("K"), ctx.get_key("K")).await;
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(backend.call_counts().await.read, 2);
    assert_eq!(ctx.cached_key_count().await, 1);
}

#[tokio::test]
async fn test_bounded_cache_evicts_oldest() {
    let backend = MockKeyService::new();
    for (i, name) in ["a", "b", "c"].iter().enumerate() {
        backend.insert_key(name, &[i as u8 + 1; 32]).await;
    }
    let ctx = SessionContext::with_cache_config(
        Arc::new(backend.clone()),
        DEFAULT_ENDPOINT,
        KeyCacheConfig { max_entries: 2 },
    );
    ctx.init("tok").await.unwrap();
    ctx.create_session("alice", "pw").await.unwrap();

    ctx.get_key("a").await.unwrap();
    ctx.get_key("b").await.unwrap();
    ctx.get_key("c").await.unwrap();

    assert_eq!(ctx.cached_key_count().await, 2);
    assert!(!ctx.is_cached("a").await);

    let stats = ctx.cache_stats().await;
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.wipes, 1);

    // Evicted keys are fetched again on demand
    assert_eq!(ctx.get_key("a").await.unwrap().as_bytes(), &[1u8; 32]);
    assert_eq!(backend.call_counts().await.read, 4);
}

#[tokio::test]
async fn test_cleanup_wipes_every_entry() {
    let backend = MockKeyService::new();
    backend.insert_key("a", &[1u8; 32]).await;
    backend.insert_key("b", &[2u8; 32]).await;
    let ctx = ready_context(&backend).await;

    ctx.get_key("a").await.unwrap();
    ctx.get_key("b").await.unwrap();
    ctx.cleanup().await;

    assert_eq!(ctx.cached_key_count().await, 0);
    assert_eq!(ctx.cache_stats().await.wipes, 2);
}
