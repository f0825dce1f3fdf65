// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! End-to-end walkthrough against the in-memory backend

use keygate::backend::{KeyOpType, MockKeyService};
use keygate::config::{BackendKind, KeyGateConfig, DEFAULT_ENDPOINT};
use keygate::crypto::{decode_blob, decrypt, encode_blob, encrypt};
use keygate::{SessionContext, SessionState};
use std::sync::Arc;

#[tokio::test]
async fn test_init_session_create_encrypt_decrypt() {
    let backend = MockKeyService::new();
    let ctx = SessionContext::new(Arc::new(backend.clone()), DEFAULT_ENDPOINT);

    ctx.init("tok").await.unwrap();
    let token = ctx.create_session("alice", "pw").await.unwrap();
    assert!(!token.is_empty());

    ctx.key_operation(KeyOpType::Create, "K", None).await.unwrap();

    let key = ctx.get_key("K").await.unwrap();
    assert_eq!(key.len(), 32);

    let c1 = encrypt(key.as_bytes(), "AES-256-GCM", b"hello").unwrap();
    let c2 = encrypt(key.as_bytes(), "AES-256-GCM", b"hello").unwrap();
    assert_ne!(c1, c2);
    assert_eq!(decrypt(key.as_bytes(), "AES-256-GCM", &c1).unwrap(), b"hello");

    // The context-level operations agree with the engine
    assert_eq!(ctx.decrypt("K", "aes-256-gcm", &c2).await.unwrap(), b"hello");

    ctx.cleanup().await;
    assert_eq!(ctx.state().await, SessionState::ShutDown);
}

#[tokio::test]
async fn test_context_from_config_with_mock_backend() {
    let config = KeyGateConfig {
        backend: BackendKind::Mock,
        cache_max_entries: 4,
        ..Default::default()
    };
    let ctx = SessionContext::from_config(&config).unwrap();
    assert_eq!(ctx.endpoint(), DEFAULT_ENDPOINT);

    ctx.init("tok").await.unwrap();
    ctx.create_session("bob", "secret").await.unwrap();
    ctx.key_operation(KeyOpType::Create, "notes", None)
        .await
        .unwrap();

    let blob = ctx
        .encrypt("notes", "AES-256-GCM", b"meeting at noon")
        .await
        .unwrap();
    let transported = decode_blob(&encode_blob(&blob)).unwrap();
    assert_eq!(
        ctx.decrypt("notes", "AES-256-GCM", &transported)
            .await
            .unwrap(),
        b"meeting at noon"
    );
}

#[tokio::test]
async fn test_shared_context_across_tasks() {
    let backend = MockKeyService::new();
    backend.insert_key("shared", &[8u8; 32]).await;
    let ctx = Arc::new(SessionContext::new(Arc::new(backend), DEFAULT_ENDPOINT));
    ctx.init("tok").await.unwrap();
    ctx.create_session("alice", "pw").await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                let message = format!("message {}", i);
                let blob = ctx
                    .encrypt("shared", "AES-256-GCM", message.as_bytes())
                    .await
                    .unwrap();
                let plaintext = ctx.decrypt("shared", "AES-256-GCM", &blob).await.unwrap();
                assert_eq!(plaintext, message.as_bytes());
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(ctx.cached_key_count().await, 1);
}
