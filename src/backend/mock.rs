// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-memory Backend Key Service
//!
//! Behaves like the custody service closely enough for tests, demos and
//! benchmarks: tokens must have been issued by `authenticate`, unknown keys
//! are `NotFound`, and CREATE without material generates a random AES-256 key.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::OsRng;
use rand::RngCore;
use tokio::sync::Mutex;
use zeroize::Zeroizing;

use super::{KeyOpResponse, KeyOpType, KeyService};
use crate::crypto::KEY_LEN;
use crate::error::BackendError;

/// Default configuration blob returned by `fetch_config`
pub const DEFAULT_CONFIG_BLOB: &str = r#"{"api_version":"1.0","features":["AES-256-GCM"]}"#;

/// Number of calls received per backend operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub fetch_config: usize,
    pub authenticate: usize,
    pub create: usize,
    pub read: usize,
    pub update: usize,
    pub delete: usize,
}

#[derive(Default)]
struct MockState {
    keys: HashMap<String, Zeroizing<Vec<u8>>>,
    issued_tokens: HashSet<String>,
    injected_error: Option<BackendError>,
    calls: CallCounts,
}

/// In-memory key-custody backend
#[derive(Clone)]
pub struct MockKeyService {
    state: Arc<Mutex<MockState>>,
    users: HashMap<String, String>,
    config_blob: String,
    latency: Option<Duration>,
}

impl MockKeyService {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            users: HashMap::new(),
            config_blob: DEFAULT_CONFIG_BLOB.to_string(),
            latency: None,
        }
    }

    /// Register credentials. Once any user is registered, unknown identities are rejected.
    pub fn with_user(mut self, identity: &str, secret: &str) -> Self {
        self.users.insert(identity.to_string(), secret.to_string());
        self
    }

    /// Replace the configuration blob returned by `fetch_config`
    pub fn with_config_blob(mut self, blob: &str) -> Self {
        self.config_blob = blob.to_string();
        self
    }

    /// Delay every call, simulating a network round trip
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail the next call (any operation) with `error`
    pub async fn inject_error(&self, error: BackendError) {
        let mut state = self.state.lock().await;
        state.injected_error = Some(error);
    }

    /// Seed a key directly, bypassing authentication
    pub async fn insert_key(&self, name: &str, material: &[u8]) {
        let mut state = self.state.lock().await;
        state
            .keys
            .insert(name.to_string(), Zeroizing::new(material.to_vec()));
    }

    /// Authoritative material for `name`, if stored
    pub async fn stored_key(&self, name: &str) -> Option<Vec<u8>> {
        let state = self.state.lock().await;
        state.keys.get(name).map(|k| k.to_vec())
    }

    pub async fn call_counts(&self) -> CallCounts {
        self.state.lock().await.calls.clone()
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_injected_error(state: &mut MockState) -> Result<(), BackendError> {
        match state.injected_error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn random_token() -> String {
        let mut bytes = [0u8; 16];
        OsRng.fill_bytes(&mut bytes);
        format!("mock-session-{}", hex::encode(bytes))
    }
}

impl Default for MockKeyService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyService for MockKeyService {
    async fn fetch_config(&self, registration_token: &str) -> Result<String, BackendError> {
        self.simulate_latency().await;
        let mut state = self.state.lock().await;
        state.calls.fetch_config += 1;
        Self::check_injected_error(&mut state)?;

        if registration_token.is_empty() {
            return Err(BackendError::Unauthorized(
                "registration token required".to_string(),
            ));
        }

        Ok(self.config_blob.clone())
    }

    async fn authenticate(&self, identity: &str, secret: &str) -> Result<String, BackendError> {
        self.simulate_latency().await;
        let mut state = self.state.lock().await;
        state.calls.authenticate += 1;
        Self::check_injected_error(&mut state)?;

        if !self.users.is_empty() && self.users.get(identity).map(String::as_str) != Some(secret)
        {
            return Err(BackendError::Unauthorized("invalid credentials".to_string()));
        }

        let token = Self::random_token();
        state.issued_tokens.insert(token.clone());
        Ok(token)
    }

    async fn key_op(
        &self,
        session_token: &str,
        op: KeyOpType,
        key_name: &str,
        key_material: Option<&[u8]>,
    ) -> Result<KeyOpResponse, BackendError> {
        self.simulate_latency().await;
        let mut state = self.state.lock().await;
        match op {
            KeyOpType::Create => state.calls.create += 1,
            KeyOpType::Read => state.calls.read += 1,
            KeyOpType::Update => state.calls.update += 1,
            KeyOpType::Delete => state.calls.delete += 1,
        }
        Self::check_injected_error(&mut state)?;

        if !state.issued_tokens.contains(session_token) {
            return Err(BackendError::Unauthorized("unknown session token".to_string()));
        }

        match op {
            KeyOpType::Create => {
                if state.keys.contains_key(key_name) {
                    return Err(BackendError::Rejected {
                        status: 409,
                        message: format!("key '{}' already exists", key_name),
                    });
                }
                let material = match key_material {
                    Some(bytes) => Zeroizing::new(bytes.to_vec()),
                    None => {
                        let mut generated = Zeroizing::new(vec![0u8; KEY_LEN]);
                        OsRng.fill_bytes(generated.as_mut_slice());
                        generated
                    }
                };
                state.keys.insert(key_name.to_string(), material);
                Ok(KeyOpResponse::Ack)
            }
            KeyOpType::Read => state
                .keys
                .get(key_name)
                .map(|material| KeyOpResponse::Material(hex::encode(material.as_slice())))
                .ok_or_else(|| BackendError::NotFound(key_name.to_string())),
            KeyOpType::Update => {
                let material = key_material.ok_or_else(|| BackendError::Rejected {
                    status: 400,
                    message: "key material required for update".to_string(),
                })?;
                match state.keys.get_mut(key_name) {
                    Some(existing) => {
                        *existing = Zeroizing::new(material.to_vec());
                        Ok(KeyOpResponse::Ack)
                    }
                    None => Err(BackendError::NotFound(key_name.to_string())),
                }
            }
            KeyOpType::Delete => state
                .keys
                .remove(key_name)
                .map(|_| KeyOpResponse::Ack)
                .ok_or_else(|| BackendError::NotFound(key_name.to_string())),
        }
    }
}
