// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session Context
//!
//! Owns the lifecycle state, the session token, the service configuration and
//! the key cache behind a single reader-writer lock. Backend calls are always
//! awaited with the lock released.
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized ──init──▶ Initializing ──ok──▶ Ready ──cleanup──▶ ShutDown
//!       ▲                     │ err                                 │
//!       └─────────────────────┘                                     │
//!                       init (re-initialization) ◀──────────────────┘
//! ```
//!
//! ## Accepted Races
//!
//! - A DELETE racing a fetch-on-miss may leave the key re-populated
//! - An operation that passed its `Ready` check before `cleanup` may still
//!   finish with the key it already resolved. It never re-populates the cache
//!   after `cleanup`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::backend::{KeyOpResponse, KeyOpType, KeyService};
use crate::config::{build_key_service, KeyGateConfig, ServiceConfig};
use crate::crypto::{self, Algorithm, KeyMaterial};
use crate::error::{BackendError, KeyGateError, Result};
use crate::session::key_cache::{CacheStatsSnapshot, KeyCache, KeyCacheConfig};

/// Lifecycle state of a [`SessionContext`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
    ShutDown,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Initializing => "initializing",
            SessionState::Ready => "ready",
            SessionState::ShutDown => "shut down",
        };
        f.write_str(name)
    }
}

struct ContextState {
    state: SessionState,
    session_token: Option<Zeroizing<String>>,
    service_config: Option<ServiceConfig>,
    key_cache: KeyCache,
}

impl ContextState {
    fn ensure_ready(&self) -> Result<()> {
        if self.state == SessionState::Ready {
            Ok(())
        } else {
            Err(KeyGateError::NotInitialized)
        }
    }

    fn session_token(&self) -> Result<Zeroizing<String>> {
        self.ensure_ready()?;
        match &self.session_token {
            Some(token) if !token.is_empty() => Ok(token.clone()),
            _ => Err(KeyGateError::NoActiveSession),
        }
    }
}

/// Session-gated key context
///
/// Share it between tasks with `Arc<SessionContext>`.
///
/// # Example
///
/// ```ignore
/// let ctx = SessionContext::new(Arc::new(MockKeyService::new()), DEFAULT_ENDPOINT);
/// ctx.init("registration-token").await?;
/// ctx.create_session("alice", "pw").await?;
/// ctx.key_operation(KeyOpType::Create, "K", None).await?;
/// let blob = ctx.encrypt("K", "AES-256-GCM", b"hello").await?;
/// assert_eq!(ctx.decrypt("K", "AES-256-GCM", &blob).await?, b"hello");
/// ctx.cleanup().await;
/// ```
pub struct SessionContext {
    backend: Arc<dyn KeyService>,
    endpoint: String,
    inner: RwLock<ContextState>,
    /// Serializes init bodies; holds the failure of the last completed body
    init_gate: Mutex<Option<BackendError>>,
    /// Number of completed init bodies
    init_epoch: AtomicU64,
}

impl SessionContext {
    pub fn new(backend: Arc<dyn KeyService>, endpoint: impl Into<String>) -> Self {
        Self::with_cache_config(backend, endpoint, KeyCacheConfig::default())
    }

    pub fn with_cache_config(
        backend: Arc<dyn KeyService>,
        endpoint: impl Into<String>,
        cache_config: KeyCacheConfig,
    ) -> Self {
        Self {
            backend,
            endpoint: endpoint.into(),
            inner: RwLock::new(ContextState {
                state: SessionState::Uninitialized,
                session_token: None,
                service_config: None,
                key_cache: KeyCache::new(cache_config),
            }),
            init_gate: Mutex::new(None),
            init_epoch: AtomicU64::new(0),
        }
    }

    /// Build the backend selected by `config` and wrap it in a context
    pub fn from_config(config: &KeyGateConfig) -> std::result::Result<Self, BackendError> {
        let backend = build_key_service(config)?;
        Ok(Self::with_cache_config(
            backend,
            config.endpoint.clone(),
            KeyCacheConfig {
                max_entries: config.cache_max_entries,
            },
        ))
    }

    /// Initialize the context with a registration token
    ///
    /// Exactly one `fetch_config` call is made however many callers race
    /// here: callers that queued behind a running initialization observe its
    /// outcome, success or failure, instead of fetching again. Once `Ready`,
    /// further calls return `Ok(())` immediately. A failed initialization
    /// restores the previous state and a later call may retry.
    ///
    /// # Errors
    ///
    /// - `InvalidRegistrationToken` if the token is empty
    /// - `BackendUnavailable` if the config cannot be fetched or parsed
    pub async fn init(&self, registration_token: &str) -> Result<()> {
        if registration_token.trim().is_empty() {
            return Err(KeyGateError::InvalidRegistrationToken);
        }

        if self.inner.read().await.state == SessionState::Ready {
            return Ok(());
        }

        let observed_epoch = self.init_epoch.load(Ordering::Acquire);
        let mut gate = self.init_gate.lock().await;

        if self.init_epoch.load(Ordering::Acquire) != observed_epoch {
            // Another caller ran the body while we waited
            match gate.as_ref() {
                Some(failure) => {
                    return Err(KeyGateError::backend("fetch_config", failure.clone()))
                }
                None if self.inner.read().await.state == SessionState::Ready => return Ok(()),
                None => {}
            }
        }

        let prior = {
            let mut inner = self.inner.write().await;
            let prior = match inner.state {
                SessionState::Ready => return Ok(()),
                // The previous init body was cancelled mid-fetch
                SessionState::Initializing => SessionState::Uninitialized,
                other => other,
            };
            inner.state = SessionState::Initializing;
            prior
        };

        info!(endpoint = %self.endpoint, "Initializing key context");

        let result = self
            .backend
            .fetch_config(registration_token)
            .await
            .and_then(|blob| ServiceConfig::parse(&blob));

        let mut inner = self.inner.write().await;
        let outcome = match result {
            Ok(config) => {
                if !config.supports(Algorithm::Aes256Gcm) {
                    warn!(
                        features = ?config.features,
                        "Service does not advertise AES-256-GCM"
                    );
                }
                info!(api_version = %config.api_version, "Key context ready");
                inner.service_config = Some(config);
                inner.state = SessionState::Ready;
                *gate = None;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Key context initialization failed");
                inner.state = prior;
                *gate = Some(e.clone());
                Err(KeyGateError::backend("fetch_config", e))
            }
        };
        self.init_epoch.fetch_add(1, Ordering::AcqRel);

        outcome
    }

    /// Wipe every cached key, drop the session and shut the context down
    ///
    /// No-op unless `Ready`.
    pub async fn cleanup(&self) {
        let mut inner = self.inner.write().await;
        if inner.state != SessionState::Ready {
            return;
        }

        let wiped = inner.key_cache.wipe_all();
        inner.session_token = None;
        inner.service_config = None;
        inner.state = SessionState::ShutDown;

        info!(wiped_keys = wiped, "Key context shut down");
    }

    /// Authenticate `identity` and store the returned session token
    ///
    /// # Errors
    ///
    /// - `NotInitialized` unless `Ready`
    /// - `AuthenticationFailed` on any backend failure; `source` tells a
    ///   rejection apart from an unreachable backend
    pub async fn create_session(&self, identity: &str, secret: &str) -> Result<String> {
        self.inner.read().await.ensure_ready()?;

        debug!(identity, "Authenticating");
        let token = self
            .backend
            .authenticate(identity, secret)
            .await
            .map_err(|source| KeyGateError::AuthenticationFailed {
                identity: identity.to_string(),
                source,
            })?;

        if token.is_empty() {
            return Err(KeyGateError::AuthenticationFailed {
                identity: identity.to_string(),
                source: BackendError::InvalidResponse("empty session token".to_string()),
            });
        }

        let mut inner = self.inner.write().await;
        inner.ensure_ready()?;
        inner.session_token = Some(Zeroizing::new(token.clone()));

        info!(identity, "Session established");
        Ok(token)
    }

    /// Forget the session token. Cached keys are kept.
    pub async fn end_session(&self) {
        let mut inner = self.inner.write().await;
        if inner.session_token.take().is_some() {
            info!("Session ended");
        }
    }

    pub async fn has_session(&self) -> bool {
        self.inner
            .read()
            .await
            .session_token
            .as_ref()
            .map_or(false, |token| !token.is_empty())
    }

    /// Perform a key operation against the backend
    ///
    /// READ inserts (or overwrites) the fetched material in the cache. DELETE
    /// wipes and removes the cache entry. CREATE and UPDATE leave the cache alone.
    ///
    /// # Errors
    ///
    /// - `NotInitialized` / `NoActiveSession` before any backend call
    /// - `KeyNotFound` if the backend has no such key
    /// - `UnsupportedOperation` if the backend refuses the operation type
    /// - `BackendUnavailable` for every other backend failure
    pub async fn key_operation(
        &self,
        op: KeyOpType,
        key_name: &str,
        key_material: Option<&[u8]>,
    ) -> Result<()> {
        let token = self.inner.read().await.session_token()?;

        debug!(op = %op, key_name, "Key operation");
        let response = self
            .backend
            .key_op(&token, op, key_name, key_material)
            .await
            .map_err(|e| map_key_op_error(op, key_name, e))?;

        match op {
            KeyOpType::Read => {
                let material = decode_material(op, response)?;
                let mut inner = self.inner.write().await;
                inner.ensure_ready()?;
                inner.key_cache.insert(key_name, material);
                debug!(key_name, cached = inner.key_cache.len(), "Key cached");
            }
            KeyOpType::Delete => {
                let mut inner = self.inner.write().await;
                if inner.key_cache.remove(key_name) {
                    debug!(key_name, "Cached key wiped");
                }
            }
            KeyOpType::Create | KeyOpType::Update => {}
        }

        Ok(())
    }

    /// Resolve `key_name`, fetching it from the backend on a cache miss
    ///
    /// Concurrent misses for the same name each issue their own READ.
    pub async fn get_key(&self, key_name: &str) -> Result<KeyMaterial> {
        {
            let inner = self.inner.read().await;
            inner.ensure_ready()?;
            if let Some(material) = inner.key_cache.get(key_name) {
                return Ok(material);
            }
        }

        debug!(key_name, "Cache miss, fetching key");
        self.key_operation(KeyOpType::Read, key_name, None).await?;

        let inner = self.inner.read().await;
        inner.ensure_ready()?;
        inner
            .key_cache
            .get(key_name)
            .ok_or_else(|| KeyGateError::KeyNotFound {
                key_name: key_name.to_string(),
            })
    }

    /// Encrypt `plaintext` under the named key
    pub async fn encrypt(&self, key_name: &str, algorithm: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.inner.read().await.ensure_ready()?;
        let algorithm: Algorithm = algorithm.parse()?;
        let key = self.get_key(key_name).await?;
        crypto::encrypt(key.as_bytes(), algorithm.as_str(), plaintext)
    }

    /// Decrypt a blob produced by [`SessionContext::encrypt`]
    pub async fn decrypt(&self, key_name: &str, algorithm: &str, blob: &[u8]) -> Result<Vec<u8>> {
        self.inner.read().await.ensure_ready()?;
        let algorithm: Algorithm = algorithm.parse()?;
        let key = self.get_key(key_name).await?;
        crypto::decrypt(key.as_bytes(), algorithm.as_str(), blob)
    }

    /// Replace the named key with fresh random material
    ///
    /// The backend is updated first. The cache is only touched once the
    /// backend has accepted the new material, so a failed rotation leaves the
    /// old key authoritative.
    pub async fn rotate_key(&self, key_name: &str) -> Result<()> {
        let token = self.inner.read().await.session_token()?;
        let material = crypto::generate_key_material()?;

        info!(key_name, "Rotating key");
        self.backend
            .key_op(
                &token,
                KeyOpType::Update,
                key_name,
                Some(material.as_bytes()),
            )
            .await
            .map_err(|e| map_key_op_error(KeyOpType::Update, key_name, e))?;

        let mut inner = self.inner.write().await;
        inner.ensure_ready()?;
        inner.key_cache.insert(key_name, material);

        info!(key_name, "Key rotated");
        Ok(())
    }

    pub async fn state(&self) -> SessionState {
        self.inner.read().await.state
    }

    /// Service configuration fetched during `init`, while `Ready`
    pub async fn service_config(&self) -> Option<ServiceConfig> {
        self.inner.read().await.service_config.clone()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn cached_key_count(&self) -> usize {
        self.inner.read().await.key_cache.len()
    }

    /// Whether `key_name` is cached, without touching hit/miss counters
    pub async fn is_cached(&self, key_name: &str) -> bool {
        self.inner.read().await.key_cache.contains(key_name)
    }

    pub async fn cache_stats(&self) -> CacheStatsSnapshot {
        self.inner.read().await.key_cache.stats()
    }
}

fn map_key_op_error(op: KeyOpType, key_name: &str, error: BackendError) -> KeyGateError {
    match error {
        BackendError::NotFound(_) => KeyGateError::KeyNotFound {
            key_name: key_name.to_string(),
        },
        BackendError::UnsupportedOperation(_) => KeyGateError::UnsupportedOperation {
            operation: op.to_string(),
        },
        other => KeyGateError::backend(format!("key_op:{}", op), other),
    }
}

fn decode_material(op: KeyOpType, response: KeyOpResponse) -> Result<KeyMaterial> {
    let invalid = |reason: &str| {
        KeyGateError::backend(
            format!("key_op:{}", op),
            BackendError::InvalidResponse(reason.to_string()),
        )
    };

    let encoded = match response {
        KeyOpResponse::Material(hex) => Zeroizing::new(hex),
        KeyOpResponse::Ack => return Err(invalid("READ returned no key material")),
    };
    let bytes = hex::decode(encoded.trim()).map_err(|_| invalid("key material is not valid hex"))?;

    KeyMaterial::new(bytes).ok_or_else(|| invalid("key material is empty"))
}
