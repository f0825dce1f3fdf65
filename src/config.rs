// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! KeyGate configuration
//!
//! Client-side settings (`KeyGateConfig`, loaded from the environment) and the
//! service configuration blob returned by the backend during `init`
//! (`ServiceConfig`).

use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::{HttpKeyService, KeyService, MockKeyService};
use crate::crypto::Algorithm;
use crate::error::BackendError;

/// Default backend endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.example-crypto.com/v1";

/// Which Backend Key Service adapter to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// In-memory store, nothing leaves the process
    Mock,
    /// REST client against `endpoint`
    Http,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mock" => Ok(BackendKind::Mock),
            "http" | "https" => Ok(BackendKind::Http),
            other => Err(format!("unknown backend '{}' (expected mock or http)", other)),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Mock => f.write_str("mock"),
            BackendKind::Http => f.write_str("http"),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct KeyGateConfig {
    /// Backend endpoint URL (default: https://api.example-crypto.com/v1)
    pub endpoint: String,
    /// Backend adapter (default: mock)
    pub backend: BackendKind,
    /// HTTP request timeout in seconds (default: 10)
    pub request_timeout_secs: u64,
    /// Maximum cached keys (default: 128)
    pub cache_max_entries: usize,
}

impl KeyGateConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint: env::var("KEYGATE_ENDPOINT").unwrap_or(defaults.endpoint),
            backend: env::var("KEYGATE_BACKEND")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.backend),
            request_timeout_secs: env::var("KEYGATE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.request_timeout_secs),
            cache_max_entries: env::var("KEYGATE_CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_max_entries),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.endpoint.trim().is_empty() {
            return Err("endpoint must not be empty".to_string());
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be at least 1".to_string());
        }
        if self.cache_max_entries == 0 {
            return Err("cache_max_entries must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for KeyGateConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            backend: BackendKind::Mock,
            request_timeout_secs: 10,
            cache_max_entries: 128,
        }
    }
}

/// Build the Backend Key Service selected by `config`
pub fn build_key_service(
    config: &KeyGateConfig,
) -> std::result::Result<Arc<dyn KeyService>, BackendError> {
    match config.backend {
        BackendKind::Mock => Ok(Arc::new(MockKeyService::new())),
        BackendKind::Http => Ok(Arc::new(HttpKeyService::new(
            &config.endpoint,
            config.request_timeout(),
        )?)),
    }
}

/// Service configuration returned by the backend's config endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub api_version: String,
    pub features: Vec<String>,
}

impl ServiceConfig {
    /// Parse the raw config blob
    pub fn parse(blob: &str) -> std::result::Result<Self, BackendError> {
        serde_json::from_str(blob)
            .map_err(|e| BackendError::InvalidResponse(format!("config blob: {}", e)))
    }

    /// Whether the service advertises `algorithm`. An empty feature list
    /// advertises nothing and is treated as unrestricted.
    pub fn supports(&self, algorithm: Algorithm) -> bool {
        self.features.is_empty()
            || self
                .features
                .iter()
                .any(|f| f.eq_ignore_ascii_case(algorithm.as_str()))
    }
}
