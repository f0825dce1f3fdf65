// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Backend Key Service
//!
//! The remote key-custody service is consumed through the [`KeyService`]
//! trait. Two adapters ship with the crate:
//!
//! - [`MockKeyService`]: in-memory store with call counters and error injection
//! - [`HttpKeyService`]: REST client over reqwest
//!
//! Neither adapter retries; a failed call is reported once and the caller decides.

pub mod http;
pub mod mock;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::error::{BackendError, KeyGateError};

pub use http::HttpKeyService;
pub use mock::{CallCounts, MockKeyService};

/// Key management operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyOpType {
    Create,
    Read,
    Update,
    Delete,
}

impl KeyOpType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyOpType::Create => "CREATE",
            KeyOpType::Read => "READ",
            KeyOpType::Update => "UPDATE",
            KeyOpType::Delete => "DELETE",
        }
    }
}

impl FromStr for KeyOpType {
    type Err = KeyGateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CREATE" => Ok(KeyOpType::Create),
            "READ" => Ok(KeyOpType::Read),
            "UPDATE" => Ok(KeyOpType::Update),
            "DELETE" => Ok(KeyOpType::Delete),
            _ => Err(KeyGateError::UnsupportedOperation {
                operation: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for KeyOpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a key operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOpResponse {
    /// Hex-encoded key material (READ)
    Material(String),
    /// Acknowledgement (CREATE, UPDATE, DELETE)
    Ack,
}

/// Remote key-custody and identity service
#[async_trait]
pub trait KeyService: Send + Sync {
    /// Exchange a registration token for the service configuration blob (JSON)
    async fn fetch_config(&self, registration_token: &str) -> Result<String, BackendError>;

    /// Authenticate an identity, returning an opaque session token
    async fn authenticate(&self, identity: &str, secret: &str) -> Result<String, BackendError>;

    /// Perform a key CRUD operation on behalf of `session_token`
    async fn key_op(
        &self,
        session_token: &str,
        op: KeyOpType,
        key_name: &str,
        key_material: Option<&[u8]>,
    ) -> Result<KeyOpResponse, BackendError>;
}
