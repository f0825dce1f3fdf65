// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! KeyGate Error Types
//!
//! One error type for every operation exposed by the crate, plus the error
//! type produced by [`KeyService`](crate::backend::KeyService) adapters.
//!
//! ## Error Variants
//!
//! - **InvalidRegistrationToken**: `init` called with an empty token
//! - **NotInitialized**: context is not `Ready` (never initialized, or cleaned up)
//! - **AuthenticationFailed**: backend refused or could not process a login
//! - **NoActiveSession**: key operation attempted without a session token
//! - **KeyNotFound**: neither the cache nor the backend knows the key
//! - **UnsupportedAlgorithm / InvalidKeySize / CiphertextTooShort**: engine input validation
//! - **DecryptionFailed**: AEAD open failed; deliberately carries no detail
//! - **UnsupportedOperation**: unknown key operation type
//! - **BackendUnavailable**: any other backend failure, wrapped with the operation name
//!
//! ## Context Preservation
//!
//! Backend failures keep the original [`BackendError`] as their `source`, so a
//! caller can tell a rejected request from an unreachable service with
//! [`BackendError::is_unreachable`]. `DecryptionFailed` is the one variant that
//! never carries context: tag mismatch, truncation and corruption all look the same.

use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, KeyGateError>;

/// Error returned by a Backend Key Service adapter
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// Transport-level failure: connection refused, DNS, timeout
    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    /// Backend refused the credential or token (HTTP 401/403)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Backend has no record of the requested resource (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend answered with any other non-success status
    #[error("Backend rejected request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    /// Backend answered with a body that could not be decoded
    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),

    /// Backend does not support the requested operation
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Configured endpoint cannot be used as a base URL
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl BackendError {
    /// True when the backend could not be reached at all
    pub fn is_unreachable(&self) -> bool {
        matches!(self, BackendError::Unreachable(_))
    }
}

/// Error type for all KeyGate operations
#[derive(Debug, Error)]
pub enum KeyGateError {
    /// The registration token passed to `init` was empty
    #[error("Registration token cannot be empty")]
    InvalidRegistrationToken,

    /// The context is not in the `Ready` state
    #[error("KeyGate is not initialized; call init() first")]
    NotInitialized,

    /// Authentication with the backend failed
    ///
    /// `source` tells whether the backend rejected the credentials or could
    /// not be reached.
    #[error("Authentication failed for identity '{identity}': {source}")]
    AuthenticationFailed {
        /// Identity that attempted to authenticate
        identity: String,
        #[source]
        source: BackendError,
    },

    /// A key operation was attempted without a session token
    #[error("No active session; call create_session() first")]
    NoActiveSession,

    /// Key is neither cached nor known to the backend
    #[error("Key not found: {key_name}")]
    KeyNotFound { key_name: String },

    /// Only AES-256-GCM is supported
    #[error("Unsupported algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },

    /// Key material length does not match the cipher's key size
    #[error("Invalid key size: expected {expected} bytes, got {actual} bytes")]
    InvalidKeySize { expected: usize, actual: usize },

    /// Encrypted blob is too short to contain a nonce
    #[error("Ciphertext too short: expected at least {minimum} bytes, got {actual}")]
    CiphertextTooShort { minimum: usize, actual: usize },

    /// AEAD open failed
    #[error("Decryption failed")]
    DecryptionFailed,

    /// Key operation type is not one of CREATE, READ, UPDATE, DELETE
    #[error("Unsupported operation: {operation}")]
    UnsupportedOperation { operation: String },

    /// Backend failure other than authentication, missing key, or unsupported operation
    #[error("Backend unavailable during {operation}: {source}")]
    BackendUnavailable {
        /// Which backend call failed (e.g. "fetch_config", "key_op:READ")
        operation: String,
        #[source]
        source: BackendError,
    },

    /// Base64 transport encoding of a blob was malformed
    #[error("Invalid blob encoding: {reason}")]
    InvalidBlobEncoding { reason: String },

    /// AEAD seal failed
    #[error("Encryption failed: {reason}")]
    EncryptionFailed { reason: String },

    /// The OS random source could not provide bytes
    #[error("Random source unavailable: {reason}")]
    EntropyUnavailable { reason: String },
}

impl KeyGateError {
    /// Errors a caller can recover from by calling `init`, `create_session`,
    /// or creating the missing key.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            KeyGateError::NotInitialized
                | KeyGateError::NoActiveSession
                | KeyGateError::KeyNotFound { .. }
        )
    }

    pub(crate) fn backend(operation: impl Into<String>, source: BackendError) -> Self {
        KeyGateError::BackendUnavailable {
            operation: operation.into(),
            source,
        }
    }
}

impl From<base64::DecodeError> for KeyGateError {
    fn from(err: base64::DecodeError) -> Self {
        KeyGateError::InvalidBlobEncoding {
            reason: err.to_string(),
        }
    }
}
