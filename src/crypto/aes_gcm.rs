// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! AES-256-GCM Seal/Open
//!
//! Stateless authenticated encryption used for every crypto operation the
//! session context performs.
//!
//! **Encrypted Blob Format**:
//! ```text
//! [nonce (12 bytes) | ciphertext (variable) | tag (16 bytes)]
//! ```
//!
//! - Nonce: 12 bytes (96 bits), drawn from the OS random source on every call
//! - Tag: 16-byte GCM authentication tag appended by the cipher
//! - No Additional Authenticated Data (AAD)

use std::fmt;
use std::str::FromStr;

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{KeyGateError, Result};

/// Canonical algorithm identifier
pub const ALGORITHM_AES_256_GCM: &str = "AES-256-GCM";

/// AES-256 key length (32 bytes)
pub const KEY_LEN: usize = 32;

/// GCM nonce length (12 bytes)
pub const NONCE_LEN: usize = 12;

/// GCM authentication tag length (16 bytes)
pub const TAG_LEN: usize = 16;

/// Supported AEAD algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Aes256Gcm,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Aes256Gcm => ALGORITHM_AES_256_GCM,
        }
    }

    pub fn key_len(&self) -> usize {
        match self {
            Algorithm::Aes256Gcm => KEY_LEN,
        }
    }
}

impl FromStr for Algorithm {
    type Err = KeyGateError;

    /// Case-insensitive match against `AES-256-GCM`
    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case(ALGORITHM_AES_256_GCM) {
            Ok(Algorithm::Aes256Gcm)
        } else {
            Err(KeyGateError::UnsupportedAlgorithm {
                algorithm: s.to_string(),
            })
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn cipher_for(algorithm: &str, key: &[u8]) -> Result<Aes256Gcm> {
    let algorithm: Algorithm = algorithm.parse()?;

    if key.len() != algorithm.key_len() {
        return Err(KeyGateError::InvalidKeySize {
            expected: algorithm.key_len(),
            actual: key.len(),
        });
    }

    Aes256Gcm::new_from_slice(key).map_err(|_| KeyGateError::InvalidKeySize {
        expected: algorithm.key_len(),
        actual: key.len(),
    })
}

fn generate_nonce() -> Result<[u8; NONCE_LEN]> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng
        .try_fill_bytes(&mut nonce)
        .map_err(|e| KeyGateError::EntropyUnavailable {
            reason: e.to_string(),
        })?;
    Ok(nonce)
}

/// Encrypt `plaintext` under `key`
///
/// # Arguments
///
/// * `key` - 32-byte AES-256 key
/// * `algorithm` - Must case-insensitively equal `AES-256-GCM`
/// * `plaintext` - Arbitrary bytes, may be empty
///
/// # Returns
///
/// `nonce || ciphertext || tag`. Encrypting the same input twice yields
/// different blobs because the nonce is fresh on every call.
///
/// # Errors
///
/// - `UnsupportedAlgorithm` for any algorithm other than AES-256-GCM
/// - `InvalidKeySize` unless the key is exactly 32 bytes
/// - `EntropyUnavailable` if the OS random source fails
pub fn encrypt(key: &[u8], algorithm: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = cipher_for(algorithm, key)?;
    let nonce_bytes = generate_nonce()?;

    let sealed = cipher
        .encrypt(
            Nonce::from_slice(&nonce_bytes),
            Payload {
                msg: plaintext,
                aad: b"",
            },
        )
        .map_err(|e| KeyGateError::EncryptionFailed {
            reason: e.to_string(),
        })?;

    let mut blob = Vec::with_capacity(NONCE_LEN + sealed.len());
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&sealed);
    Ok(blob)
}

/// Decrypt a blob produced by [`encrypt`]
///
/// # Errors
///
/// - `UnsupportedAlgorithm` / `InvalidKeySize` as for [`encrypt`]
/// - `CiphertextTooShort` if the blob cannot hold a nonce
/// - `DecryptionFailed` for every authentication failure (wrong key,
///   truncated tag, flipped bit). No partial plaintext is ever returned.
pub fn decrypt(key: &[u8], algorithm: &str, blob: &[u8]) -> Result<Vec<u8>> {
    let cipher = cipher_for(algorithm, key)?;

    if blob.len() < NONCE_LEN {
        return Err(KeyGateError::CiphertextTooShort {
            minimum: NONCE_LEN,
            actual: blob.len(),
        });
    }

    let (nonce, remainder) = blob.split_at(NONCE_LEN);

    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: remainder,
                aad: b"",
            },
        )
        .map_err(|_| KeyGateError::DecryptionFailed)
}
