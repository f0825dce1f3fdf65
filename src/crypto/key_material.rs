// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Raw key material with guaranteed erasure.
//!
//! The bytes live in a [`Zeroizing`] buffer, so every copy handed out by the
//! cache is cleared when dropped. [`KeyMaterial::wipe`] clears a value in place
//! before it is removed from the cache.

use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::aes_gcm::KEY_LEN;
use crate::error::{KeyGateError, Result};

/// Secret key bytes. Never empty, `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    bytes: Zeroizing<Vec<u8>>,
}

impl KeyMaterial {
    /// Wrap raw bytes. Returns `None` for an empty buffer.
    pub fn new(bytes: Vec<u8>) -> Option<Self> {
        if bytes.is_empty() {
            return None;
        }
        Some(Self {
            bytes: Zeroizing::new(bytes),
        })
    }

    /// Copy bytes from a slice. Returns `None` for an empty slice.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        Self::new(bytes.to_vec())
    }

    /// Generate a fresh 32-byte AES-256 key from the OS random source.
    pub fn generate() -> Result<Self> {
        let mut bytes = Zeroizing::new(vec![0u8; KEY_LEN]);
        OsRng
            .try_fill_bytes(bytes.as_mut_slice())
            .map_err(|e| KeyGateError::EntropyUnavailable {
                reason: e.to_string(),
            })?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_slice()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Hex encoding used on the backend wire.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.as_bytes()))
    }

    /// Zero the bytes in place. The value is empty afterwards and must not be used.
    pub fn wipe(&mut self) {
        self.bytes.zeroize();
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("len", &self.len())
            .field("bytes", &"<redacted>")
            .finish()
    }
}
