// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Encrypted blob transport helpers.
//!
//! Blobs are opaque to callers; when they travel inside a text payload they are
//! standard base64 with padding.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::crypto::aes_gcm::{NONCE_LEN, TAG_LEN};
use crate::error::{KeyGateError, Result};

/// Base64-encode a blob for a JSON/text field
pub fn encode_blob(blob: &[u8]) -> String {
    STANDARD.encode(blob)
}

/// Decode a base64 blob received in a JSON/text field
pub fn decode_blob(encoded: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(encoded.trim())?)
}

/// Extract the nonce prefix from an encrypted blob
///
/// # Errors
///
/// `CiphertextTooShort` if the blob is shorter than 12 bytes
pub fn extract_nonce(blob: &[u8]) -> Result<&[u8]> {
    if blob.len() < NONCE_LEN {
        return Err(KeyGateError::CiphertextTooShort {
            minimum: NONCE_LEN,
            actual: blob.len(),
        });
    }

    Ok(&blob[..NONCE_LEN])
}

/// Borrowed view of the three sections of a blob
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobParts<'a> {
    pub nonce: &'a [u8],
    pub ciphertext: &'a [u8],
    pub tag: &'a [u8],
}

impl<'a> BlobParts<'a> {
    /// Split a blob into nonce, ciphertext and tag. Does not authenticate anything.
    pub fn split(blob: &'a [u8]) -> Result<Self> {
        let minimum = NONCE_LEN + TAG_LEN;
        if blob.len() < minimum {
            return Err(KeyGateError::CiphertextTooShort {
                minimum,
                actual: blob.len(),
            });
        }

        let (nonce, rest) = blob.split_at(NONCE_LEN);
        let (ciphertext, tag) = rest.split_at(rest.len() - TAG_LEN);
        Ok(Self {
            nonce,
            ciphertext,
            tag,
        })
    }
}
