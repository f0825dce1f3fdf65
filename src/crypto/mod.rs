// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Crypto Engine
//!
//! Stateless authenticated encryption over AES-256-GCM:
//!
//! - **aes_gcm**: seal/open with a fresh random 96-bit nonce per call
//! - **blob**: base64 transport encoding and section view of encrypted blobs
//! - **key_material**: secret key bytes that are zeroed on drop and on wipe
//!
//! ## Security Considerations
//!
//! - Nonces come from the OS random source and are never counters or derived
//! - Every authentication failure surfaces as the same `DecryptionFailed`
//! - No partial plaintext is ever returned

pub mod aes_gcm;
pub mod blob;
pub mod key_material;

pub use aes_gcm::{
    decrypt, encrypt, Algorithm, ALGORITHM_AES_256_GCM, KEY_LEN, NONCE_LEN, TAG_LEN,
};
pub use blob::{decode_blob, encode_blob, extract_nonce, BlobParts};
pub use key_material::KeyMaterial;

use crate::error::Result;

/// Generate fresh 32-byte AES-256 key material
pub fn generate_key_material() -> Result<KeyMaterial> {
    KeyMaterial::generate()
}
