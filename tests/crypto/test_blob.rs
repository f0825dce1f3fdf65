// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Tests for blob transport encoding and inspection

use keygate::crypto::{
    decode_blob, decrypt, encode_blob, encrypt, extract_nonce, BlobParts, NONCE_LEN, TAG_LEN,
};
use keygate::KeyGateError;

#[test]
fn test_base64_transport_round_trip() {
    let key = [5u8; 32];
    let blob = encrypt(&key, "AES-256-GCM", b"over the wire").unwrap();

    let encoded = encode_blob(&blob);
    let decoded = decode_blob(&format!("  {}\n", encoded)).unwrap();

    assert_eq!(decoded, blob);
    assert_eq!(
        decrypt(&key, "AES-256-GCM", &decoded).unwrap(),
        b"over the wire"
    );
}

#[test]
fn test_decode_invalid_base64() {
    assert!(matches!(
        decode_blob("not*base64!"),
        Err(KeyGateError::InvalidBlobEncoding { .. })
    ));
}

#[test]
fn test_blob_parts_of_real_blob() {
    let blob = encrypt(&[5u8; 32], "AES-256-GCM", b"0123456789").unwrap();
    let parts = BlobParts::split(&blob).unwrap();

    assert_eq!(parts.nonce, extract_nonce(&blob).unwrap());
    assert_eq!(parts.nonce.len(), NONCE_LEN);
    assert_eq!(parts.ciphertext.len(), 10);
    assert_eq!(parts.tag.len(), TAG_LEN);
}

#[test]
fn test_blob_parts_empty_plaintext() {
    let blob = encrypt(&[5u8; 32], "AES-256-GCM", b"").unwrap();
    let parts = BlobParts::split(&blob).unwrap();
    assert!(parts.ciphertext.is_empty());
}

#[test]
fn test_blob_parts_too_short() {
    assert!(matches!(
        BlobParts::split(&[0u8; NONCE_LEN + TAG_LEN - 1]),
        Err(KeyGateError::CiphertextTooShort { minimum: 28, .. })
    ));
    assert!(extract_nonce(&[0u8; 4]).is_err());
}
