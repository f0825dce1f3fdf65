// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Tests for AES-256-GCM seal/open
// Blob format: [nonce (12 bytes) | ciphertext | tag (16 bytes)]

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use keygate::crypto::{decrypt, encrypt, generate_key_material, NONCE_LEN, TAG_LEN};
use keygate::KeyGateError;
use std::collections::HashSet;

const ALG: &str = "AES-256-GCM";

/// Test 1: Round trip for a range of plaintext sizes
#[test]
fn test_round_trip_various_sizes() {
    let key = generate_key_material().unwrap();

    for size in [0usize, 1, 15, 16, 17, 1024, 64 * 1024] {
        let plaintext: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        let blob = encrypt(key.as_bytes(), ALG, &plaintext).unwrap();

        assert_eq!(blob.len(), NONCE_LEN + size + TAG_LEN, "size {}", size);
        assert_eq!(decrypt(key.as_bytes(), ALG, &blob).unwrap(), plaintext);
    }
}

/// Test 2: Same key and plaintext never produce the same blob
#[test]
fn test_nonce_freshness() {
    let key = [7u8; 32];
    let mut nonces = HashSet::new();
    let mut blobs = HashSet::new();

    for _ in 0..200 {
        let blob = encrypt(&key, ALG, b"hello").unwrap();
        nonces.insert(blob[..NONCE_LEN].to_vec());
        blobs.insert(blob);
    }

    assert_eq!(nonces.len(), 200, "Nonces must not repeat");
    assert_eq!(blobs.len(), 200, "Blobs must not repeat");
}

/// Test 3: Interoperates with a plain AES-256-GCM implementation
#[test]
fn test_blob_layout_matches_standard_gcm() {
    let key = [42u8; 32];
    let blob = encrypt(&key, ALG, b"interop").unwrap();

    let cipher = Aes256Gcm::new_from_slice(&key).unwrap();
    let opened = cipher
        .decrypt(
            Nonce::from_slice(&blob[..NONCE_LEN]),
            Payload {
                msg: &blob[NONCE_LEN..],
                aad: b"",
            },
        )
        .unwrap();
    assert_eq!(opened, b"interop");
}

/// Test 4: Blobs shorter than a nonce are rejected before any crypto
#[test]
fn test_ciphertext_too_short() {
    let key = [1u8; 32];
    for len in 0..NONCE_LEN {
        match decrypt(&key, ALG, &vec![0u8; len]) {
            Err(KeyGateError::CiphertextTooShort { minimum, actual }) => {
                assert_eq!(minimum, NONCE_LEN);
                assert_eq!(actual, len);
            }
            other => panic!("Expected CiphertextTooShort for len {}, got {:?}", len, other),
        }
    }
}

/// Test 5: Truncation anywhere past the nonce fails authentication
#[test]
fn test_truncated_blob_fails() {
    let key = [1u8; 32];
    let blob = encrypt(&key, ALG, b"truncate me please").unwrap();

    for len in NONCE_LEN..blob.len() {
        assert!(
            matches!(
                decrypt(&key, ALG, &blob[..len]),
                Err(KeyGateError::DecryptionFailed)
            ),
            "Truncation to {} bytes must fail",
            len
        );
    }
}

/// Test 6: Flipping any single bit fails with the same error
#[test]
fn test_single_bit_flip_fails() {
    let key = [9u8; 32];
    let blob = encrypt(&key, ALG, b"tamper").unwrap();

    for byte in 0..blob.len() {
        for bit in 0..8 {
            let mut tampered = blob.clone();
            tampered[byte] ^= 1 << bit;
            assert!(
                matches!(
                    decrypt(&key, ALG, &tampered),
                    Err(KeyGateError::DecryptionFailed)
                ),
                "Bit {} of byte {} flipped but decryption succeeded",
                bit,
                byte
            );
        }
    }
}

/// Test 7: Wrong key fails
#[test]
fn test_wrong_key_fails() {
    let blob = encrypt(&[1u8; 32], ALG, b"secret").unwrap();
    assert!(matches!(
        decrypt(&[2u8; 32], ALG, &blob),
        Err(KeyGateError::DecryptionFailed)
    ));
}

/// Test 8: Key size and algorithm validation
#[test]
fn test_input_validation() {
    for len in [0usize, 16, 31, 33, 64] {
        match encrypt(&vec![0u8; len], ALG, b"x") {
            Err(KeyGateError::InvalidKeySize { expected, actual }) => {
                assert_eq!(expected, 32);
                assert_eq!(actual, len);
            }
            other => panic!("Expected InvalidKeySize, got {:?}", other),
        }
    }

    for alg in ["AES-128-GCM", "ChaCha20-Poly1305", ""] {
        assert!(matches!(
            encrypt(&[0u8; 32], alg, b"x"),
            Err(KeyGateError::UnsupportedAlgorithm { .. })
        ));
        assert!(matches!(
            decrypt(&[0u8; 32], alg, &[0u8; 40]),
            Err(KeyGateError::UnsupportedAlgorithm { .. })
        ));
    }
}
