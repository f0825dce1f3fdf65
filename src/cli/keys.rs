// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::io::Write;

use anyhow::{anyhow, Result};
use clap::Args;
use tracing::info;
use zeroize::Zeroizing;

use super::{connect, SessionArgs};
use crate::backend::KeyOpType;
use crate::config::KeyGateConfig;
use crate::crypto::{decode_blob, encode_blob, ALGORITHM_AES_256_GCM};

/// Arguments for create-key command
#[derive(Args, Debug)]
pub struct CreateKeyArgs {
    /// Key name
    #[arg(long)]
    pub name: String,

    /// Hex-encoded key material; the backend generates a key when omitted
    #[arg(long)]
    pub material_hex: Option<String>,
}

/// Arguments for commands that only take a key name
#[derive(Args, Debug)]
pub struct KeyNameArgs {
    /// Key name
    #[arg(long)]
    pub name: String,
}

/// Arguments for encrypt command
#[derive(Args, Debug)]
pub struct EncryptArgs {
    /// Key name
    #[arg(long)]
    pub key: String,

    /// AEAD algorithm
    #[arg(long, default_value = ALGORITHM_AES_256_GCM)]
    pub algorithm: String,

    /// Plaintext to encrypt
    #[arg(long)]
    pub input: String,
}

/// Arguments for decrypt command
#[derive(Args, Debug)]
pub struct DecryptArgs {
    /// Key name
    #[arg(long)]
    pub key: String,

    /// AEAD algorithm
    #[arg(long, default_value = ALGORITHM_AES_256_GCM)]
    pub algorithm: String,

    /// Base64-encoded blob produced by `encrypt`
    #[arg(long)]
    pub input: String,
}

/// Create a key on the backend
pub async fn create_key(
    config: &KeyGateConfig,
    session: &SessionArgs,
    args: CreateKeyArgs,
) -> Result<()> {
    let material = match args.material_hex.as_deref() {
        Some(hex_str) => {
            let bytes = Zeroizing::new(
                hex::decode(hex_str.trim()).map_err(|e| anyhow!("Invalid --material-hex: {}", e))?,
            );
            if bytes.is_empty() {
                return Err(anyhow!("--material-hex must not be empty"));
            }
            Some(bytes)
        }
        None => None,
    };

    let (token, identity, secret) = session.require()?;
    let ctx = connect(config, token, identity, secret).await?;

    ctx.key_operation(
        KeyOpType::Create,
        &args.name,
        material.as_ref().map(|m| m.as_slice()),
    )
    .await?;

    println!("✅ Key '{}' created", args.name);
    ctx.cleanup().await;
    Ok(())
}

/// Delete a key from the backend
pub async fn delete_key(
    config: &KeyGateConfig,
    session: &SessionArgs,
    args: KeyNameArgs,
) -> Result<()> {
    let (token, identity, secret) = session.require()?;
    let ctx = connect(config, token, identity, secret).await?;

    ctx.key_operation(KeyOpType::Delete, &args.name, None).await?;

    println!("🗑️  Key '{}' deleted", args.name);
    ctx.cleanup().await;
    Ok(())
}

/// Rotate a key's material
pub async fn rotate_key(
    config: &KeyGateConfig,
    session: &SessionArgs,
    args: KeyNameArgs,
) -> Result<()> {
    let (token, identity, secret) = session.require()?;
    let ctx = connect(config, token, identity, secret).await?;

    ctx.rotate_key(&args.name).await?;

    println!("🔄 Key '{}' rotated", args.name);
    ctx.cleanup().await;
    Ok(())
}

/// Encrypt text and print the base64 blob
pub async fn encrypt(
    config: &KeyGateConfig,
    session: &SessionArgs,
    args: EncryptArgs,
) -> Result<()> {
    let (token, identity, secret) = session.require()?;
    let ctx = connect(config, token, identity, secret).await?;

    let blob = ctx
        .encrypt(&args.key, &args.algorithm, args.input.as_bytes())
        .await?;
    info!(key_name = %args.key, bytes = blob.len(), "Encrypted");

    println!("{}", encode_blob(&blob));
    ctx.cleanup().await;
    Ok(())
}

/// Decrypt a base64 blob and write the plaintext to stdout
pub async fn decrypt(
    config: &KeyGateConfig,
    session: &SessionArgs,
    args: DecryptArgs,
) -> Result<()> {
    let blob = decode_blob(&args.input)?;

    let (token, identity, secret) = session.require()?;
    let ctx = connect(config, token, identity, secret).await?;

    let plaintext = Zeroizing::new(ctx.decrypt(&args.key, &args.algorithm, &blob).await?);
    ctx.cleanup().await;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&plaintext)?;
    stdout.write_all(b"\n")?;
    Ok(())
}
