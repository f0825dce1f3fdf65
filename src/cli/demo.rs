// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use tracing::info;

use super::{connect, SessionArgs};
use crate::backend::KeyOpType;
use crate::config::KeyGateConfig;
use crate::crypto::{self, encode_blob, ALGORITHM_AES_256_GCM};

const DEMO_REGISTRATION_TOKEN: &str = "demo-registration-token";
const DEMO_IDENTITY: &str = "alice";
const DEMO_SECRET: &str = "pw";

/// Walk through init, session, key creation, encryption, rotation and cleanup
///
/// Credentials default to demo values, which the mock backend accepts.
pub async fn run_demo(config: &KeyGateConfig, session: &SessionArgs) -> Result<()> {
    let token = session
        .registration_token
        .as_deref()
        .unwrap_or(DEMO_REGISTRATION_TOKEN);
    let identity = session.identity.as_deref().unwrap_or(DEMO_IDENTITY);
    let secret = session.secret.as_deref().unwrap_or(DEMO_SECRET);

    let ctx = connect(config, token, identity, secret).await?;
    println!("✅ Session established for {}", identity);

    let suffix = hex::encode(&crypto::generate_key_material()?.as_bytes()[..4]);
    let key_name = format!("demo-{}", suffix);
    ctx.key_operation(KeyOpType::Create, &key_name, None).await?;
    println!("🔑 Created key '{}'", key_name);

    let c1 = ctx.encrypt(&key_name, ALGORITHM_AES_256_GCM, b"hello").await?;
    let c2 = ctx.encrypt(&key_name, ALGORITHM_AES_256_GCM, b"hello").await?;
    if c1 == c2 {
        return Err(anyhow!("Identical blobs for repeated encryption"));
    }
    println!("🔒 C1 = {}", encode_blob(&c1));
    println!("🔒 C2 = {}", encode_blob(&c2));

    let plaintext = ctx.decrypt(&key_name, ALGORITHM_AES_256_GCM, &c1).await?;
    println!("🔓 Decrypt(C1) = {}", String::from_utf8_lossy(&plaintext));

    ctx.rotate_key(&key_name).await?;
    match ctx.decrypt(&key_name, ALGORITHM_AES_256_GCM, &c1).await {
        Err(e) => println!("🔄 Rotated; old blob no longer opens ({})", e),
        Ok(_) => return Err(anyhow!("Old blob still decrypts after rotation")),
    }

    ctx.key_operation(KeyOpType::Delete, &key_name, None).await?;
    println!("🗑️  Deleted key '{}'", key_name);

    let stats = ctx.cache_stats().await;
    info!(
        hits = stats.hits,
        misses = stats.misses,
        wipes = stats.wipes,
        "Cache statistics"
    );

    ctx.cleanup().await;
    println!("✅ Demo complete, context state: {}", ctx.state().await);
    Ok(())
}
