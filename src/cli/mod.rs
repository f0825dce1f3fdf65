// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod demo;
pub mod keys;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::config::{BackendKind, KeyGateConfig};
use crate::session::SessionContext;

/// KeyGate CLI
#[derive(Parser, Debug)]
#[command(name = "keygate-cli")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "Session-gated key management and AES-256-GCM encryption")]
#[command(
    long_about = "Session-gated key management and AES-256-GCM encryption.\n\n\
    The backend defaults to an in-memory mock (KEYGATE_BACKEND=mock) whose keys \
    vanish when the process exits, so only `demo` and `version` run against it. \
    Key commands need KEYGATE_BACKEND=http and KEYGATE_ENDPOINT."
)]
pub struct Cli {
    #[command(flatten)]
    pub session: SessionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Credentials shared by every command
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Registration token (can also be set via KEYGATE_REGISTRATION_TOKEN env var)
    #[arg(long, env = "KEYGATE_REGISTRATION_TOKEN", global = true, hide_env_values = true)]
    pub registration_token: Option<String>,

    /// Identity to authenticate as
    #[arg(long, env = "KEYGATE_IDENTITY", global = true)]
    pub identity: Option<String>,

    /// Secret for the identity
    #[arg(long, env = "KEYGATE_SECRET", global = true, hide_env_values = true)]
    pub secret: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a key on the backend
    CreateKey(keys::CreateKeyArgs),

    /// Delete a key from the backend
    DeleteKey(keys::KeyNameArgs),

    /// Replace a key's material with fresh random bytes
    RotateKey(keys::KeyNameArgs),

    /// Encrypt text under a named key, printing a base64 blob
    Encrypt(keys::EncryptArgs),

    /// Decrypt a base64 blob under a named key
    Decrypt(keys::DecryptArgs),

    /// Run an end-to-end walkthrough against the configured backend
    Demo,

    /// Print version, features and supported algorithms as JSON
    Version,
}

impl Commands {
    /// Whether the command depends on keys persisting across runs
    pub fn needs_persistent_backend(&self) -> bool {
        !matches!(self, Commands::Demo | Commands::Version)
    }
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    if let Commands::Version = cli.command {
        println!(
            "{}",
            serde_json::to_string_pretty(&crate::version::get_version_info())?
        );
        return Ok(());
    }

    let config = KeyGateConfig::from_env();
    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;
    ensure_backend_fits(&config, &cli.command)?;
    info!(
        "🔐 {} using {} backend at {}",
        crate::version::get_version_string(),
        config.backend,
        config.endpoint
    );

    match cli.command {
        Commands::CreateKey(args) => keys::create_key(&config, &cli.session, args).await,
        Commands::DeleteKey(args) => keys::delete_key(&config, &cli.session, args).await,
        Commands::RotateKey(args) => keys::rotate_key(&config, &cli.session, args).await,
        Commands::Encrypt(args) => keys::encrypt(&config, &cli.session, args).await,
        Commands::Decrypt(args) => keys::decrypt(&config, &cli.session, args).await,
        Commands::Demo => demo::run_demo(&config, &cli.session).await,
        Commands::Version => Ok(()),
    }
}

/// Reject key commands against the in-memory backend, whose keys do not
/// outlive this process
pub fn ensure_backend_fits(config: &KeyGateConfig, command: &Commands) -> Result<()> {
    if config.backend == BackendKind::Mock && command.needs_persistent_backend() {
        return Err(anyhow!(
            "The mock backend keeps keys in memory only, so they are gone once this command exits. \
             Set KEYGATE_BACKEND=http and KEYGATE_ENDPOINT to use a real key service, \
             or run `keygate-cli demo` to try the mock backend"
        ));
    }
    Ok(())
}

/// Build a context, initialize it and open a session
pub async fn connect(
    config: &KeyGateConfig,
    registration_token: &str,
    identity: &str,
    secret: &str,
) -> Result<SessionContext> {
    let ctx = SessionContext::from_config(config)?;
    ctx.init(registration_token).await?;
    ctx.create_session(identity, secret).await?;
    Ok(ctx)
}

impl SessionArgs {
    /// Credentials, failing with a hint when any is missing
    pub fn require(&self) -> Result<(&str, &str, &str)> {
        let token = self.registration_token.as_deref().ok_or_else(|| {
            anyhow!("Registration token required. Use --registration-token or set KEYGATE_REGISTRATION_TOKEN")
        })?;
        let identity = self
            .identity
            .as_deref()
            .ok_or_else(|| anyhow!("Identity required. Use --identity or set KEYGATE_IDENTITY"))?;
        let secret = self
            .secret
            .as_deref()
            .ok_or_else(|| anyhow!("Secret required. Use --secret or set KEYGATE_SECRET"))?;
        Ok((token, identity, secret))
    }
}
