// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod backend;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod session;
pub mod version;

// Re-export main types
pub use backend::{HttpKeyService, KeyOpResponse, KeyOpType, KeyService, MockKeyService};
pub use config::{BackendKind, KeyGateConfig, ServiceConfig};
pub use crypto::{decrypt, encrypt, generate_key_material, Algorithm, KeyMaterial};
pub use error::{BackendError, KeyGateError, Result};
pub use session::{CacheStatsSnapshot, KeyCacheConfig, SessionContext, SessionState};
