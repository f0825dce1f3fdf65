// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session and key context
//!
//! - **context**: lifecycle state machine, session token, fetch-on-miss key resolution
//! - **key_cache**: bounded name → key material map with wipe-on-remove

pub mod context;
pub mod key_cache;

pub use context::{SessionContext, SessionState};
pub use key_cache::{CacheStats, CacheStatsSnapshot, KeyCache, KeyCacheConfig};
