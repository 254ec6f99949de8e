// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::cfg::enums::Security;

/// Client-wide configuration, loaded from a YAML document.
///
/// Mirrors §6's "Configuration" table: everything here is a default or a
/// policy knob, never per-call state (credentials, current directory, and
/// the like live on `Session`).
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ClientConfig {
    /// Control-channel reply timeout, in seconds. Must be `> 0` after
    /// `validate_and_normalize`.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// When true, `fopen` always takes a sibling connection from the pool
    /// even when the root session is free (open question (b), §9).
    #[serde(default = "default_true")]
    pub file_transfer_second_connection: bool,

    /// When true, directory listings drop entries whose reported type is
    /// neither file nor dir.
    #[serde(default = "default_true")]
    pub content_listing_filter: bool,

    /// Whether to attempt `EPSV` before falling back to `PASV`. Cleared at
    /// runtime (not this config) the first time a server rejects `EPSV`.
    #[serde(default = "default_true")]
    pub use_epsv: bool,

    /// Whether to attempt `MLSD` before falling back to legacy `LIST`.
    /// Cleared at runtime the first time a server rejects `MLSD`.
    #[serde(default = "default_true")]
    pub use_mlsd: bool,

    /// Maximum number of idle temporary (sibling) sessions the pool keeps
    /// around after use before reclaiming the oldest.
    #[serde(default = "default_pool_idle_cap")]
    pub pool_idle_cap: usize,

    /// Transport security requested by `open` when the caller does not
    /// override it explicitly.
    #[serde(default)]
    pub security: Security,

    /// Accept self-signed/invalid TLS certificates and hostname mismatches.
    /// Intended for testing against a local mock server; never enable this
    /// against a production FTPS endpoint.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_pool_idle_cap() -> usize {
    1
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            file_transfer_second_connection: true,
            content_listing_filter: true,
            use_epsv: true,
            use_mlsd: true,
            pool_idle_cap: default_pool_idle_cap(),
            security: Security::default(),
            accept_invalid_certs: false,
        }
    }
}

impl ClientConfig {
    /// Loads a config from a YAML file at `path`, then validates it.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {path:?}"))?;
        let mut cfg: ClientConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {path:?}"))?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Enforces the invariants implied by §6: a zero or negative-seeming
    /// timeout would make every wait fail immediately.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(self.timeout_seconds > 0, "timeout_seconds must be greater than zero");
        ensure!(self.pool_idle_cap > 0, "pool_idle_cap must be greater than zero");
        Ok(())
    }
}
