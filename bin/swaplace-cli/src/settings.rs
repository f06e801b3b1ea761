//! Layered settings: defaults, then `swaplace.toml` (or `--config`), then
//! `SWAPLACE_*` environment variables.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use swaplace_core::{codec, SwaplaceConfig};

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,

    /// Emit logs as JSON lines
    pub log_json: bool,

    /// Protocol account used as spender by the simulated asset contracts
    pub protocol_address: Option<String>,

    /// Clock start for simulations; wall clock when unset
    pub genesis_timestamp: Option<u64>,
}

impl Settings {
    /// Loads settings, reading `path` if given and `swaplace.toml` if present otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("log_level", "info")?
            .set_default("log_json", false)?;

        builder = match path {
            Some(path) => builder.add_source(File::from(path)),
            None => builder.add_source(File::with_name("swaplace").required(false)),
        };

        builder
            .add_source(Environment::with_prefix("SWAPLACE"))
            .build()
            .context("failed to read settings")?
            .try_deserialize()
            .context("invalid settings")
    }

    /// Protocol configuration derived from these settings
    pub fn swaplace_config(&self) -> Result<SwaplaceConfig> {
        match &self.protocol_address {
            Some(address) => Ok(SwaplaceConfig {
                address: codec::parse_address(address)
                    .context("invalid protocol_address setting")?,
            }),
            None => Ok(SwaplaceConfig::default()),
        }
    }

    pub fn genesis_timestamp(&self) -> u64 {
        self.genesis_timestamp.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_secs())
                .unwrap_or_default()
        })
    }
}
