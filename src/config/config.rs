use std::time::Duration;

use alloy::primitives::Address;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::chains::AVALANCHE_FUJI;

/// Per-chain aggregation batching knobs.
///
/// These are pure performance tuning; results are identical for any values.
/// - `calls_per_batch`: max logical calls in one physical `aggregate3` request (0 = no limit)
/// - `max_batch_bytes`: max summed calldata bytes in one physical request (0 = no limit)
/// - `coalesce_delay_ms`: window during which concurrent submissions on the same
///   client are merged into one aggregation (0 = merge within the current scheduler tick)
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct BatchSettings {
    #[serde(default)]
    pub calls_per_batch: usize,
    #[serde(default = "default_max_batch_bytes")]
    pub max_batch_bytes: usize,
    #[serde(default)]
    pub coalesce_delay_ms: u64,
}

fn default_max_batch_bytes() -> usize {
    1024 * 1024 // 1MB of calldata per aggregate3
}

impl BatchSettings {
    /// Built-in batching policy for a chain id.
    pub fn for_chain(chain_id: u64) -> Self {
        match chain_id {
            // Fuji public RPC rejects very large multicalls
            AVALANCHE_FUJI => Self {
                calls_per_batch: 40,
                max_batch_bytes: default_max_batch_bytes(),
                coalesce_delay_ms: 0,
            },
            _ => Self::default(),
        }
    }

    pub fn coalesce_delay(&self) -> Duration {
        Duration::from_millis(self.coalesce_delay_ms)
    }
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            calls_per_batch: 0,
            max_batch_bytes: default_max_batch_bytes(),
            coalesce_delay_ms: 0,
        }
    }
}

/// Endpoint configuration for one chain.
///
/// A chain without `rpc_url` is known but unsupported: calls against it
/// resolve to no result instead of hitting the network.
#[derive(Debug, Deserialize, Clone)]
pub struct ChainSettings {
    pub chain_id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rpc_url: Option<String>,
    #[serde(default)]
    pub fallback_rpc_url: Option<String>,
    /// Defaults to the canonical Multicall3 deployment
    #[serde(default)]
    pub multicall_address: Option<Address>,
    /// Defaults to [`BatchSettings::for_chain`]
    #[serde(default)]
    pub batch: Option<BatchSettings>,
}

/// Aggregation call settings.
#[derive(Debug, Deserialize, Clone)]
pub struct MulticallSettings {
    /// Timeout for the primary attempt of each aggregation
    #[serde(default = "default_max_timeout_ms")]
    pub max_timeout_ms: u64,
}

fn default_max_timeout_ms() -> u64 {
    20_000
}

impl Default for MulticallSettings {
    fn default() -> Self {
        Self {
            max_timeout_ms: default_max_timeout_ms(),
        }
    }
}

/// Background worker settings.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkerSettings {
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    128
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Root application configuration.
///
/// Loaded from `config.yaml` at startup, with `MULTICALLER__` prefixed
/// environment variables taking precedence
/// (e.g. `MULTICALLER__MULTICALL__MAX_TIMEOUT_MS=5000`).
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub multicall: MulticallSettings,
    #[serde(default)]
    pub worker: WorkerSettings,
    #[serde(default)]
    pub chains: Vec<ChainSettings>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config"))
            .add_source(Environment::with_prefix("MULTICALLER").separator("__"))
            .build()?;

        let settings: Settings = s.try_deserialize()?;

        Ok(settings)
    }
}
