use alloy::providers::MULTICALL3_ADDRESS;
use log::info;
use rustc_hash::FxHashMap;
use url::Url;

use crate::chains::{known_chain_name, ChainConfig, ChainDirectory};
use crate::config::{BatchSettings, ChainSettings};
use crate::multicall::MulticallError;

/// In-memory [`ChainDirectory`] built from configuration.
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: FxHashMap<u64, ChainConfig>,
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from the `chains` section of the settings.
    ///
    /// Empty URLs count as absent; malformed ones are a config error.
    pub fn from_settings(chains: &[ChainSettings]) -> Result<Self, MulticallError> {
        let mut registry = Self::new();

        for settings in chains {
            let config = ChainConfig {
                chain_id: settings.chain_id,
                name: settings
                    .name
                    .clone()
                    .or_else(|| known_chain_name(settings.chain_id).map(str::to_string))
                    .unwrap_or_else(|| format!("chain-{}", settings.chain_id)),
                rpc_url: parse_url(settings.chain_id, settings.rpc_url.as_deref())?,
                fallback_rpc_url: parse_url(
                    settings.chain_id,
                    settings.fallback_rpc_url.as_deref(),
                )?,
                multicall_address: settings.multicall_address.unwrap_or(MULTICALL3_ADDRESS),
                batch: settings
                    .batch
                    .unwrap_or_else(|| BatchSettings::for_chain(settings.chain_id)),
            };

            info!(
                "Registered chain {} ({}) - fallback: {}",
                config.name,
                config.chain_id,
                if config.fallback_rpc_url.is_some() { "yes" } else { "no" }
            );

            registry.insert(config);
        }

        Ok(registry)
    }

    pub fn insert(&mut self, config: ChainConfig) {
        self.chains.insert(config.chain_id, config);
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

impl ChainDirectory for ChainRegistry {
    fn chain(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.chains.get(&chain_id)
    }
}

fn parse_url(chain_id: u64, url: Option<&str>) -> Result<Option<Url>, MulticallError> {
    match url.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => Url::parse(raw).map(Some).map_err(|e| {
            MulticallError::Config(format!("invalid RPC URL for chain {}: {}", chain_id, e))
        }),
    }
}
