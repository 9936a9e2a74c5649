//! Chain endpoint directory.
//!
//! Supplies, per chain id, the primary RPC URL (absence means the chain is
//! unsupported), an optional fallback RPC URL, the Multicall3 address and the
//! batching policy used to build aggregation clients.

mod registry;

use alloy::primitives::Address;
use url::Url;

use crate::config::BatchSettings;

pub use registry::ChainRegistry;

pub const ARBITRUM: u64 = 42161;
pub const AVALANCHE: u64 = 43114;
pub const AVALANCHE_FUJI: u64 = 43113;
pub const ARBITRUM_GOERLI: u64 = 421613;

/// Display name for the chains with built-in defaults.
pub fn known_chain_name(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        ARBITRUM => Some("Arbitrum One"),
        AVALANCHE => Some("Avalanche"),
        AVALANCHE_FUJI => Some("Avalanche Fuji"),
        ARBITRUM_GOERLI => Some("Arbitrum Goerli"),
        _ => None,
    }
}

/// Resolved configuration for a single chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: Option<Url>,
    pub fallback_rpc_url: Option<Url>,
    pub multicall_address: Address,
    pub batch: BatchSettings,
}

/// Lookup of chain endpoints and metadata by chain id.
pub trait ChainDirectory: Send + Sync {
    fn chain(&self, chain_id: u64) -> Option<&ChainConfig>;

    fn rpc_url(&self, chain_id: u64) -> Option<Url> {
        self.chain(chain_id).and_then(|c| c.rpc_url.clone())
    }

    fn fallback_rpc_url(&self, chain_id: u64) -> Option<Url> {
        self.chain(chain_id).and_then(|c| c.fallback_rpc_url.clone())
    }
}
