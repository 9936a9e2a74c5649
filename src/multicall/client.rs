use std::sync::Arc;

use url::Url;

use crate::abis::{Call3, McResult};
use crate::chains::ChainConfig;
use crate::config::BatchSettings;
use crate::multicall::batcher::Batcher;
use crate::multicall::{AggregateTransport, MulticallError, TransportFactory};

/// Aggregation client bound to one chain endpoint.
pub struct MulticallClient {
    chain_id: u64,
    rpc_url: Url,
    batcher: Batcher,
}

impl MulticallClient {
    pub fn new(
        chain_id: u64,
        rpc_url: Url,
        transport: Arc<dyn AggregateTransport>,
        settings: BatchSettings,
    ) -> Self {
        Self {
            chain_id,
            rpc_url,
            batcher: Batcher::new(transport, settings),
        }
    }

    pub fn connect(
        chain: &ChainConfig,
        url: &Url,
        factory: &dyn TransportFactory,
    ) -> Result<Self, MulticallError> {
        let transport = factory.connect(chain, url)?;
        Ok(Self::new(chain.chain_id, url.clone(), transport, chain.batch))
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn rpc_url(&self) -> &Url {
        &self.rpc_url
    }

    /// Results come back one per call, in call order.
    pub async fn multicall(&self, calls: Vec<Call3>) -> Result<Vec<McResult>, MulticallError> {
        self.batcher.submit(calls).await
    }
}

impl std::fmt::Debug for MulticallClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MulticallClient")
            .field("chain_id", &self.chain_id)
            .field("rpc_url", &self.rpc_url.as_str())
            .finish()
    }
}
