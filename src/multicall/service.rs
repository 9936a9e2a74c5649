use std::sync::Arc;
use std::time::Duration;

use log::debug;
use moka::future::Cache;

use crate::chains::{ChainDirectory, ChainRegistry};
use crate::config::Settings;
use crate::metrics::{ExecutionContext, MetricsSink};
use crate::multicall::client::MulticallClient;
use crate::multicall::encoder::encode_request;
use crate::multicall::executor::BatchExecutor;
use crate::multicall::fallback::FallbackCoordinator;
use crate::multicall::reconciler::reconcile;
use crate::multicall::{
    CallRequest, HttpTransportFactory, MulticallError, MulticallResult, TransportFactory,
};

/// Entry point for aggregated reads.
///
/// Owns one long-lived aggregation client per chain. Fallback clients are
/// never cached.
pub struct Multicall {
    chains: Arc<dyn ChainDirectory>,
    factory: Arc<dyn TransportFactory>,
    clients: Cache<u64, Arc<MulticallClient>>,
    executor: BatchExecutor,
    fallback: FallbackCoordinator,
}

impl Multicall {
    pub fn new(
        chains: Arc<dyn ChainDirectory>,
        factory: Arc<dyn TransportFactory>,
        sink: Arc<dyn MetricsSink>,
        context: ExecutionContext,
    ) -> Self {
        Self {
            fallback: FallbackCoordinator::new(chains.clone(), factory.clone()),
            executor: BatchExecutor::new(sink, context),
            clients: Cache::builder().build(),
            chains,
            factory,
        }
    }

    /// Service over HTTP transports for the configured chains.
    pub fn from_settings(
        settings: &Settings,
        sink: Arc<dyn MetricsSink>,
        context: ExecutionContext,
    ) -> Result<Self, MulticallError> {
        let registry = ChainRegistry::from_settings(&settings.chains)?;
        Ok(Self::new(Arc::new(registry), Arc::new(HttpTransportFactory), sink, context))
    }

    /// Cached client for `chain_id`, created on first use.
    ///
    /// `None` when the chain has no primary RPC URL.
    pub async fn client(
        &self,
        chain_id: u64,
    ) -> Result<Option<Arc<MulticallClient>>, MulticallError> {
        let Some(chain) = self.chains.chain(chain_id) else {
            return Ok(None);
        };
        let Some(url) = chain.rpc_url.as_ref() else {
            return Ok(None);
        };

        if let Some(client) = self.clients.get(&chain_id).await {
            if client.chain_id() == chain_id {
                return Ok(Some(client));
            }
        }

        debug!("Creating multicall client for chain {} ({})", chain.name, chain_id);

        let client = Arc::new(MulticallClient::connect(chain, url, self.factory.as_ref())?);
        self.clients.insert(chain_id, client.clone()).await;

        Ok(Some(client))
    }

    /// Run one aggregated read.
    ///
    /// Returns `Ok(None)` for an unsupported chain. Per-call reverts are
    /// reported inside the result; `Err` means neither the primary nor the
    /// fallback endpoint produced an answer.
    pub async fn call(
        &self,
        chain_id: u64,
        request: &CallRequest,
        max_timeout: Duration,
    ) -> Result<Option<MulticallResult>, MulticallError> {
        let Some(client) = self.client(chain_id).await.map_err(MulticallError::truncated)? else {
            debug!("Chain {} is not supported, skipping multicall", chain_id);
            return Ok(None);
        };

        let encoded = encode_request(request);
        let payload = encoded.payload();

        let results = match self.executor.execute(&client, payload.clone(), max_timeout).await {
            Ok(results) => results,
            Err(primary_error) => self.fallback.recover(chain_id, payload, primary_error).await?,
        };

        Ok(Some(reconcile(&encoded, encoded.align(results))))
    }
}
