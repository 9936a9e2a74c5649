use std::sync::Arc;

use alloy::primitives::Address;
use alloy::providers::{DynProvider, ProviderBuilder};
use alloy::rpc::client::RpcClient;
use alloy::transports::http::{reqwest, Http};
use futures::future::BoxFuture;
use url::Url;

use crate::abis::{Call3, IMulticall3, McResult};
use crate::chains::ChainConfig;
use crate::multicall::{MulticallError, MAX_TIMEOUT};

/// One physical `aggregate3` round-trip.
///
/// Implementations must answer with exactly one result per call, in order.
pub trait AggregateTransport: Send + Sync {
    fn aggregate<'a>(
        &'a self,
        calls: &'a [Call3],
    ) -> BoxFuture<'a, Result<Vec<McResult>, MulticallError>>;
}

/// Builds transports for a chain endpoint.
pub trait TransportFactory: Send + Sync {
    fn connect(
        &self,
        chain: &ChainConfig,
        url: &Url,
    ) -> Result<Arc<dyn AggregateTransport>, MulticallError>;
}

/// Multicall3 over alloy's HTTP provider.
///
/// The provider has no retry layer; its HTTP client gives up after
/// [`MAX_TIMEOUT`].
#[derive(Clone)]
pub struct HttpTransport {
    provider: DynProvider,
    multicall_address: Address,
}

impl HttpTransport {
    pub fn connect(url: Url, multicall_address: Address) -> Result<Self, MulticallError> {
        let http_client = reqwest::Client::builder()
            .timeout(MAX_TIMEOUT)
            .build()
            .map_err(|e| MulticallError::Config(format!("failed to build HTTP client: {}", e)))?;

        let client = RpcClient::new(Http::with_client(http_client, url), false);
        let provider = DynProvider::new(ProviderBuilder::new().connect_client(client));

        Ok(Self {
            provider,
            multicall_address,
        })
    }

    async fn aggregate3(&self, calls: &[Call3]) -> Result<Vec<McResult>, MulticallError> {
        let multicall = IMulticall3::new(self.multicall_address, &self.provider);

        multicall
            .aggregate3(calls.to_vec())
            .call()
            .await
            .map_err(|e| MulticallError::Transport(e.to_string()))
    }
}

impl AggregateTransport for HttpTransport {
    fn aggregate<'a>(
        &'a self,
        calls: &'a [Call3],
    ) -> BoxFuture<'a, Result<Vec<McResult>, MulticallError>> {
        Box::pin(self.aggregate3(calls))
    }
}

/// Default factory: an [`HttpTransport`] against the chain's Multicall3.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpTransportFactory;

impl TransportFactory for HttpTransportFactory {
    fn connect(
        &self,
        chain: &ChainConfig,
        url: &Url,
    ) -> Result<Arc<dyn AggregateTransport>, MulticallError> {
        let transport = HttpTransport::connect(url.clone(), chain.multicall_address)?;
        Ok(Arc::new(transport))
    }
}
