use std::sync::Arc;

use log::{debug, error};

use crate::abis::{Call3, McResult};
use crate::chains::ChainDirectory;
use crate::multicall::client::MulticallClient;
use crate::multicall::{MulticallError, TransportFactory};

/// Single-hop retry against a chain's secondary endpoint.
pub struct FallbackCoordinator {
    chains: Arc<dyn ChainDirectory>,
    factory: Arc<dyn TransportFactory>,
}

impl FallbackCoordinator {
    pub fn new(chains: Arc<dyn ChainDirectory>, factory: Arc<dyn TransportFactory>) -> Self {
        Self { chains, factory }
    }

    /// Reissue `calls` against the fallback endpoint after the primary failed.
    ///
    /// Without a fallback URL the primary error is returned. The fallback
    /// client is built for this attempt only and runs without a deadline.
    pub async fn recover(
        &self,
        chain_id: u64,
        calls: Vec<Call3>,
        primary_error: MulticallError,
    ) -> Result<Vec<McResult>, MulticallError> {
        let Some(chain) = self.chains.chain(chain_id) else {
            return Err(primary_error.truncated());
        };

        let Some(url) = chain.fallback_rpc_url.as_ref() else {
            return Err(primary_error.truncated());
        };

        debug!("using multicall fallback for chain {}", chain_id);

        let attempt = async {
            let client = MulticallClient::connect(chain, url, self.factory.as_ref())?;
            client.multicall(calls).await
        };

        attempt.await.map_err(|e| {
            let e = MulticallError::Fallback(e.to_string()).truncated();
            error!("multicall fallback error: {}", e);
            e
        })
    }
}
