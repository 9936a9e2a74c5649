//! Shared fixtures for the multicall tests: a reader contract ABI, request
//! builders and in-memory transports.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::dyn_abi::{DynSolValue, FunctionExt};
use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::MULTICALL3_ADDRESS;
use alloy::sol_types::SolValue;
use futures::future::{self, BoxFuture};
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;
use url::Url;

use crate::abis::{Call3, McResult};
use crate::chains::{ChainConfig, ChainRegistry};
use crate::config::BatchSettings;
use crate::multicall::encoder::EncodedCall;
use crate::multicall::{
    AggregateTransport, CallConfig, ContractCallConfig, MulticallError, TransportFactory,
};

pub const READER: &str = "0x22199a49A999c351eF7927602CFB187ec3cae489";
pub const TOKEN: &str = "0x82aF49447D8a07e3bd95BD0d56f35241523fBab1";
pub const MARKET: &str = "0x70d95587d40A2caf56bd97485aB3Eec10Bee6336";

pub const PRIMARY_URL: &str = "http://primary.rpc/";
pub const FALLBACK_URL: &str = "http://fallback.rpc/";

const READER_ABI: &str = r#"[
  {"type":"function","name":"balanceOf","stateMutability":"view",
   "inputs":[{"name":"account","type":"address"}],
   "outputs":[{"name":"","type":"uint256"}]},
  {"type":"function","name":"getReserves","stateMutability":"view","inputs":[],
   "outputs":[{"name":"reserve0","type":"uint112"},{"name":"reserve1","type":"uint112"},
              {"name":"blockTimestampLast","type":"uint32"}]},
  {"type":"function","name":"getMarket","stateMutability":"view",
   "inputs":[{"name":"key","type":"bytes32"}],
   "outputs":[{"name":"","type":"tuple","internalType":"struct Market.Props",
               "components":[{"name":"token","type":"address"},{"name":"size","type":"uint256"}]}]},
  {"type":"function","name":"getMarkets","stateMutability":"view","inputs":[],
   "outputs":[{"name":"","type":"address[]"}]},
  {"type":"function","name":"price","stateMutability":"view",
   "inputs":[{"name":"token","type":"address"}],
   "outputs":[{"name":"","type":"uint256"}]},
  {"type":"function","name":"price","stateMutability":"view",
   "inputs":[{"name":"token","type":"address"},{"name":"maximize","type":"bool"}],
   "outputs":[{"name":"","type":"uint256"}]},
  {"type":"error","name":"Paused","inputs":[]}
]"#;

pub fn reader_abi() -> Arc<JsonAbi> {
    Arc::new(serde_json::from_str(READER_ABI).unwrap())
}

pub fn call(method_name: &str, params: Vec<Value>) -> CallConfig {
    CallConfig {
        method_name: method_name.to_string(),
        params,
        should_hash_params: false,
    }
}

pub fn contract(address: &str, calls: Vec<(&str, Option<CallConfig>)>) -> ContractCallConfig {
    ContractCallConfig {
        contract_address: address.parse().unwrap(),
        abi: reader_abi(),
        calls: calls
            .into_iter()
            .map(|(key, call)| (key.to_string(), call))
            .collect::<BTreeMap<_, _>>(),
    }
}

/// ABI-encoded return data for `call`'s resolved function.
pub fn encode_output(call: &EncodedCall, values: &[DynSolValue]) -> Bytes {
    call.function
        .as_ref()
        .unwrap()
        .abi_encode_output(values)
        .unwrap()
        .into()
}

/// Answers every call to `READER` with `value` as a `uint256` and reverts
/// everything else.
pub fn reader_balances(value: u64) -> Responder {
    let reader: Address = READER.parse().unwrap();

    Arc::new(move |call: &Call3| {
        if call.target == reader {
            McResult {
                success: true,
                returnData: U256::from(value).abi_encode().into(),
            }
        } else {
            McResult {
                success: false,
                returnData: Bytes::new(),
            }
        }
    })
}

pub type Responder = Arc<dyn Fn(&Call3) -> McResult + Send + Sync>;

#[derive(Clone)]
pub enum Behavior {
    Respond(Responder),
    /// Answer after a delay
    Delayed(Duration, Responder),
    /// Never settle
    Hang,
    Fail(String),
}

pub struct MockTransport {
    behavior: Behavior,
    requests: AsyncMutex<Vec<usize>>,
}

impl MockTransport {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            requests: AsyncMutex::new(Vec::new()),
        })
    }

    pub async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    /// Number of calls in each physical request, in arrival order.
    pub async fn request_sizes(&self) -> Vec<usize> {
        self.requests.lock().await.clone()
    }
}

impl AggregateTransport for MockTransport {
    fn aggregate<'a>(
        &'a self,
        calls: &'a [Call3],
    ) -> BoxFuture<'a, Result<Vec<McResult>, MulticallError>> {
        Box::pin(async move {
            self.requests.lock().await.push(calls.len());

            match &self.behavior {
                Behavior::Respond(responder) => Ok(calls.iter().map(|c| responder(c)).collect()),
                Behavior::Delayed(delay, responder) => {
                    tokio::time::sleep(*delay).await;
                    Ok(calls.iter().map(|c| responder(c)).collect())
                },
                Behavior::Hang => future::pending().await,
                Behavior::Fail(message) => Err(MulticallError::Transport(message.clone())),
            }
        })
    }
}

/// Hands out a fixed transport per URL and counts connections.
#[derive(Default)]
pub struct MockFactory {
    transports: FxHashMap<Url, Arc<MockTransport>>,
    connects: AtomicUsize,
}

impl MockFactory {
    pub fn with(mut self, url: &str, transport: Arc<MockTransport>) -> Self {
        self.transports.insert(url.parse().unwrap(), transport);
        self
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl TransportFactory for MockFactory {
    fn connect(
        &self,
        _chain: &ChainConfig,
        url: &Url,
    ) -> Result<Arc<dyn AggregateTransport>, MulticallError> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        match self.transports.get(url) {
            Some(transport) => Ok(transport.clone()),
            None => Err(MulticallError::Config(format!("no mock transport for {}", url))),
        }
    }
}

pub fn chain_config(chain_id: u64, fallback: Option<&str>) -> ChainConfig {
    ChainConfig {
        chain_id,
        name: format!("test-{}", chain_id),
        rpc_url: Some(PRIMARY_URL.parse().unwrap()),
        fallback_rpc_url: fallback.map(|url| url.parse().unwrap()),
        multicall_address: MULTICALL3_ADDRESS,
        batch: BatchSettings::default(),
    }
}

/// Registry with one supported chain and one chain without a primary URL.
pub fn registry(chain_id: u64, fallback: Option<&str>) -> ChainRegistry {
    let mut registry = ChainRegistry::new();
    registry.insert(chain_config(chain_id, fallback));
    registry.insert(ChainConfig {
        rpc_url: None,
        ..chain_config(chain_id + 1, None)
    });
    registry
}
