pub mod abis;
pub mod chains;
pub mod config;
pub mod metrics;
pub mod multicall;
pub mod utils;
pub mod worker;

pub use chains::{ChainConfig, ChainDirectory, ChainRegistry};
pub use config::Settings;
pub use metrics::{ExecutionContext, LogSink, MetricsSink};
pub use multicall::{CallRequest, Multicall, MulticallError, MulticallResult, MAX_TIMEOUT};
pub use worker::{MulticallWorker, WorkerHandle};
