//! Aggregated contract reads over Multicall3.
//!
//! A [`CallRequest`] is encoded into positional calls, sent to the chain's
//! primary endpoint under a deadline, retried once against the fallback
//! endpoint on failure, and reconciled back into a [`MulticallResult`].

mod batcher;
mod client;
mod encoder;
mod error;
mod executor;
mod fallback;
mod reconciler;
mod service;
mod transport;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use batcher::{plan_chunks, Batcher};
pub use client::MulticallClient;
pub use encoder::{encode_request, EncodedCall, EncodedRequest, ReturnShape};
pub use error::{EncodeError, MulticallError};
pub use executor::{effective_timeout, BatchExecutor, MAX_TIMEOUT};
pub use fallback::FallbackCoordinator;
pub use reconciler::{decode_revert, normalize, reconcile, CallResponse};
pub use service::Multicall;
pub use transport::{AggregateTransport, HttpTransport, HttpTransportFactory, TransportFactory};
pub use types::{
    CallConfig, CallFailure, CallOutcome, CallRequest, ContractCallConfig, MulticallResult,
    OriginalKey,
};
