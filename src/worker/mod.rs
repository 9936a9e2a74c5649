//! Isolated background execution of aggregated reads.
//!
//! A [`MulticallWorker`] serves correlated requests over channels; a
//! [`WorkerHandle`] is the caller side. Metric events raised inside the worker
//! travel on a separate channel and are re-emitted on the caller's sink.

mod handle;
mod messages;
mod worker;

pub use handle::WorkerHandle;
pub use messages::{MetricsMessage, WorkerRequest, WorkerResponse};
pub use worker::MulticallWorker;
