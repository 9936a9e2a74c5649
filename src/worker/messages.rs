use serde::{Deserialize, Serialize};

use crate::metrics::MetricEvent;
use crate::multicall::{CallRequest, MulticallError, MulticallResult};

/// Request posted to the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRequest {
    pub chain_id: u64,
    pub request: CallRequest,
    /// Correlation id, echoed back in the response
    pub id: u64,
    /// Opaque caller context, only used for logging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_key: Option<String>,
}

/// Response posted back by the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkerResponse {
    // Must stay first: `Result` would also accept a payload without `result`
    Error {
        id: u64,
        error: String,
    },
    Result {
        id: u64,
        result: Option<MulticallResult>,
    },
}

impl WorkerResponse {
    pub fn new(id: u64, outcome: Result<Option<MulticallResult>, MulticallError>) -> Self {
        match outcome {
            Ok(result) => WorkerResponse::Result { id, result },
            Err(e) => WorkerResponse::Error {
                id,
                error: e.to_string(),
            },
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            WorkerResponse::Error { id, .. } | WorkerResponse::Result { id, .. } => *id,
        }
    }
}

/// Metric event forwarded from the worker on the metrics side-channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsMessage {
    pub is_metrics: bool,
    pub detail: MetricEvent,
}

impl From<MetricEvent> for MetricsMessage {
    fn from(detail: MetricEvent) -> Self {
        Self {
            is_metrics: true,
            detail,
        }
    }
}
