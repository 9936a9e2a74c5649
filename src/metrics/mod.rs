//! Structured observability events.
//!
//! Events are fire-and-forget: a sink must never block or fail the call path.
//! Errors are logged but never propagated.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

pub const MULTICALL_TIMEOUT_EVENT: &str = "multicall.timeout";
pub const RPC_TIMEOUT_METRIC: &str = "rpcTimeout";

/// Where the aggregation runs. Only used to label events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionContext {
    Main,
    Worker,
}

impl ExecutionContext {
    pub fn is_main_thread(self) -> bool {
        matches!(self, ExecutionContext::Main)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricData {
    pub metric_type: String,
    pub is_in_main_thread: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricEvent {
    pub event: String,
    pub is_error: bool,
    pub message: String,
    pub data: MetricData,
}

impl MetricEvent {
    /// Primary aggregation attempt timed out or failed at the transport level.
    pub fn rpc_timeout(message: impl Into<String>, context: ExecutionContext) -> Self {
        Self {
            event: MULTICALL_TIMEOUT_EVENT.to_string(),
            is_error: true,
            message: message.into(),
            data: MetricData {
                metric_type: RPC_TIMEOUT_METRIC.to_string(),
                is_in_main_thread: context.is_main_thread(),
            },
        }
    }
}

pub trait MetricsSink: Send + Sync {
    fn emit(&self, event: MetricEvent);
}

/// Writes each event as a single JSON log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl MetricsSink for LogSink {
    fn emit(&self, event: MetricEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => info!("metric {}", json),
            Err(e) => warn!("Failed to serialize metric {}: {}", event.event, e),
        }
    }
}

/// Forwards events to a bounded channel, dropping them when it is full.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<MetricEvent>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::Sender<MetricEvent>) -> Self {
        Self { sender }
    }
}

impl MetricsSink for ChannelSink {
    fn emit(&self, event: MetricEvent) {
        if let Err(e) = self.sender.try_send(event) {
            warn!("Dropping metric event: {}", e);
        }
    }
}
