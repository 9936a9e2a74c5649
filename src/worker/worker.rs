use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::chains::ChainDirectory;
use crate::metrics::{ChannelSink, ExecutionContext, MetricEvent};
use crate::multicall::{Multicall, TransportFactory};
use crate::worker::{MetricsMessage, WorkerRequest, WorkerResponse};

/// Background aggregation worker.
///
/// Owns its own [`Multicall`] service (and so its own client cache). Every
/// request is answered on the response channel under its correlation id;
/// metric events raised while serving are posted on the metrics channel.
pub struct MulticallWorker {
    multicall: Arc<Multicall>,
    metric_events: mpsc::Receiver<MetricEvent>,
    max_timeout: Duration,
}

impl MulticallWorker {
    pub fn new(
        chains: Arc<dyn ChainDirectory>,
        factory: Arc<dyn TransportFactory>,
        max_timeout: Duration,
        channel_capacity: usize,
    ) -> Self {
        let (tx, metric_events) = mpsc::channel(channel_capacity.max(1));
        let sink = Arc::new(ChannelSink::new(tx));

        Self {
            multicall: Arc::new(Multicall::new(chains, factory, sink, ExecutionContext::Worker)),
            metric_events,
            max_timeout,
        }
    }

    pub async fn run(
        self,
        mut requests: mpsc::Receiver<WorkerRequest>,
        responses: mpsc::Sender<WorkerResponse>,
        metrics: mpsc::Sender<MetricsMessage>,
        cancellation_token: CancellationToken,
    ) -> anyhow::Result<()> {
        let Self {
            multicall,
            mut metric_events,
            max_timeout,
        } = self;

        info!("Multicall worker started");

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    info!("Multicall worker received cancellation signal");
                    break;
                },
                request = requests.recv() => {
                    let Some(request) = request else {
                        info!("Multicall worker request channel closed");
                        break;
                    };

                    let multicall = multicall.clone();
                    let responses = responses.clone();

                    tokio::spawn(async move {
                        debug!(
                            "Serving multicall request {} for chain {} (context: {})",
                            request.id,
                            request.chain_id,
                            request.context_key.as_deref().unwrap_or("-")
                        );

                        let outcome =
                            multicall.call(request.chain_id, &request.request, max_timeout).await;

                        if responses.send(WorkerResponse::new(request.id, outcome)).await.is_err() {
                            warn!("Dropping multicall response {}, receiver closed", request.id);
                        }
                    });
                },
                Some(event) = metric_events.recv() => {
                    if metrics.send(MetricsMessage::from(event)).await.is_err() {
                        debug!("Metrics channel closed, dropping worker metric");
                    }
                },
            }
        }

        Ok(())
    }
}
