use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, error, warn};
use rustc_hash::FxHashMap;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::metrics::MetricsSink;
use crate::multicall::{CallRequest, MulticallError, MulticallResult};
use crate::worker::{MetricsMessage, MulticallWorker, WorkerRequest, WorkerResponse};

type Pending = Arc<Mutex<FxHashMap<u64, oneshot::Sender<WorkerResponse>>>>;

/// Caller side of a [`MulticallWorker`].
///
/// Correlates responses to requests by id and re-emits the worker's metric
/// events on the caller's sink.
pub struct WorkerHandle {
    requests: mpsc::Sender<WorkerRequest>,
    pending: Pending,
    next_id: AtomicU64,
    context_key: Option<String>,
}

impl WorkerHandle {
    /// Start `worker` and its response router.
    ///
    /// The returned join handle completes once the worker has stopped and
    /// every in-flight response has been routed.
    pub fn spawn(
        worker: MulticallWorker,
        channel_capacity: usize,
        sink: Arc<dyn MetricsSink>,
        cancellation_token: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let capacity = channel_capacity.max(1);
        let (request_tx, request_rx) = mpsc::channel::<WorkerRequest>(capacity);
        let (response_tx, response_rx) = mpsc::channel::<WorkerResponse>(capacity);
        let (metrics_tx, metrics_rx) = mpsc::channel::<MetricsMessage>(capacity);

        tokio::spawn(async move {
            if let Err(e) = worker
                .run(request_rx, response_tx, metrics_tx, cancellation_token)
                .await
            {
                error!("Multicall worker failed: {:#}", e);
            }
        });

        let pending: Pending = Arc::new(Mutex::new(FxHashMap::default()));
        let router = tokio::spawn(route(response_rx, metrics_rx, pending.clone(), sink));

        let handle = Self {
            requests: request_tx,
            pending,
            next_id: AtomicU64::new(1),
            context_key: None,
        };

        (handle, router)
    }

    /// Tag every request from this handle with `context_key`.
    pub fn with_context_key(mut self, context_key: impl Into<String>) -> Self {
        self.context_key = Some(context_key.into());
        self
    }

    /// Same contract as [`Multicall::call`](crate::multicall::Multicall::call),
    /// served by the worker with its configured timeout.
    pub async fn call(
        &self,
        chain_id: u64,
        request: CallRequest,
    ) -> Result<Option<MulticallResult>, MulticallError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        self.pending.lock().await.insert(id, tx);

        let message = WorkerRequest {
            chain_id,
            request,
            id,
            context_key: self.context_key.clone(),
        };

        if self.requests.send(message).await.is_err() {
            self.pending.lock().await.remove(&id);
            return Err(MulticallError::Worker("worker is not running".to_string()));
        }

        match rx.await {
            Ok(WorkerResponse::Result { result, .. }) => Ok(result),
            Ok(WorkerResponse::Error { error, .. }) => Err(MulticallError::Worker(error).truncated()),
            Err(_) => Err(MulticallError::Worker("worker stopped before answering".to_string())),
        }
    }
}

async fn route(
    mut responses: mpsc::Receiver<WorkerResponse>,
    mut metrics: mpsc::Receiver<MetricsMessage>,
    pending: Pending,
    sink: Arc<dyn MetricsSink>,
) {
    let mut metrics_open = true;

    loop {
        tokio::select! {
            response = responses.recv() => {
                let Some(response) = response else {
                    break;
                };

                let id = response.id();
                match pending.lock().await.remove(&id) {
                    Some(reply) => {
                        if reply.send(response).is_err() {
                            debug!("Caller for worker response {} went away", id);
                        }
                    },
                    None => warn!("Received worker response for unknown id {}", id),
                }
            },
            message = metrics.recv(), if metrics_open => {
                match message {
                    Some(message) if message.is_metrics => sink.emit(message.detail),
                    Some(_) => {},
                    None => metrics_open = false,
                }
            },
        }
    }

    // Worker is gone; fail whatever is still waiting
    pending.lock().await.clear();
}
