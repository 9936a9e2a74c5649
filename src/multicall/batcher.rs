//! Micro-batching in front of an [`AggregateTransport`].
//!
//! Submissions arriving on the same client within the coalescing window are
//! merged into one aggregation, which is then split into physical
//! `aggregate3` requests by call count and calldata size. Each submitter gets
//! back exactly its own slice of results.

use std::ops::Range;
use std::sync::Arc;

use futures::future::try_join_all;
use log::debug;
use tokio::sync::{oneshot, Mutex};

use crate::abis::{Call3, McResult};
use crate::config::BatchSettings;
use crate::multicall::{AggregateTransport, MulticallError};

type Reply = oneshot::Sender<Result<Vec<McResult>, MulticallError>>;

struct Waiter {
    range: Range<usize>,
    reply: Reply,
}

#[derive(Default)]
struct PendingBatch {
    calls: Vec<Call3>,
    waiters: Vec<Waiter>,
}

impl PendingBatch {
    fn push(&mut self, calls: Vec<Call3>, reply: Reply) {
        let start = self.calls.len();
        self.calls.extend(calls);
        self.waiters.push(Waiter {
            range: start..self.calls.len(),
            reply,
        });
    }
}

#[derive(Clone)]
pub struct Batcher {
    transport: Arc<dyn AggregateTransport>,
    settings: BatchSettings,
    pending: Arc<Mutex<Option<PendingBatch>>>,
}

impl Batcher {
    pub fn new(transport: Arc<dyn AggregateTransport>, settings: BatchSettings) -> Self {
        Self {
            transport,
            settings,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    /// Queue `calls` and wait for their results.
    ///
    /// Dropping the returned future does not cancel the aggregation; its
    /// results are discarded when they arrive.
    pub async fn submit(&self, calls: Vec<Call3>) -> Result<Vec<McResult>, MulticallError> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        let (tx, rx) = oneshot::channel();

        {
            let mut pending = self.pending.lock().await;

            match pending.as_mut() {
                Some(batch) => batch.push(calls, tx),
                None => {
                    let mut batch = PendingBatch::default();
                    batch.push(calls, tx);
                    *pending = Some(batch);

                    tokio::spawn(flush(
                        self.pending.clone(),
                        self.transport.clone(),
                        self.settings,
                    ));
                },
            }
        }

        rx.await.map_err(|_| {
            MulticallError::Transport("aggregation dropped before completion".to_string())
        })?
    }
}

async fn flush(
    pending: Arc<Mutex<Option<PendingBatch>>>,
    transport: Arc<dyn AggregateTransport>,
    settings: BatchSettings,
) {
    let delay = settings.coalesce_delay();
    if delay.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(delay).await;
    }

    let Some(batch) = pending.lock().await.take() else {
        return;
    };

    debug!(
        "Flushing {} calls from {} submissions",
        batch.calls.len(),
        batch.waiters.len()
    );

    let result = dispatch(transport.as_ref(), &batch.calls, &settings).await;

    for waiter in batch.waiters {
        let reply = match &result {
            Ok(results) => Ok(results[waiter.range].to_vec()),
            Err(e) => Err(e.clone()),
        };

        if waiter.reply.send(reply).is_err() {
            debug!("Discarding late multicall result, caller went away");
        }
    }
}

/// Send `calls` as one or more physical requests and join the results.
async fn dispatch(
    transport: &dyn AggregateTransport,
    calls: &[Call3],
    settings: &BatchSettings,
) -> Result<Vec<McResult>, MulticallError> {
    let chunks = plan_chunks(calls, settings);

    let responses = try_join_all(chunks.into_iter().map(|range| async move {
        let chunk = &calls[range];
        let results = transport.aggregate(chunk).await?;

        if results.len() != chunk.len() {
            return Err(MulticallError::Transport(format!(
                "aggregate3 returned {} results for {} calls",
                results.len(),
                chunk.len()
            )));
        }

        Ok(results)
    }))
    .await?;

    Ok(responses.into_iter().flatten().collect())
}

/// Split `calls` into contiguous physical requests.
///
/// A chunk closes when it reaches `calls_per_batch` calls or when the next
/// call would push it over `max_batch_bytes` of calldata. A single call larger
/// than the byte limit still goes out, alone.
pub fn plan_chunks(calls: &[Call3], settings: &BatchSettings) -> Vec<Range<usize>> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut bytes = 0;

    for (i, call) in calls.iter().enumerate() {
        let size = call.callData.len();
        let count = i - start;

        let count_full = settings.calls_per_batch > 0 && count >= settings.calls_per_batch;
        let bytes_full =
            settings.max_batch_bytes > 0 && count > 0 && bytes + size > settings.max_batch_bytes;

        if count_full || bytes_full {
            chunks.push(start..i);
            start = i;
            bytes = 0;
        }

        bytes += size;
    }

    if start < calls.len() {
        chunks.push(start..calls.len());
    }

    chunks
}
