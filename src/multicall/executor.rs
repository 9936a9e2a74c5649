use std::sync::Arc;
use std::time::Duration;

use log::error;
use tokio::time::timeout;

use crate::abis::{Call3, McResult};
use crate::metrics::{ExecutionContext, MetricEvent, MetricsSink};
use crate::multicall::client::MulticallClient;
use crate::multicall::MulticallError;

/// Default and ceiling for the primary attempt's deadline.
pub const MAX_TIMEOUT: Duration = Duration::from_millis(20_000);

/// Deadline actually applied for a requested `max_timeout`.
///
/// Zero means "use the default"; anything above [`MAX_TIMEOUT`] is clamped.
pub fn effective_timeout(max_timeout: Duration) -> Duration {
    if max_timeout.is_zero() {
        MAX_TIMEOUT
    } else {
        max_timeout.min(MAX_TIMEOUT)
    }
}

/// Runs the primary attempt of an aggregation against a deadline.
pub struct BatchExecutor {
    sink: Arc<dyn MetricsSink>,
    context: ExecutionContext,
}

impl BatchExecutor {
    pub fn new(sink: Arc<dyn MetricsSink>, context: ExecutionContext) -> Self {
        Self { sink, context }
    }

    /// Race the aggregation against the deadline.
    ///
    /// On a timeout the request future is dropped; whatever it returns later
    /// is discarded. Every failure is reported to the sink before it is
    /// returned.
    pub async fn execute(
        &self,
        client: &MulticallClient,
        calls: Vec<Call3>,
        max_timeout: Duration,
    ) -> Result<Vec<McResult>, MulticallError> {
        let result = match timeout(effective_timeout(max_timeout), client.multicall(calls)).await {
            Ok(result) => result,
            Err(_) => Err(MulticallError::Timeout),
        };

        result.map_err(|e| self.report(e))
    }

    fn report(&self, error: MulticallError) -> MulticallError {
        let error = error.truncated();

        self.sink.emit(MetricEvent::rpc_timeout(error.to_string(), self.context));
        error!("multicall error: {}", error);

        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BatchSettings;
    use crate::metrics::ChannelSink;
    use crate::multicall::testing::{reader_balances, Behavior, MockTransport, PRIMARY_URL};
    use crate::utils::MAX_ERROR_MESSAGE_LENGTH;
    use tokio::sync::mpsc;

    fn client(behavior: Behavior) -> MulticallClient {
        MulticallClient::new(
            42161,
            PRIMARY_URL.parse().unwrap(),
            MockTransport::new(behavior),
            BatchSettings::default(),
        )
    }

    fn executor(context: ExecutionContext) -> (BatchExecutor, mpsc::Receiver<MetricEvent>) {
        let (tx, rx) = mpsc::channel(8);
        (BatchExecutor::new(Arc::new(ChannelSink::new(tx)), context), rx)
    }

    #[test]
    fn test_effective_timeout() {
        assert_eq!(effective_timeout(Duration::from_millis(100)), Duration::from_millis(100));
        assert_eq!(effective_timeout(Duration::from_secs(60)), MAX_TIMEOUT);
        assert_eq!(effective_timeout(Duration::ZERO), MAX_TIMEOUT);
    }

    #[tokio::test]
    async fn test_success_emits_nothing() {
        let (executor, mut metrics) = executor(ExecutionContext::Main);
        let client = client(Behavior::Respond(reader_balances(1)));

        let results = executor.execute(&client, Vec::new(), Duration::from_millis(100)).await;

        assert!(results.unwrap().is_empty());
        assert!(metrics.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let (executor, mut metrics) = executor(ExecutionContext::Worker);
        let client = client(Behavior::Hang);
        let calls = vec![Call3::tolerant(Default::default(), Default::default())];

        let err = executor.execute(&client, calls, Duration::from_millis(50)).await.unwrap_err();

        assert_eq!(err, MulticallError::Timeout);

        let event = metrics.try_recv().unwrap();
        assert_eq!(event.message, "multicall timeout");
        assert!(event.is_error);
        assert!(!event.data.is_in_main_thread);
    }

    #[tokio::test]
    async fn test_transport_error_is_truncated_and_reported() {
        let (executor, mut metrics) = executor(ExecutionContext::Main);
        let client = client(Behavior::Fail("e".repeat(500)));
        let calls = vec![Call3::tolerant(Default::default(), Default::default())];

        let err = executor.execute(&client, calls, Duration::from_millis(50)).await.unwrap_err();

        assert_eq!(err.to_string().len(), MAX_ERROR_MESSAGE_LENGTH);

        let event = metrics.try_recv().unwrap();
        assert_eq!(event.message.len(), MAX_ERROR_MESSAGE_LENGTH);
        assert!(event.data.is_in_main_thread);
    }
}
