use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use jemallocator::Jemalloc;
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use multicaller::{
    multicall::HttpTransportFactory, CallRequest, ChainRegistry, ExecutionContext, LogSink,
    Multicall, MulticallResult, MulticallWorker, Settings, WorkerHandle,
};

const USAGE: &str = "usage: multicaller <chain_id> <request.json> [--worker]";

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .unwrap();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (chain_id, request_path, use_worker) = match args.as_slice() {
        [chain_id, path] => (chain_id, path, false),
        [chain_id, path, flag] if flag == "--worker" => (chain_id, path, true),
        _ => bail!(USAGE),
    };

    let chain_id: u64 = chain_id
        .parse()
        .with_context(|| format!("Invalid chain id {:?}. {}", chain_id, USAGE))?;

    // Load configuration
    let settings = Settings::new()
        .context("Failed to load config.yaml. Please ensure it exists and is valid")?;

    let raw = tokio::fs::read_to_string(request_path)
        .await
        .with_context(|| format!("Failed to read request file {}", request_path))?;
    let request: CallRequest =
        serde_json::from_str(&raw).context("Request file is not a valid multicall request")?;

    let result = if use_worker {
        run_in_worker(&settings, chain_id, request).await?
    } else {
        let multicall = Multicall::from_settings(&settings, Arc::new(LogSink), ExecutionContext::Main)
            .context("Failed to initialize multicall")?;

        multicall
            .call(
                chain_id,
                &request,
                Duration::from_millis(settings.multicall.max_timeout_ms),
            )
            .await?
    };

    match result {
        Some(result) => {
            info!(
                "Multicall on chain {} finished: {} calls, {} failed",
                chain_id,
                result.outcome_count(),
                result.error_count()
            );
            println!("{}", serde_json::to_string_pretty(&result)?);
        },
        None => info!("Chain {} is not supported, nothing to do", chain_id),
    }

    Ok(())
}

async fn run_in_worker(
    settings: &Settings,
    chain_id: u64,
    request: CallRequest,
) -> anyhow::Result<Option<MulticallResult>> {
    let registry =
        ChainRegistry::from_settings(&settings.chains).context("Invalid chain configuration")?;

    let worker = MulticallWorker::new(
        Arc::new(registry),
        Arc::new(HttpTransportFactory),
        Duration::from_millis(settings.multicall.max_timeout_ms),
        settings.worker.channel_capacity,
    );

    let cancellation_token = CancellationToken::new();
    let (handle, router) = WorkerHandle::spawn(
        worker,
        settings.worker.channel_capacity,
        Arc::new(LogSink),
        cancellation_token.clone(),
    );

    info!("Multicall worker running");

    let result = handle.call(chain_id, request).await;

    cancellation_token.cancel();
    let _ = router.await;

    Ok(result?)
}
