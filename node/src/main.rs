// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use statehost_node::config::NodeConfig;
use statehost_node::errors::NodeError;
use statehost_node::processor::RequestProcessor;
use statehost_node::programs::KeyValueProgram;
use statehost_node::server::build_router;
use statehost_node::store::{FileStore, RetryPolicy};
use statehost_node::telemetry::init_telemetry;
use statehost_node::worker::ProcessorWorker;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), NodeError> {
    init_telemetry();

    let cfg = NodeConfig::from_env()?;
    tracing::info!("Initializing statehost node with config: {:?}", cfg);

    let store = FileStore::open(&cfg.data_dir, RetryPolicy::new(cfg.retry))?;
    tracing::info!("Data directory: {}", store.root().display());

    // Recovery runs here; a fatal error stops startup before we listen.
    let engine = cfg.engine;
    let processor = tokio::task::spawn_blocking(move || {
        RequestProcessor::open(KeyValueProgram, Arc::new(store), engine)
    })
    .await
    .map_err(|e| NodeError::Startup(e.to_string()))?
    .map_err(|e| {
        tracing::error!("Refusing to start: {}", e);
        e
    })?;

    let (worker, handle) = ProcessorWorker::spawn(processor, cfg.queue_depth)?;
    let app = build_router(handle, cfg.max_body_bytes);

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    let listener = TcpListener::bind(cfg.bind_addr).await?;
    tracing::info!("Listening on {}", cfg.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("HTTP server stopped, draining processor");
    worker.shutdown().await;
    Ok(())
}

async fn wait_for_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
    token.cancel();
}
