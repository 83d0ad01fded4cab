// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize telemetry (logs + metrics)
pub fn init_telemetry() {
    // 1. Tracing
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "statehost_node=debug,tower_http=info".into()),
    );
    if tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_err()
    {
        tracing::warn!("tracing subscriber already installed");
    }

    // 2. Prometheus
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROM_HANDLE.set(handle).is_err() {
                tracing::warn!("Prometheus handle already set. Telemetry re-initialized?");
            }
        }
        Err(e) => tracing::warn!("metrics recorder not installed: {}", e),
    }

    describe_metrics();
    metrics::gauge!("statehost_node_up", 1.0);
}

fn describe_metrics() {
    metrics::describe_counter!("statehost_requests_total", "Requests applied and durably recorded");
    metrics::describe_counter!("statehost_append_failures_total", "Requests failed because the record could not be written");
    metrics::describe_counter!("statehost_store_retries_total", "Durable store operations retried after a transient failure");
    metrics::describe_counter!("statehost_snapshots_written_total", "Snapshots written");
    metrics::describe_counter!("statehost_snapshot_failures_total", "Snapshot writes that failed and were deferred");
    metrics::describe_gauge!("statehost_snapshot_size_bytes", "Size of the last written snapshot in bytes");
    metrics::describe_histogram!("statehost_request_duration_seconds", "Time to apply and record one request");
    metrics::describe_histogram!("statehost_replay_duration_seconds", "Time taken by startup recovery");
    metrics::describe_gauge!("statehost_sequence", "Last committed sequence number");
    metrics::describe_gauge!("statehost_node_up", "Set to 1 once telemetry is initialized");
}

/// Get the Prometheus handle to render metrics
pub fn get_metrics() -> String {
    if let Some(handle) = PROM_HANDLE.get() {
        handle.render()
    } else {
        "# metrics not initialized\n".to_string()
    }
}
