// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize logs (stderr, filtered by RUST_LOG) and the metrics recorder.
pub fn init_telemetry() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "qradle_kernel=info,qradle_cli=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROM_HANDLE.set(handle).is_err() {
                tracing::warn!("Prometheus handle already set. Telemetry re-initialized?");
            }
        }
        Err(e) => tracing::warn!("Metrics recorder not installed: {}", e),
    }

    metrics::describe_counter!("qradle_executions_total", "Executions that passed the pre-checks");
    metrics::describe_counter!("qradle_execution_failures_total", "Operations that returned an error");
    metrics::describe_counter!("qradle_invariant_violations_total", "Fatal invariant violations by invariant");
    metrics::describe_histogram!("qradle_execution_duration_seconds", "Wall-clock time of committed executions");
    metrics::describe_gauge!("qradle_chain_length", "Entries in the hash chain");
}

/// Render collected metrics in Prometheus text format.
pub fn get_metrics() -> String {
    if let Some(handle) = PROM_HANDLE.get() {
        handle.render()
    } else {
        "# metrics not initialized".to_string()
    }
}
