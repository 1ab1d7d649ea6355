use std::env;
use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{info, warn};

pub const RANKING_RUNS_TOTAL: &str = "cr_ranking_runs_total";
pub const CANDIDATES_SCORED_TOTAL: &str = "cr_candidates_scored_total";
pub const CANDIDATES_SKIPPED_TOTAL: &str = "cr_candidates_skipped_total";
pub const RANKING_DURATION_SECONDS: &str = "cr_ranking_duration_seconds";

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the global Prometheus recorder and serves it on `0.0.0.0:<port>`.
///
/// The port comes from `port_env`, falling back to `default_port`. Must be
/// called from inside a Tokio runtime. Repeated calls return the first handle.
pub fn init_metrics(port_env: &str, default_port: u16) -> Option<&'static PrometheusHandle> {
    if let Some(existing) = PROMETHEUS_HANDLE.get() {
        return Some(existing);
    }

    let port = env::var(port_env)
        .ok()
        .and_then(|raw| raw.trim().parse::<u16>().ok())
        .unwrap_or(default_port);

    let (recorder, exporter) = match PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .build()
    {
        Ok(parts) => parts,
        Err(err) => {
            warn!(error = %err, metrics_port = port, "failed to build prometheus exporter");
            return None;
        }
    };

    let handle = recorder.handle();
    if metrics::set_global_recorder(recorder).is_err() {
        warn!("a global metrics recorder is already installed");
        return None;
    }
    tokio::spawn(async move {
        if exporter.await.is_err() {
            warn!("prometheus exporter stopped");
        }
    });

    let _ = PROMETHEUS_HANDLE.set(handle);
    info!(metrics_port = port, "started prometheus exporter");
    PROMETHEUS_HANDLE.get()
}

/// Records one answered rank request.
pub fn record_ranking(reused: bool, scored: usize, skipped: usize, elapsed: Duration) {
    counter!(RANKING_RUNS_TOTAL, "reused" => if reused { "true" } else { "false" }).increment(1);
    if !reused {
        counter!(CANDIDATES_SCORED_TOTAL).increment(scored as u64);
        counter!(CANDIDATES_SKIPPED_TOTAL).increment(skipped as u64);
    }
    histogram!(RANKING_DURATION_SECONDS).record(elapsed.as_secs_f64());
}
