//! Prometheus recorder for the login flow counters
//!
//! Installed only with `--print-metrics`. The counters themselves are
//! emitted by `web_auth::metrics`; this module renders them.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {e}"))
}
