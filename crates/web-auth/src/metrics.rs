//! Login flow metrics
//!
//! Emitted through the `metrics` facade; they are no-ops until the
//! application installs a recorder.
//!
//! - `lock_auth_flows_started_total` (counter): label `mode`
//! - `lock_auth_flows_completed_total` (counter): label `outcome`
//! - `lock_auth_redirects_ignored_total` (counter)

/// Record a login attempt handed to the launcher.
pub fn record_flow_started(mode: &str) {
    metrics::counter!("lock_auth_flows_started_total", "mode" => mode.to_string()).increment(1);
}

/// Record the terminal result of an attempt.
pub fn record_flow_completed(outcome: &str) {
    metrics::counter!("lock_auth_flows_completed_total", "outcome" => outcome.to_string())
        .increment(1);
}

/// Record a redirect that did not belong to the pending attempt.
pub fn record_redirect_ignored() {
    metrics::counter!("lock_auth_redirects_ignored_total").increment(1);
}
