use chrono::{DateTime, Utc};

#[inline]
pub fn log_perf(scope: &str, started_at: DateTime<Utc>, details: &str) {
    let elapsed_ms = (Utc::now() - started_at).num_milliseconds();
    if details.trim().is_empty() {
        tracing::info!(scope, elapsed_ms, "[perf] completed");
    } else {
        tracing::info!(scope, elapsed_ms, details, "[perf] completed");
    }
}
