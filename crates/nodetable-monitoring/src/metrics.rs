//! Metrics recorded as structured log events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

static SLOW_REQUEST_THRESHOLD_MS: AtomicU64 = AtomicU64::new(2_000);

/// Sets the duration above which requests are reported at warn level.
pub fn set_slow_request_threshold(threshold: Duration) {
    SLOW_REQUEST_THRESHOLD_MS.store(threshold.as_millis() as u64, Ordering::Relaxed);
}

/// Data layer metrics
pub struct ClientMetrics;

impl ClientMetrics {
    /// Record one HTTP round trip to the backend
    pub fn record_http_request(path: &str, method: &str, status_code: u16, duration: Duration) {
        let duration_ms = duration.as_millis() as u64;
        if duration_ms >= SLOW_REQUEST_THRESHOLD_MS.load(Ordering::Relaxed) {
            warn!(path, method, status = status_code, duration_ms, "Slow HTTP request");
        } else {
            debug!(path, method, status = status_code, duration_ms, "HTTP request");
        }
    }

    /// Record a cache lookup
    pub fn record_cache_lookup(kind: &str, hit: bool) {
        debug!(kind, hit, "Cache lookup");
    }

    /// Record a finished mutation
    pub fn record_mutation(name: &str, invalidated_keys: usize, success: bool) {
        info!(mutation = name, invalidated_keys, success, "Mutation finished");
    }
}
