//! Monitoring helpers for Nodetable: logging setup and log-based metrics.

use std::time::Duration;
use tracing::info;

pub mod logging;
pub mod metrics;

/// Configuration for initializing the monitoring system
#[derive(Debug, Clone)]
pub struct MonitoringConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    /// Log level filter (e.g., "info,nodetable=debug"), overridden by RUST_LOG
    pub log_filter: String,
    /// Emit JSON lines instead of human readable output
    pub enable_json_logging: bool,
    /// Log span close events with their duration
    pub log_span_timings: bool,
    /// Environment (dev, staging, prod)
    pub environment: String,
    /// Requests slower than this are logged at warn level
    pub slow_request_threshold: Duration,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            service_name: "nodetable".to_string(),
            log_filter: "info".to_string(),
            enable_json_logging: false,
            log_span_timings: false,
            environment: "dev".to_string(),
            slow_request_threshold: Duration::from_secs(2),
        }
    }
}

/// Initialize monitoring system
pub fn init(config: &MonitoringConfig) -> anyhow::Result<()> {
    logging::init_logging(config)?;
    metrics::set_slow_request_threshold(config.slow_request_threshold);
    info!(environment = %config.environment, "Monitoring initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = MonitoringConfig::default();
        assert_eq!(config.service_name, "nodetable");
        assert!(!config.enable_json_logging);
    }
}

// Exported types
pub use crate::logging::{init_logging, LogExt};
pub use crate::metrics::ClientMetrics;
