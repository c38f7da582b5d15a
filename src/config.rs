//! Controller configuration

use crate::error::{OperatorError, Result};
use crate::logs::{DEFAULT_CHUNK_SIZE, DEFAULT_LOG_WINDOW};
use std::time::Duration;

pub const DEFAULT_REQUEUE_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_ERROR_REQUEUE_INTERVAL: Duration = Duration::from_secs(5);

/// Settings for the restart policy controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace to watch (`None` for all namespaces)
    pub namespace: Option<String>,

    /// Delay before a completed pass runs again
    pub requeue_interval: Duration,

    /// Delay before a failed pass is retried
    pub error_requeue_interval: Duration,

    /// Trailing window of logs read per container
    pub log_window: Duration,

    /// Bytes read from a log stream at a time
    pub log_chunk_size: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            requeue_interval: DEFAULT_REQUEUE_INTERVAL,
            error_requeue_interval: DEFAULT_ERROR_REQUEUE_INTERVAL,
            log_window: DEFAULT_LOG_WINDOW,
            log_chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.requeue_interval.is_zero() {
            return Err(OperatorError::Configuration(
                "requeue interval must be greater than zero".to_string(),
            ));
        }
        if self.error_requeue_interval.is_zero() {
            return Err(OperatorError::Configuration(
                "error requeue interval must be greater than zero".to_string(),
            ));
        }
        if self.log_window < Duration::from_secs(1) {
            return Err(OperatorError::Configuration(
                "log window must be at least one second".to_string(),
            ));
        }
        if self.log_chunk_size == 0 {
            return Err(OperatorError::Configuration(
                "log chunk size must be greater than zero".to_string(),
            ));
        }
        if self.namespace.as_deref() == Some("") {
            return Err(OperatorError::Configuration(
                "namespace must not be empty; use None to watch all namespaces".to_string(),
            ));
        }
        Ok(())
    }
}
