//! Error types for the pod restart operator

use std::fmt;

/// Result type alias for operator operations
pub type Result<T> = std::result::Result<T, OperatorError>;

/// Errors that can occur while reconciling restart policies
#[derive(Debug)]
pub enum OperatorError {
    /// Kubernetes API error
    KubeApi(String),
    /// Configuration error (bad duration, bad controller flags)
    Configuration(String),
    /// An error pattern that is not a valid regular expression
    InvalidPattern { pattern: String, message: String },
    /// A pod selector that cannot be turned into a label query
    InvalidSelector(String),
    /// Log stream could not be opened or read
    LogStream(String),
    /// Metric could not be resolved by the metrics source
    MetricUnavailable(String),
    /// Resource not found
    NotFound(String),
}

impl OperatorError {
    /// Whether the error comes from the policy itself rather than the cluster.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            OperatorError::Configuration(_) | OperatorError::InvalidSelector(_)
        )
    }
}

impl fmt::Display for OperatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorError::KubeApi(msg) => write!(f, "Kubernetes API error: {}", msg),
            OperatorError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            OperatorError::InvalidPattern { pattern, message } => {
                write!(f, "Invalid error pattern '{}': {}", pattern, message)
            }
            OperatorError::InvalidSelector(msg) => write!(f, "Invalid pod selector: {}", msg),
            OperatorError::LogStream(msg) => write!(f, "Log stream error: {}", msg),
            OperatorError::MetricUnavailable(msg) => write!(f, "Metric unavailable: {}", msg),
            OperatorError::NotFound(msg) => write!(f, "Resource not found: {}", msg),
        }
    }
}

impl std::error::Error for OperatorError {}

impl From<kube::Error> for OperatorError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == 404 => OperatorError::NotFound(ae.message),
            other => OperatorError::KubeApi(other.to_string()),
        }
    }
}
