//! Pod Restart Operator
//!
//! A Kubernetes operator that restarts pods showing signs of failure.
//!
//! ## Custom Resources
//!
//! - `RestartPolicy`: Selects pods by label and describes the log patterns
//!   and metric thresholds that mark a pod as failed, plus a minimum time
//!   between restarts
//!
//! A pod is "restarted" by deleting it so its owning workload recreates it.
//!
//! ## Example
//!
//! ```yaml
//! apiVersion: podrestart.io/v1alpha1
//! kind: RestartPolicy
//! metadata:
//!   name: oom-restarts
//! spec:
//!   podSelector:
//!     matchLabels:
//!       app: web
//!   errorPatterns:
//!     - "OutOfMemoryError"
//!   minTimeBetweenRestarts: 5m
//! ```

pub mod conditions;
pub mod config;
pub mod controllers;
pub mod crd;
pub mod decision;
pub mod duration;
pub mod error;
pub mod logs;
pub mod metrics;
pub mod pattern;
pub mod selector;
pub mod store;
pub mod throttle;

#[cfg(test)]
mod testing;

pub use config::ControllerConfig;
pub use controllers::{PassOutcome, PolicyReconciler, RestartPolicyController};
pub use crd::{
    MetricCondition, PolicyCondition, RestartPolicy, RestartPolicySpec, RestartPolicyStatus,
};
pub use decision::{Decision, RestartDecider};
pub use error::{OperatorError, Result};
pub use logs::{KubeLogBackend, LogBackend, LogScanner};
pub use metrics::{MetricEvaluator, MetricValue, MetricsSource};
pub use store::{KubeStore, PodSnapshot, ResourceStore};
