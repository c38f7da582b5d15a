//! Controllers for the pod restart operator
//!
//! The restart policy controller watches `RestartPolicy` resources and
//! restarts the pods they select when those pods show failure.

mod restart_policy;

pub use restart_policy::{PassOutcome, PolicyReconciler, RestartPolicyController};

use crate::config::ControllerConfig;
use crate::error::OperatorError;
use kube::runtime::controller::Action;

/// Requeue delay after a failed pass. Configuration errors wait a full
/// interval, everything else retries after the error interval.
pub(crate) fn requeue_after_error(error: &OperatorError, config: &ControllerConfig) -> Action {
    if error.is_configuration() {
        Action::requeue(config.requeue_interval)
    } else {
        Action::requeue(config.error_requeue_interval)
    }
}
