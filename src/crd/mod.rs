//! Custom Resource Definitions for the pod restart operator
//!
//! - RestartPolicy: which pods to watch, what failure looks like, and how
//!   often a restart may happen

mod restart_policy;

pub use restart_policy::{
    MetricCondition, PolicyCondition, RestartPolicy, RestartPolicySpec, RestartPolicyStatus,
};
