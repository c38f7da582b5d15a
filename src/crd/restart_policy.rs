//! RestartPolicy Custom Resource Definition
//!
//! Declares which pods to watch and which log patterns or metric
//! conditions should get a pod deleted so its owner recreates it.

use crate::conditions::{
    build_condition, ConditionSet, CONDITION_TRUE, POLICY_CONDITION_POD_RESTARTED,
    REASON_ERROR_DETECTED,
};
use crate::duration::parse_duration;
use crate::error::Result;
use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// RestartPolicy is the Schema for the restartpolicies API
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "podrestart.io",
    version = "v1alpha1",
    kind = "RestartPolicy",
    namespaced,
    status = "RestartPolicyStatus",
    shortname = "rp",
    plural = "restartpolicies",
    printcolumn = r#"{"name":"RestartCount","type":"integer","jsonPath":".status.restartCount"}"#,
    printcolumn = r#"{"name":"LastRestart","type":"date","jsonPath":".status.lastRestartTime"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RestartPolicySpec {
    /// Label selector for the pods this policy watches
    pub pod_selector: LabelSelector,

    /// Regular expressions searched for in recent container logs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error_patterns: Vec<String>,

    /// Metric thresholds that trigger a restart
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metric_conditions: Vec<MetricCondition>,

    /// Minimum time between two restarts under this policy (e.g. "5m")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_time_between_restarts: Option<String>,
}

/// A metric-based restart condition
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MetricCondition {
    /// Name of the metric
    pub name: String,

    /// Threshold, parsed as the same type as the metric value
    pub threshold: String,

    /// Comparison operator (>, <, >=, <=, ==)
    pub operator: String,
}

/// Status of the RestartPolicy
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RestartPolicyStatus {
    /// Last time a pod was restarted under this policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_restart_time: Option<DateTime<Utc>>,

    /// Number of restarts performed
    #[serde(default)]
    pub restart_count: i64,

    /// Conditions representing the latest observations, unique by type
    #[serde(default)]
    pub conditions: Vec<PolicyCondition>,
}

/// Condition of the restart policy
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PolicyCondition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    /// Last time the condition transitioned
    #[serde(default)]
    pub last_transition_time: Option<DateTime<Utc>>,
    /// Reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Human-readable message
    #[serde(default)]
    pub message: Option<String>,
}

impl RestartPolicySpec {
    /// Parsed `minTimeBetweenRestarts`, `None` when unset.
    pub fn min_restart_interval(&self) -> Result<Option<Duration>> {
        self.min_time_between_restarts
            .as_deref()
            .map(parse_duration)
            .transpose()
    }
}

impl RestartPolicyStatus {
    /// Record one pod deletion: bump the counter, stamp the time and
    /// upsert the `PodRestarted` condition.
    pub fn record_restart(&mut self, pod_name: &str, reason: &str, now: DateTime<Utc>) {
        self.last_restart_time = Some(now);
        self.restart_count = self.restart_count.saturating_add(1);

        let mut conditions = ConditionSet::from_list(std::mem::take(&mut self.conditions));
        conditions.upsert(build_condition(
            POLICY_CONDITION_POD_RESTARTED,
            CONDITION_TRUE,
            REASON_ERROR_DETECTED,
            &format!("Pod {} restarted due to: {}", pod_name, reason),
            now,
        ));
        self.conditions = conditions.into_list();
    }
}
