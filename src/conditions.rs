//! Kubernetes-standard status condition helpers
//!
//! Conditions are unique by type. Internally they are handled as a keyed
//! set so every condition type upserts the same way; on the wire they are
//! the ordered list Kubernetes clients expect.

use crate::crd::PolicyCondition;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

// Condition status values
pub const CONDITION_TRUE: &str = "True";

// RestartPolicy condition types
pub const POLICY_CONDITION_POD_RESTARTED: &str = "PodRestarted";

// RestartPolicy condition reasons
pub const REASON_ERROR_DETECTED: &str = "ErrorDetected";

/// Build a condition stamped with `now` as its transition time.
pub fn build_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
    now: DateTime<Utc>,
) -> PolicyCondition {
    PolicyCondition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        last_transition_time: Some(now),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
    }
}

/// Conditions keyed by type, remembering the order types were first seen.
#[derive(Debug, Clone, Default)]
pub struct ConditionSet {
    order: Vec<String>,
    by_type: HashMap<String, PolicyCondition>,
}

impl ConditionSet {
    /// Build a set from a wire list. Later duplicates of a type win but
    /// keep the position of the first occurrence.
    pub fn from_list(conditions: Vec<PolicyCondition>) -> Self {
        let mut set = Self::default();
        for condition in conditions {
            set.upsert(condition);
        }
        set
    }

    /// Insert a condition, replacing any existing entry of the same type in place.
    pub fn upsert(&mut self, condition: PolicyCondition) {
        if !self.by_type.contains_key(&condition.r#type) {
            self.order.push(condition.r#type.clone());
        }
        self.by_type.insert(condition.r#type.clone(), condition);
    }

    /// Serialize back to the ordered wire list.
    pub fn into_list(mut self) -> Vec<PolicyCondition> {
        self.order
            .iter()
            .filter_map(|t| self.by_type.remove(t))
            .collect()
    }
}
