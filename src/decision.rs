//! Restart decisions
//!
//! Log patterns are checked before metrics and the first positive signal
//! wins, so a pod with a matching log line never touches the metrics
//! source.

use crate::crd::RestartPolicySpec;
use crate::logs::LogScanner;
use crate::metrics::MetricEvaluator;
use crate::pattern::PatternSet;
use crate::store::PodSnapshot;

/// Verdict for a single pod
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decision {
    pub should_restart: bool,
    pub reason: String,
}

impl Decision {
    /// Leave the pod alone.
    pub fn keep() -> Self {
        Self::default()
    }

    /// Restart the pod for `reason`.
    pub fn restart(reason: impl Into<String>) -> Self {
        Self {
            should_restart: true,
            reason: reason.into(),
        }
    }
}

/// Combines the log scanner and metric evaluator into one verdict.
#[derive(Clone)]
pub struct RestartDecider {
    scanner: LogScanner,
    metrics: MetricEvaluator,
}

impl RestartDecider {
    pub fn new(scanner: LogScanner, metrics: MetricEvaluator) -> Self {
        Self { scanner, metrics }
    }

    pub async fn decide(&self, pod: &PodSnapshot, spec: &RestartPolicySpec) -> Decision {
        if !spec.error_patterns.is_empty() {
            let patterns = PatternSet::compile(&spec.error_patterns);
            let verdict = self.scanner.scan(pod, &patterns).await;
            if verdict.should_restart {
                return verdict;
            }
        }

        if !spec.metric_conditions.is_empty() {
            let verdict = self.metrics.evaluate(pod, &spec.metric_conditions).await;
            if verdict.should_restart {
                return verdict;
            }
        }

        Decision::keep()
    }
}
