//! Metric threshold evaluation
//!
//! Metric checks degrade gracefully: a missing metrics source, a metric
//! that cannot be resolved, or a malformed condition only disables that
//! condition and never blocks log-based restarts.

use crate::crd::MetricCondition;
use crate::decision::Decision;
use crate::duration::parse_duration;
use crate::error::{OperatorError, Result};
use crate::store::PodSnapshot;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A current metric reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Scalar(f64),
    Duration(Duration),
}

impl MetricValue {
    /// Parse `threshold` as the same kind of value as `self`.
    fn parse_threshold(&self, threshold: &str) -> Result<MetricValue> {
        match self {
            MetricValue::Scalar(_) => threshold
                .trim()
                .parse::<f64>()
                .map(MetricValue::Scalar)
                .map_err(|e| {
                    OperatorError::Configuration(format!(
                        "invalid numeric threshold '{}': {}",
                        threshold, e
                    ))
                }),
            MetricValue::Duration(_) => parse_duration(threshold).map(MetricValue::Duration),
        }
    }

    fn partial_cmp_with(&self, other: &MetricValue) -> Option<Ordering> {
        match (self, other) {
            (MetricValue::Scalar(a), MetricValue::Scalar(b)) => a.partial_cmp(b),
            (MetricValue::Duration(a), MetricValue::Duration(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Scalar(v) => write!(f, "{}", v),
            MetricValue::Duration(d) => write!(f, "{:?}", d),
        }
    }
}

/// Comparison operator of a metric condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    Equal,
}

impl ComparisonOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOperator::GreaterThan => ">",
            ComparisonOperator::LessThan => "<",
            ComparisonOperator::GreaterOrEqual => ">=",
            ComparisonOperator::LessOrEqual => "<=",
            ComparisonOperator::Equal => "==",
        }
    }

    /// Apply the operator to `value` and `threshold`. Incomparable values never satisfy it.
    pub fn holds(&self, value: &MetricValue, threshold: &MetricValue) -> bool {
        let Some(ord) = value.partial_cmp_with(threshold) else {
            return false;
        };
        match self {
            ComparisonOperator::GreaterThan => ord == Ordering::Greater,
            ComparisonOperator::LessThan => ord == Ordering::Less,
            ComparisonOperator::GreaterOrEqual => ord != Ordering::Less,
            ComparisonOperator::LessOrEqual => ord != Ordering::Greater,
            ComparisonOperator::Equal => ord == Ordering::Equal,
        }
    }
}

impl FromStr for ComparisonOperator {
    type Err = OperatorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            ">" => Ok(ComparisonOperator::GreaterThan),
            "<" => Ok(ComparisonOperator::LessThan),
            ">=" => Ok(ComparisonOperator::GreaterOrEqual),
            "<=" => Ok(ComparisonOperator::LessOrEqual),
            "==" => Ok(ComparisonOperator::Equal),
            other => Err(OperatorError::Configuration(format!(
                "unknown comparison operator '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of current metric values.
///
/// No backend ships with the operator; deployments that have one plug it
/// in here. `OperatorError::MetricUnavailable` reports a metric that
/// cannot be resolved.
#[async_trait::async_trait]
pub trait MetricsSource: Send + Sync {
    async fn current_value(&self, pod: &PodSnapshot, metric: &str) -> Result<MetricValue>;
}

/// Evaluates metric conditions against an optional [`MetricsSource`].
#[derive(Clone, Default)]
pub struct MetricEvaluator {
    source: Option<Arc<dyn MetricsSource>>,
}

impl MetricEvaluator {
    pub fn new(source: Option<Arc<dyn MetricsSource>>) -> Self {
        Self { source }
    }

    /// Return a restart verdict for the first satisfied condition.
    pub async fn evaluate(&self, pod: &PodSnapshot, conditions: &[MetricCondition]) -> Decision {
        let Some(source) = &self.source else {
            debug!(
                pod = %pod.name,
                conditions = conditions.len(),
                "No metrics source configured, skipping metric conditions",
            );
            return Decision::keep();
        };

        for condition in conditions {
            match check(source.as_ref(), pod, condition).await {
                Ok(Some(reason)) => return Decision::restart(reason),
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        pod = %pod.name,
                        metric = %condition.name,
                        error = %e,
                        "Skipping metric condition",
                    );
                }
            }
        }

        Decision::keep()
    }
}

async fn check(
    source: &dyn MetricsSource,
    pod: &PodSnapshot,
    condition: &MetricCondition,
) -> Result<Option<String>> {
    let operator: ComparisonOperator = condition.operator.parse()?;
    let value = source.current_value(pod, &condition.name).await?;
    let threshold = value.parse_threshold(&condition.threshold)?;

    if operator.holds(&value, &threshold) {
        Ok(Some(format!(
            "Metric '{}' value {} {} threshold {}",
            condition.name, value, operator, condition.threshold
        )))
    } else {
        Ok(None)
    }
}
