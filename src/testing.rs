//! In-memory collaborators for unit tests

use crate::crd::{RestartPolicy, RestartPolicySpec, RestartPolicyStatus};
use crate::error::{OperatorError, Result};
use crate::logs::{LogBackend, LogStream};
use crate::metrics::{MetricValue, MetricsSource};
use crate::store::{PodSnapshot, ResourceStore};
use futures::TryStreamExt;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

pub fn running_pod(name: &str, containers: &[&str]) -> PodSnapshot {
    pod_in_phase(name, "Running", containers)
}

pub fn pod_in_phase(name: &str, phase: &str, containers: &[&str]) -> PodSnapshot {
    PodSnapshot {
        name: name.to_string(),
        namespace: "apps".to_string(),
        phase: Some(phase.to_string()),
        containers: containers.iter().map(|c| c.to_string()).collect(),
    }
}

pub fn spec(patterns: &[&str]) -> RestartPolicySpec {
    RestartPolicySpec {
        pod_selector: LabelSelector {
            match_labels: Some(BTreeMap::from([("app".to_string(), "web".to_string())])),
            ..Default::default()
        },
        error_patterns: patterns.iter().map(|p| p.to_string()).collect(),
        metric_conditions: Vec::new(),
        min_time_between_restarts: None,
    }
}

pub fn policy(name: &str, spec: RestartPolicySpec, status: Option<RestartPolicyStatus>) -> RestartPolicy {
    let mut policy = RestartPolicy::new(name, spec);
    policy.metadata.namespace = Some("apps".to_string());
    policy.status = status;
    policy
}

/// Log content served by [`FakeLogs`]
#[derive(Debug, Clone)]
pub enum FakeLog {
    Text(String),
    /// Opening the stream fails, like a container that has not started
    Unavailable,
    /// Yields the text, then a read error instead of end of stream
    FaultAfter(String),
}

#[derive(Default)]
pub struct FakeLogs {
    logs: HashMap<(String, String), FakeLog>,
    opened: Mutex<Vec<(String, String)>>,
    windows: Mutex<Vec<Duration>>,
}

impl FakeLogs {
    pub fn with(mut self, pod: &str, container: &str, log: FakeLog) -> Self {
        self.logs.insert((pod.to_string(), container.to_string()), log);
        self
    }

    pub fn opened(&self) -> Vec<(String, String)> {
        self.opened.lock().unwrap().clone()
    }

    pub fn windows(&self) -> Vec<Duration> {
        self.windows.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LogBackend for FakeLogs {
    async fn open<'a>(
        &'a self,
        pod: &PodSnapshot,
        container: &str,
        window: Duration,
    ) -> Result<LogStream<'a>> {
        let key = (pod.name.clone(), container.to_string());
        self.opened.lock().unwrap().push(key.clone());
        self.windows.lock().unwrap().push(window);

        match self.logs.get(&key) {
            Some(FakeLog::Text(text)) => {
                Ok(Box::pin(futures::io::Cursor::new(text.clone().into_bytes())))
            }
            Some(FakeLog::FaultAfter(text)) => {
                let items: Vec<std::io::Result<Vec<u8>>> = vec![
                    Ok(text.clone().into_bytes()),
                    Err(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        "connection reset",
                    )),
                ];
                Ok(Box::pin(futures::stream::iter(items).into_async_read()))
            }
            Some(FakeLog::Unavailable) | None => Err(OperatorError::LogStream(format!(
                "container {} is not available",
                container
            ))),
        }
    }
}

#[derive(Default)]
pub struct StaticMetrics {
    values: HashMap<String, MetricValue>,
}

impl StaticMetrics {
    pub fn with(mut self, name: &str, value: MetricValue) -> Self {
        self.values.insert(name.to_string(), value);
        self
    }
}

#[async_trait::async_trait]
impl MetricsSource for StaticMetrics {
    async fn current_value(&self, _pod: &PodSnapshot, metric: &str) -> Result<MetricValue> {
        self.values
            .get(metric)
            .copied()
            .ok_or_else(|| OperatorError::MetricUnavailable(metric.to_string()))
    }
}

/// Every call a [`FakeStore`] received, in order
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    GetPolicy(String),
    ListPods(String),
    DeletePod(String),
    PatchStatus(RestartPolicyStatus),
}

#[derive(Default)]
pub struct FakeStore {
    policies: Mutex<HashMap<String, RestartPolicy>>,
    pods: Vec<PodSnapshot>,
    failing_deletes: HashSet<String>,
    fail_patches: bool,
    fail_list: bool,
    list_delay: Option<Duration>,
    delete_delays: HashMap<String, Duration>,
    calls: Mutex<Vec<StoreCall>>,
}

impl FakeStore {
    pub fn with_policy(self, policy: RestartPolicy) -> Self {
        let name = policy.metadata.name.clone().unwrap_or_default();
        self.policies.lock().unwrap().insert(name, policy);
        self
    }

    pub fn with_pod(mut self, pod: PodSnapshot) -> Self {
        self.pods.push(pod);
        self
    }

    pub fn failing_delete(mut self, pod: &str) -> Self {
        self.failing_deletes.insert(pod.to_string());
        self
    }

    pub fn failing_patches(mut self) -> Self {
        self.fail_patches = true;
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn slow_list(mut self, delay: Duration) -> Self {
        self.list_delay = Some(delay);
        self
    }

    /// Delay deleting `pod`, leaving the pass suspended mid-way.
    pub fn slow_delete(mut self, pod: &str, delay: Duration) -> Self {
        self.delete_delays.insert(pod.to_string(), delay);
        self
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                StoreCall::DeletePod(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn patches(&self) -> Vec<RestartPolicyStatus> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                StoreCall::PatchStatus(status) => Some(status),
                _ => None,
            })
            .collect()
    }

    pub fn stored_status(&self, name: &str) -> Option<RestartPolicyStatus> {
        self.policies
            .lock()
            .unwrap()
            .get(name)
            .and_then(|p| p.status.clone())
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl ResourceStore for FakeStore {
    async fn get_policy(&self, _namespace: &str, name: &str) -> Result<Option<RestartPolicy>> {
        self.record(StoreCall::GetPolicy(name.to_string()));
        Ok(self.policies.lock().unwrap().get(name).cloned())
    }

    async fn list_pods(&self, namespace: &str, label_query: &str) -> Result<Vec<PodSnapshot>> {
        self.record(StoreCall::ListPods(label_query.to_string()));
        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_list {
            return Err(OperatorError::KubeApi("connection refused".to_string()));
        }
        Ok(self
            .pods
            .iter()
            .filter(|p| p.namespace == namespace)
            .cloned()
            .collect())
    }

    async fn delete_pod(&self, _namespace: &str, name: &str) -> Result<()> {
        if let Some(delay) = self.delete_delays.get(name) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing_deletes.contains(name) {
            return Err(OperatorError::KubeApi(format!("cannot delete {}", name)));
        }
        self.record(StoreCall::DeletePod(name.to_string()));
        Ok(())
    }

    async fn patch_policy_status(
        &self,
        _namespace: &str,
        name: &str,
        status: &RestartPolicyStatus,
    ) -> Result<()> {
        if self.fail_patches {
            return Err(OperatorError::KubeApi("conflict".to_string()));
        }
        self.record(StoreCall::PatchStatus(status.clone()));
        if let Some(policy) = self.policies.lock().unwrap().get_mut(name) {
            policy.status = Some(status.clone());
        }
        Ok(())
    }
}
