//! Resource store
//!
//! Everything the reconciler reads from or writes to the cluster goes
//! through [`ResourceStore`], so passes can run against an in-memory store
//! in tests and against the API server in production.

use crate::crd::{RestartPolicy, RestartPolicyStatus};
use crate::error::Result;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams};
use kube::{Client, ResourceExt};
use tracing::debug;

pub const POD_PHASE_RUNNING: &str = "Running";

/// Read-only view of a pod taken at the start of a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodSnapshot {
    pub name: String,
    pub namespace: String,
    pub phase: Option<String>,
    /// Container names in declared order
    pub containers: Vec<String>,
}

impl PodSnapshot {
    pub fn is_running(&self) -> bool {
        self.phase.as_deref() == Some(POD_PHASE_RUNNING)
    }
}

impl From<&Pod> for PodSnapshot {
    fn from(pod: &Pod) -> Self {
        Self {
            name: pod.name_any(),
            namespace: pod.namespace().unwrap_or_else(|| "default".to_string()),
            phase: pod.status.as_ref().and_then(|s| s.phase.clone()),
            containers: pod
                .spec
                .as_ref()
                .map(|spec| spec.containers.iter().map(|c| c.name.clone()).collect())
                .unwrap_or_default(),
        }
    }
}

/// Access to restart policies and the pods they target.
#[async_trait::async_trait]
pub trait ResourceStore: Send + Sync {
    /// Fetch a policy, `None` if it no longer exists.
    async fn get_policy(&self, namespace: &str, name: &str) -> Result<Option<RestartPolicy>>;

    /// List pods in `namespace` matching a label query.
    async fn list_pods(&self, namespace: &str, label_query: &str) -> Result<Vec<PodSnapshot>>;

    /// Delete a pod so its owning workload recreates it.
    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<()>;

    /// Merge-patch the status sub-resource of a policy.
    async fn patch_policy_status(
        &self,
        namespace: &str,
        name: &str,
        status: &RestartPolicyStatus,
    ) -> Result<()>;
}

/// [`ResourceStore`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ResourceStore for KubeStore {
    async fn get_policy(&self, namespace: &str, name: &str) -> Result<Option<RestartPolicy>> {
        let policies: Api<RestartPolicy> = Api::namespaced(self.client.clone(), namespace);
        Ok(policies.get_opt(name).await?)
    }

    async fn list_pods(&self, namespace: &str, label_query: &str) -> Result<Vec<PodSnapshot>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let mut params = ListParams::default();
        if !label_query.is_empty() {
            params = params.labels(label_query);
        }
        let pod_list = pods.list(&params).await?;

        debug!(
            namespace = %namespace,
            selector = %label_query,
            count = pod_list.items.len(),
            "Listed pods",
        );
        Ok(pod_list.items.iter().map(PodSnapshot::from).collect())
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<()> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        pods.delete(name, &DeleteParams::default()).await?;
        Ok(())
    }

    async fn patch_policy_status(
        &self,
        namespace: &str,
        name: &str,
        status: &RestartPolicyStatus,
    ) -> Result<()> {
        let policies: Api<RestartPolicy> = Api::namespaced(self.client.clone(), namespace);
        let patch = serde_json::json!({ "status": status });
        policies
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}
