//! RestartPolicy Controller
//!
//! Reconciles RestartPolicy custom resources: finds the running pods a
//! policy selects, deletes the ones showing failure so their owners
//! recreate them, and records each restart in the policy status.

use crate::config::ControllerConfig;
use crate::controllers::requeue_after_error;
use crate::crd::RestartPolicy;
use crate::decision::RestartDecider;
use crate::error::{OperatorError, Result};
use crate::logs::{KubeLogBackend, LogScanner};
use crate::metrics::{MetricEvaluator, MetricsSource};
use crate::selector;
use crate::store::{KubeStore, ResourceStore};
use crate::throttle;
use chrono::Utc;
use futures::StreamExt;
use kube::api::Api;
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher::Config;
use kube::{Client, ResourceExt};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How a reconciliation pass ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// The policy no longer exists; nothing to do and nothing to requeue
    PolicyGone,
    /// The pass ran to completion
    Completed {
        restarted: Vec<String>,
        requeue_after: Duration,
    },
    /// The pass was abandoned because the controller is shutting down
    Cancelled,
}

impl PassOutcome {
    pub fn into_action(self) -> Action {
        match self {
            PassOutcome::Completed { requeue_after, .. } => Action::requeue(requeue_after),
            PassOutcome::PolicyGone | PassOutcome::Cancelled => Action::await_change(),
        }
    }
}

/// One reconciliation pass over a single policy.
pub struct PolicyReconciler {
    store: Arc<dyn ResourceStore>,
    decider: RestartDecider,
    requeue_interval: Duration,
}

impl PolicyReconciler {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        decider: RestartDecider,
        requeue_interval: Duration,
    ) -> Self {
        Self {
            store,
            decider,
            requeue_interval,
        }
    }

    /// Run one pass for the policy `namespace/name`.
    ///
    /// Only an invalid selector or throttle interval and failures to read
    /// the policy or list its pods fail the pass. Per-pod failures are
    /// logged and the pass moves on.
    pub async fn reconcile(&self, namespace: &str, name: &str) -> Result<PassOutcome> {
        info!("Reconciling RestartPolicy {}/{}", namespace, name);

        let policy = match self.store.get_policy(namespace, name).await? {
            Some(policy) => policy,
            None => {
                info!("RestartPolicy {}/{} not found, assuming deleted", namespace, name);
                return Ok(PassOutcome::PolicyGone);
            }
        };

        let min_interval = policy.spec.min_restart_interval().inspect_err(|e| {
            error!(policy = %name, error = %e, "Invalid minTimeBetweenRestarts");
        })?;

        let query = selector::label_query(&policy.spec.pod_selector).inspect_err(|e| {
            error!(policy = %name, error = %e, "Invalid label selector");
        })?;

        let pods = self.store.list_pods(namespace, &query).await.inspect_err(|e| {
            error!(policy = %name, error = %e, "Failed to list pods");
        })?;

        let mut status = policy.status.clone().unwrap_or_default();
        let mut restarted = Vec::new();

        for pod in pods.iter().filter(|p| p.is_running()) {
            let decision = self.decider.decide(pod, &policy.spec).await;
            if !decision.should_restart {
                debug!(pod = %pod.name, "No restart needed");
                continue;
            }

            let now = Utc::now();
            if !throttle::permits(status.last_restart_time, min_interval, now) {
                info!(
                    pod = %pod.name,
                    remaining = ?throttle::remaining(status.last_restart_time, min_interval, now),
                    minimum = ?min_interval,
                    "Skipping restart due to minimum time between restarts not elapsed",
                );
                continue;
            }

            info!(pod = %pod.name, reason = %decision.reason, "Restarting pod due to error condition");

            match self.store.delete_pod(namespace, &pod.name).await {
                Ok(()) => {}
                Err(OperatorError::NotFound(_)) => {
                    info!(pod = %pod.name, "Pod already gone, skipping restart");
                    continue;
                }
                Err(e) => {
                    error!(pod = %pod.name, error = %e, "Failed to delete pod for restart");
                    continue;
                }
            }

            status.record_restart(&pod.name, &decision.reason, now);
            restarted.push(pod.name.clone());

            if let Err(e) = self.store.patch_policy_status(namespace, name, &status).await {
                error!(policy = %name, error = %e, "Failed to update RestartPolicy status");
            }
        }

        if !restarted.is_empty() {
            info!(
                "RestartPolicy {}/{} restarted {} pod(s): {}",
                namespace,
                name,
                restarted.len(),
                restarted.join(", ")
            );
        }

        Ok(PassOutcome::Completed {
            restarted,
            requeue_after: self.requeue_interval,
        })
    }

    /// Run one pass, abandoning it as soon as `cancel` fires.
    ///
    /// Deletions and status patches already made stay in place; pods not
    /// reached yet are picked up by a later pass.
    pub async fn reconcile_until_cancelled(
        &self,
        namespace: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<PassOutcome> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Reconciliation of RestartPolicy {}/{} cancelled", namespace, name);
                Ok(PassOutcome::Cancelled)
            }
            outcome = self.reconcile(namespace, name) => outcome,
        }
    }
}

/// Watches RestartPolicy resources and runs a pass for each.
pub struct RestartPolicyController {
    client: Client,
    reconciler: PolicyReconciler,
    config: ControllerConfig,
    shutdown: CancellationToken,
}

impl RestartPolicyController {
    /// Create a new restart policy controller
    pub fn new(
        client: Client,
        metrics: Option<Arc<dyn MetricsSource>>,
        config: ControllerConfig,
    ) -> Result<Self> {
        config.validate()?;

        let scanner = LogScanner::new(
            Arc::new(KubeLogBackend::new(client.clone())),
            config.log_window,
            config.log_chunk_size,
        );
        let decider = RestartDecider::new(scanner, MetricEvaluator::new(metrics));
        let reconciler = PolicyReconciler::new(
            Arc::new(KubeStore::new(client.clone())),
            decider,
            config.requeue_interval,
        );

        Ok(Self {
            client,
            reconciler,
            config,
            shutdown: CancellationToken::new(),
        })
    }

    /// Token that stops the controller and abandons in-flight passes.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the restart policy controller
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let policies: Api<RestartPolicy> = match &self.config.namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        };

        info!("Starting RestartPolicy controller");

        Controller::new(policies, Config::default())
            .graceful_shutdown_on(self.shutdown.clone().cancelled_owned())
            .run(
                |policy, ctx| async move { ctx.reconcile(policy).await },
                |policy, error, ctx| {
                    error!("Reconciliation error: {:?}", error);
                    ctx.error_policy(policy, error)
                },
                Arc::clone(&self),
            )
            .for_each(|result| async move {
                match result {
                    Ok((obj, _action)) => {
                        debug!("Reconciled restart policy: {}", obj.name);
                    }
                    Err(e) => {
                        error!("Reconciliation failed: {:?}", e);
                    }
                }
            })
            .await;

        info!("RestartPolicy controller stopped");
        Ok(())
    }

    async fn reconcile(
        &self,
        policy: Arc<RestartPolicy>,
    ) -> std::result::Result<Action, OperatorError> {
        let name = policy.name_any();
        let namespace = policy.namespace().unwrap_or_else(|| "default".to_string());

        let outcome = self
            .reconciler
            .reconcile_until_cancelled(&namespace, &name, &self.shutdown)
            .await?;
        Ok(outcome.into_action())
    }

    fn error_policy(&self, policy: Arc<RestartPolicy>, error: &OperatorError) -> Action {
        warn!(
            policy = %policy.name_any(),
            configuration = error.is_configuration(),
            "Requeueing RestartPolicy after failed pass",
        );
        requeue_after_error(error, &self.config)
    }
}
