//! Pod Restart Operator
//!
//! This operator restarts pods selected by RestartPolicy resources when
//! their logs or metrics show failure.
//!
//! ## Usage
//!
//! ```bash
//! # Run the operator (requires kubeconfig)
//! pod-restart-operator
//!
//! # Watch a single namespace with debug logging
//! RUST_LOG=debug pod-restart-operator --namespace apps
//!
//! # Print the CRD manifest
//! pod-restart-operator --print-crd
//! ```

use clap::Parser;
use kube::{Client, CustomResourceExt};
use pod_restart_operator::duration::parse_duration;
use pod_restart_operator::{ControllerConfig, RestartPolicy, RestartPolicyController};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Pod Restart Operator
#[derive(Parser, Debug)]
#[command(name = "pod-restart-operator")]
#[command(version, about = "Kubernetes Operator that restarts failing pods")]
struct Args {
    /// Namespace to watch (empty for all namespaces)
    #[arg(long, default_value = "")]
    namespace: String,

    /// Delay between reconciliation passes of a policy
    #[arg(long, default_value = "30s", value_parser = parse_flag_duration)]
    requeue_interval: Duration,

    /// Delay before retrying a pass that failed
    #[arg(long, default_value = "5s", value_parser = parse_flag_duration)]
    error_requeue_interval: Duration,

    /// Trailing window of container logs scanned for error patterns
    #[arg(long, default_value = "5m", value_parser = parse_flag_duration)]
    log_window: Duration,

    /// Bytes read from a log stream at a time
    #[arg(long, default_value_t = 2048)]
    log_chunk_size: usize,

    /// Print the RestartPolicy CRD as JSON and exit
    #[arg(long, default_value = "false")]
    print_crd: bool,
}

fn parse_flag_duration(s: &str) -> Result<Duration, String> {
    parse_duration(s).map_err(|e| e.to_string())
}

impl Args {
    fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            namespace: (!self.namespace.is_empty()).then(|| self.namespace.clone()),
            requeue_interval: self.requeue_interval,
            error_requeue_interval: self.error_requeue_interval,
            log_window: self.log_window,
            log_chunk_size: self.log_chunk_size,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_crd {
        println!("{}", serde_json::to_string_pretty(&RestartPolicy::crd())?);
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting Pod Restart Operator");
    info!(
        "Watching namespace: {}",
        if args.namespace.is_empty() {
            "all"
        } else {
            &args.namespace
        }
    );

    let config = args.controller_config();

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes API server");

    // No metrics backend is bundled; metric conditions stay inert.
    let controller = Arc::new(RestartPolicyController::new(client, None, config)?);
    let shutdown = controller.shutdown_token();

    let mut handle = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            if let Err(e) = controller.run().await {
                error!("RestartPolicy controller error: {}", e);
            }
        })
    };

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            shutdown.cancel();
            if let Err(e) = (&mut handle).await {
                error!("RestartPolicy controller task failed: {}", e);
            }
        }
        result = &mut handle => {
            if let Err(e) = result {
                error!("RestartPolicy controller task failed: {}", e);
            }
        }
    }

    info!("Pod Restart Operator shutting down");
    Ok(())
}
