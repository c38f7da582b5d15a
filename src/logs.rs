//! Container log scanning
//!
//! Logs are read in bounded chunks and every chunk is checked against the
//! policy's patterns, so a long stream never has to be held in memory and
//! scanning stops at the first hit. A pattern straddling two chunks can be
//! missed.

use crate::decision::Decision;
use crate::error::{OperatorError, Result};
use crate::pattern::PatternSet;
use crate::store::PodSnapshot;
use futures::io::{AsyncRead, AsyncReadExt};
use k8s_openapi::api::core::v1::Pod;
use kube::api::LogParams;
use kube::core::Request;
use kube::{Client, Resource};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_LOG_WINDOW: Duration = Duration::from_secs(300);
pub const DEFAULT_CHUNK_SIZE: usize = 2048;

/// A readable stream of raw log bytes.
pub type LogStream<'a> = Pin<Box<dyn AsyncRead + Send + 'a>>;

/// Source of recent container logs.
#[async_trait::async_trait]
pub trait LogBackend: Send + Sync {
    /// Open the logs `container` of `pod` wrote during the trailing `window`.
    async fn open<'a>(
        &'a self,
        pod: &PodSnapshot,
        container: &str,
        window: Duration,
    ) -> Result<LogStream<'a>>;
}

/// [`LogBackend`] reading the pod `log` sub-resource.
#[derive(Clone)]
pub struct KubeLogBackend {
    client: Client,
}

impl KubeLogBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl LogBackend for KubeLogBackend {
    async fn open<'a>(
        &'a self,
        pod: &PodSnapshot,
        container: &str,
        window: Duration,
    ) -> Result<LogStream<'a>> {
        let params = LogParams {
            container: Some(container.to_string()),
            since_seconds: Some(window.as_secs().max(1) as i64),
            ..Default::default()
        };
        let mut request = Request::new(Pod::url_path(&(), Some(pod.namespace.as_str())))
            .logs(&pod.name, &params)
            .map_err(|e| OperatorError::LogStream(e.to_string()))?;
        request.extensions_mut().insert("log_stream");

        let stream = self
            .client
            .request_stream(request)
            .await
            .map_err(|e| OperatorError::LogStream(e.to_string()))?;
        Ok(Box::pin(stream))
    }
}

/// Scans a pod's containers for the first configured error pattern.
#[derive(Clone)]
pub struct LogScanner {
    backend: Arc<dyn LogBackend>,
    window: Duration,
    chunk_size: usize,
}

impl LogScanner {
    pub fn new(backend: Arc<dyn LogBackend>, window: Duration, chunk_size: usize) -> Self {
        Self {
            backend,
            window,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Scan containers in declared order, stopping at the first match.
    ///
    /// Containers whose logs cannot be opened are skipped. End of stream
    /// finishes a container normally; a read fault is logged and the scan
    /// moves on to the next container.
    pub async fn scan(&self, pod: &PodSnapshot, patterns: &PatternSet) -> Decision {
        if patterns.is_empty() {
            return Decision::keep();
        }

        let mut buf = vec![0u8; self.chunk_size];
        for container in &pod.containers {
            let mut stream = match self.backend.open(pod, container, self.window).await {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(
                        pod = %pod.name,
                        container = %container,
                        error = %e,
                        "Failed to get pod logs",
                    );
                    continue;
                }
            };

            loop {
                let n = match stream.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) => {
                        warn!(
                            pod = %pod.name,
                            container = %container,
                            error = %e,
                            "Log stream read failed",
                        );
                        break;
                    }
                };

                let chunk = String::from_utf8_lossy(&buf[..n]);
                if let Some(pattern) = patterns.first_match(&chunk) {
                    debug!(pod = %pod.name, container = %container, pattern = %pattern, "Error pattern matched");
                    return Decision::restart(format!("Found error pattern '{}' in logs", pattern));
                }
            }
        }

        Decision::keep()
    }
}
