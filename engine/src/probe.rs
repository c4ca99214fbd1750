//! Probe executor — one outbound GET per service, outcome as data.
//!
//! A probe never fails: connection errors, timeouts, DNS failures and
//! unreadable bodies all become an outcome with `succeeded = false` and no
//! status, so one broken endpoint cannot abort a batch.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::classifier::Classifier;
use crate::config::EngineConfig;
use crate::error::ConfigError;
use crate::registry::ServiceDefinition;

// ── Outcome ─────────────────────────────────────────────────────────

/// Result of probing one service with one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub service_id: String,
    pub display_name: String,
    pub succeeded: bool,
    /// Absent when the request never produced a response.
    pub http_status: Option<u16>,
    /// Raw response body, or a description of the transport failure.
    pub body_or_error: String,
    pub latency_ms: u64,
}

impl ProbeOutcome {
    pub fn responded(
        service: &ServiceDefinition,
        succeeded: bool,
        http_status: u16,
        body: String,
        latency_ms: u64,
    ) -> Self {
        Self {
            service_id: service.id.to_string(),
            display_name: service.display_name.to_string(),
            succeeded,
            http_status: Some(http_status),
            body_or_error: body,
            latency_ms,
        }
    }

    pub fn transport_failure(
        service: &ServiceDefinition,
        description: impl std::fmt::Display,
        latency_ms: u64,
    ) -> Self {
        Self {
            service_id: service.id.to_string(),
            display_name: service.display_name.to_string(),
            succeeded: false,
            http_status: None,
            body_or_error: format!("request exception: {description}"),
            latency_ms,
        }
    }
}

// ── Prober Trait ────────────────────────────────────────────────────

/// Sends a probe for one service and classifies the answer.
///
/// Implementations must convert every failure into an outcome; the
/// validator relies on `probe` being infallible.
#[async_trait]
pub trait KeyProber: Send + Sync {
    async fn probe(&self, service: &ServiceDefinition, api_key: &str) -> ProbeOutcome;
}

// ── HTTP Prober ─────────────────────────────────────────────────────

pub struct HttpProber {
    client: reqwest::Client,
    classifier: Arc<Classifier>,
}

impl HttpProber {
    pub fn new(classifier: Arc<Classifier>, timeout: Duration) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, classifier })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        Self::new(Arc::new(config.classifier()), config.timeout())
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    async fn fetch(&self, url: &str) -> Result<(u16, String), reqwest::Error> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok((status, body))
    }
}

/// Flatten a reqwest error and its source chain into one line, without the URL.
fn describe_failure(err: reqwest::Error) -> String {
    // The URL carries the key.
    let err = err.without_url();
    let mut description = err.to_string();
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        let text = cause.to_string();
        if !description.ends_with(&text) {
            description.push_str(": ");
            description.push_str(&text);
        }
        source = cause.source();
    }
    description
}

#[async_trait]
impl KeyProber for HttpProber {
    async fn probe(&self, service: &ServiceDefinition, api_key: &str) -> ProbeOutcome {
        let url = service.probe_url(api_key);
        debug!(service = %service.id, key_len = api_key.len(), "Sending probe");

        let start = Instant::now();
        let result = self.fetch(&url).await;
        let latency = start.elapsed().as_millis() as u64;

        match result {
            Ok((status, body)) => {
                let succeeded = self.classifier.classify(status, &body);
                if succeeded {
                    info!(service = %service.id, status, latency_ms = latency, "Key accepted");
                } else {
                    info!(
                        service = %service.id,
                        status,
                        marker = self.classifier.matched_marker(&body).unwrap_or("-"),
                        latency_ms = latency,
                        "Key rejected"
                    );
                }
                ProbeOutcome::responded(service, succeeded, status, body, latency)
            }
            Err(e) => {
                let description = describe_failure(e);
                warn!(service = %service.id, latency_ms = latency, "Probe request failed: {}", description);
                ProbeOutcome::transport_failure(service, description, latency)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ServiceRegistry;

    #[test]
    fn test_transport_failure_shape() {
        let registry = ServiceRegistry::builtin();
        let svc = registry.resolve("amap-jsapi").unwrap();
        let outcome = ProbeOutcome::transport_failure(svc, "connection refused", 3);
        assert!(!outcome.succeeded);
        assert_eq!(outcome.http_status, None);
        assert_eq!(outcome.body_or_error, "request exception: connection refused");
        assert_eq!(outcome.service_id, "amap-jsapi");
        assert_eq!(outcome.display_name, "高德jsapi");
    }

    #[tokio::test]
    async fn test_unreachable_host_becomes_failed_outcome() {
        // Port 9 on loopback: nothing listens, the connect is refused.
        let registry = ServiceRegistry::builtin().rebased("http://127.0.0.1:9");
        let svc = registry.resolve("baidu-webapi").unwrap();
        let prober = HttpProber::new(Arc::new(Classifier::default()), Duration::from_secs(2)).unwrap();

        let outcome = prober.probe(svc, "SECRET-KEY").await;
        assert!(!outcome.succeeded);
        assert!(outcome.http_status.is_none());
        assert!(outcome.body_or_error.starts_with("request exception: "));
        assert!(!outcome.body_or_error.contains("SECRET-KEY"));
        let cause = outcome
            .body_or_error
            .trim_start_matches("request exception: ")
            .trim_start_matches("error sending request");
        assert!(cause.starts_with(": "), "no cause in {:?}", outcome.body_or_error);
    }
}
