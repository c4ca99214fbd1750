//! Validator — resolves requested services, runs the probes and collects
//! outcomes in request order.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::{EngineConfig, ProbeMode};
use crate::error::{ConfigError, ValidationError};
use crate::probe::{HttpProber, KeyProber, ProbeOutcome};
use crate::registry::{ServiceDefinition, ServiceRegistry};

/// A key plus the services to test it against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRequest {
    pub api_key: String,
    pub services: Vec<String>,
}

#[derive(Clone)]
pub struct Validator {
    registry: Arc<ServiceRegistry>,
    prober: Arc<dyn KeyProber>,
    mode: ProbeMode,
}

impl Validator {
    pub fn new(registry: Arc<ServiceRegistry>, prober: Arc<dyn KeyProber>, mode: ProbeMode) -> Self {
        Self { registry, prober, mode }
    }

    /// Validator over the HTTP prober, wired from config.
    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        let prober = HttpProber::from_config(config)?;
        Ok(Self::new(
            Arc::new(config.registry()),
            Arc::new(prober),
            config.mode,
        ))
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub async fn validate(&self, request: &ValidationRequest) -> Result<Vec<ProbeOutcome>, ValidationError> {
        self.run_validation(&request.api_key, &request.services).await
    }

    /// Probe `api_key` against each requested service.
    ///
    /// The key is sent exactly as given; only an empty key is refused.
    /// Unknown identifiers are dropped silently; duplicates are probed once
    /// per occurrence.
    pub async fn run_validation<S: AsRef<str>>(
        &self,
        api_key: &str,
        services: &[S],
    ) -> Result<Vec<ProbeOutcome>, ValidationError> {
        if api_key.is_empty() {
            return Err(ValidationError::MissingKey);
        }
        if services.is_empty() {
            return Err(ValidationError::NoServices);
        }

        let resolved: Vec<&ServiceDefinition> = services
            .iter()
            .filter_map(|id| {
                let id = id.as_ref();
                let svc = self.registry.resolve(id);
                if svc.is_none() {
                    debug!(service = id, "Unknown service — skipping");
                }
                svc
            })
            .collect();

        info!(
            requested = services.len(),
            resolved = resolved.len(),
            mode = ?self.mode,
            "Running key validation"
        );

        let outcomes = match self.mode {
            ProbeMode::Sequential => self.run_sequential(&resolved, api_key).await,
            ProbeMode::Concurrent => self.run_concurrent(&resolved, api_key).await,
        };

        let valid = outcomes.iter().filter(|o| o.succeeded).count();
        info!(
            total = outcomes.len(),
            valid = valid,
            invalid = outcomes.len() - valid,
            "Key validation complete"
        );

        Ok(outcomes)
    }

    async fn run_sequential(&self, services: &[&ServiceDefinition], api_key: &str) -> Vec<ProbeOutcome> {
        let mut outcomes = Vec::with_capacity(services.len());
        for svc in services {
            outcomes.push(self.prober.probe(svc, api_key).await);
        }
        outcomes
    }

    async fn run_concurrent(&self, services: &[&ServiceDefinition], api_key: &str) -> Vec<ProbeOutcome> {
        let mut handles = Vec::with_capacity(services.len());
        for svc in services {
            let prober = Arc::clone(&self.prober);
            let svc = (*svc).clone();
            let key = api_key.to_string();
            handles.push((
                svc.clone(),
                tokio::spawn(async move { prober.probe(&svc, &key).await }),
            ));
        }

        // Awaiting in spawn order keeps outcomes in request order.
        let mut outcomes = Vec::with_capacity(handles.len());
        for (svc, handle) in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    error!(service = %svc.id, "Probe task aborted: {}", e);
                    outcomes.push(ProbeOutcome::transport_failure(&svc, e, 0));
                }
            }
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Answers from a fixed table keyed by service id and records calls.
    struct ScriptedProber {
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedProber {
        fn new() -> Self {
            Self { calls: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl KeyProber for ScriptedProber {
        async fn probe(&self, service: &ServiceDefinition, api_key: &str) -> ProbeOutcome {
            self.calls.lock().unwrap().push(format!("{}:{}", service.id, api_key));
            // Later services answer sooner, to shake out ordering bugs.
            let delay = match service.id.as_ref() {
                "amap-webapi" => 30,
                "baidu-webapi" => 10,
                _ => 0,
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            match service.id.as_ref() {
                "amap-miniprogram" => panic!("scripted crash"),
                "tencent-webapi" => ProbeOutcome::transport_failure(service, "timed out", delay),
                "baidu-webapi" => ProbeOutcome::responded(service, false, 403, "forbidden".into(), delay),
                _ => ProbeOutcome::responded(service, true, 200, "{}".into(), delay),
            }
        }
    }

    fn validator(mode: ProbeMode) -> (Validator, Arc<ScriptedProber>) {
        let prober = Arc::new(ScriptedProber::new());
        let v = Validator::new(Arc::new(ServiceRegistry::builtin()), prober.clone(), mode);
        (v, prober)
    }

    fn ids(outcomes: &[ProbeOutcome]) -> Vec<&str> {
        outcomes.iter().map(|o| o.service_id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_empty_key_rejected_before_probing() {
        let (v, prober) = validator(ProbeMode::Sequential);
        assert_eq!(
            v.run_validation("", &["amap-webapi"]).await,
            Err(ValidationError::MissingKey)
        );
        assert!(prober.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_services_rejected() {
        let (v, prober) = validator(ProbeMode::Sequential);
        let none: [&str; 0] = [];
        assert_eq!(v.run_validation("ABC123", &none).await, Err(ValidationError::NoServices));
        assert!(prober.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_ids_are_dropped() {
        let (v, prober) = validator(ProbeMode::Sequential);
        let outcomes = v.run_validation("ABC123", &["unknown-id"]).await.unwrap();
        assert!(outcomes.is_empty());
        assert!(prober.calls.lock().unwrap().is_empty());

        let outcomes = v
            .run_validation("ABC123", &["nope", "amap-jsapi", "also-nope"])
            .await
            .unwrap();
        assert_eq!(ids(&outcomes), ["amap-jsapi"]);
    }

    #[tokio::test]
    async fn test_order_follows_request_in_both_modes() {
        let requested = ["tencent-webapi", "amap-webapi", "x", "baidu-webapi", "amap-jsapi"];
        for mode in [ProbeMode::Sequential, ProbeMode::Concurrent] {
            let (v, _) = validator(mode);
            let outcomes = v.run_validation("ABC123", &requested).await.unwrap();
            assert_eq!(
                ids(&outcomes),
                ["tencent-webapi", "amap-webapi", "baidu-webapi", "amap-jsapi"],
                "{mode:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_batch() {
        let (v, _) = validator(ProbeMode::Sequential);
        let outcomes = v
            .run_validation("ABC123", &["tencent-webapi", "baidu-webapi", "amap-webapi"])
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(!outcomes[0].succeeded);
        assert_eq!(outcomes[0].http_status, None);
        assert!(!outcomes[1].succeeded);
        assert_eq!(outcomes[1].http_status, Some(403));
        assert!(outcomes[2].succeeded);
    }

    #[tokio::test]
    async fn test_key_sent_as_given_and_duplicates_repeated() {
        let (v, prober) = validator(ProbeMode::Sequential);
        let request = ValidationRequest {
            api_key: " ABC123 ".into(),
            services: vec!["amap-jsapi".into(), "amap-jsapi".into()],
        };
        let outcomes = v.validate(&request).await.unwrap();
        assert_eq!(outcomes.len(), 2);

        let blank = v.run_validation("   ", &["amap-webapi"]).await.unwrap();
        assert_eq!(blank.len(), 1);
        assert_eq!(
            *prober.calls.lock().unwrap(),
            ["amap-jsapi: ABC123 ", "amap-jsapi: ABC123 ", "amap-webapi:   "]
        );
    }

    #[tokio::test]
    async fn test_crashed_task_becomes_failed_outcome_in_concurrent_mode() {
        let (v, _) = validator(ProbeMode::Concurrent);
        let outcomes = v
            .run_validation("ABC123", &["amap-webapi", "amap-miniprogram", "amap-jsapi"])
            .await
            .unwrap();
        assert_eq!(ids(&outcomes), ["amap-webapi", "amap-miniprogram", "amap-jsapi"]);

        let crashed = &outcomes[1];
        assert!(!crashed.succeeded);
        assert_eq!(crashed.http_status, None);
        assert_eq!(crashed.display_name, "高德小程序定位");
        assert!(crashed.body_or_error.starts_with("request exception: "));
        assert!(outcomes[0].succeeded);
        assert!(outcomes[2].succeeded);
    }
}
