use super::definition::substitute_image;
use crate::analysis::ProjectDescriptor;
use crate::container::ImageRef;
use crate::util::process::CommandError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("release API call failed: {0}")]
    Command(#[from] CommandError),

    #[error("service {service} not found in cluster {cluster}")]
    ServiceNotFound { cluster: String, service: String },

    #[error("invalid task definition: {0}")]
    InvalidDefinition(String),

    #[error("unexpected release API response: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServiceCounts {
    pub running: u32,
    pub desired: u32,
}

impl ServiceCounts {
    pub fn is_stable(&self) -> bool {
        self.desired > 0 && self.running == self.desired
    }
}

/// Externally managed service definition
#[async_trait]
pub trait ReleaseTarget: Send + Sync {
    /// Currently active task definition
    async fn current_definition(&self) -> Result<Value, ReleaseError>;

    /// Registers a new definition and returns its identifier
    async fn register_definition(&self, definition: &Value) -> Result<String, ReleaseError>;

    /// Points the service at `definition_id` and starts a rollout
    async fn activate(&self, definition_id: &str) -> Result<(), ReleaseError>;

    async fn counts(&self) -> Result<ServiceCounts, ReleaseError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseReport {
    pub definition_id: String,
    pub stable: bool,
    pub counts: Option<ServiceCounts>,
    pub poll_attempts: u32,
}

pub struct ReleaseUpdater {
    target: Arc<dyn ReleaseTarget>,
    poll_attempts: u32,
    poll_interval: Duration,
}

impl ReleaseUpdater {
    pub fn new(target: Arc<dyn ReleaseTarget>, poll_attempts: u32, poll_interval: Duration) -> Self {
        Self {
            target,
            poll_attempts,
            poll_interval,
        }
    }

    /// Registers and activates a definition running `image`, then waits for
    /// the rollout. `note` receives a progress line every third poll.
    pub async fn update(
        &self,
        image: &ImageRef,
        descriptor: &ProjectDescriptor,
        note: &mut (dyn FnMut(String) + Send),
    ) -> Result<ReleaseReport, ReleaseError> {
        let current = self.target.current_definition().await?;
        let next = substitute_image(&current, &image.to_string(), descriptor.resource_tier)?;
        let definition_id = self.target.register_definition(&next).await?;
        info!(definition = %definition_id, image = %image, "Registered task definition");

        self.target.activate(&definition_id).await?;
        info!(definition = %definition_id, "Service update started");

        let mut last = None;
        let mut attempts = 0;
        for attempt in 1..=self.poll_attempts {
            attempts = attempt;
            match self.target.counts().await {
                Ok(counts) => {
                    debug!(attempt, running = counts.running, desired = counts.desired, "Rollout status");
                    last = Some(counts);
                    if counts.is_stable() {
                        return Ok(ReleaseReport {
                            definition_id,
                            stable: true,
                            counts: last,
                            poll_attempts: attempt,
                        });
                    }
                    if attempt % 3 == 0 {
                        note(format!(
                            "waiting for rollout: {}/{} tasks running (attempt {}/{})",
                            counts.running, counts.desired, attempt, self.poll_attempts
                        ));
                    }
                }
                Err(e) => warn!(attempt, error = %e, "Failed to read rollout status"),
            }

            if attempt < self.poll_attempts {
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        warn!(definition = %definition_id, attempts, "Rollout did not stabilize within the polling budget");
        Ok(ReleaseReport {
            definition_id,
            stable: false,
            counts: last,
            poll_attempts: attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Confidence, ResourceTier};
    use serde_json::json;
    use std::sync::Mutex;

    struct ScriptedTarget {
        counts: Mutex<Vec<ServiceCounts>>,
        registered: Mutex<Vec<Value>>,
        activated: Mutex<Vec<String>>,
    }

    impl ScriptedTarget {
        fn new(counts: Vec<ServiceCounts>) -> Self {
            Self {
                counts: Mutex::new(counts),
                registered: Mutex::new(Vec::new()),
                activated: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ReleaseTarget for ScriptedTarget {
        async fn current_definition(&self) -> Result<Value, ReleaseError> {
            Ok(json!({"family": "app", "revision": 3, "containerDefinitions": [{"name": "app", "image": "old"}]}))
        }

        async fn register_definition(&self, definition: &Value) -> Result<String, ReleaseError> {
            self.registered.lock().unwrap().push(definition.clone());
            Ok("app:4".to_string())
        }

        async fn activate(&self, definition_id: &str) -> Result<(), ReleaseError> {
            self.activated.lock().unwrap().push(definition_id.to_string());
            Ok(())
        }

        async fn counts(&self) -> Result<ServiceCounts, ReleaseError> {
            let mut counts = self.counts.lock().unwrap();
            if counts.len() > 1 {
                Ok(counts.remove(0))
            } else {
                Ok(counts[0])
            }
        }
    }

    fn descriptor() -> ProjectDescriptor {
        ProjectDescriptor {
            primary_language: "Go".to_string(),
            primary_framework: None,
            runtime_label: "Go 1.21".to_string(),
            listen_port: 8080,
            resource_tier: ResourceTier::Medium,
            database_requirement: None,
            confidence: Confidence::High,
            package_managers: vec![],
        }
    }

    #[tokio::test]
    async fn test_update_waits_for_stable_rollout() {
        let target = Arc::new(ScriptedTarget::new(vec![
            ServiceCounts { running: 0, desired: 1 },
            ServiceCounts { running: 1, desired: 1 },
        ]));
        let updater = ReleaseUpdater::new(target.clone(), 5, Duration::ZERO);
        let image = ImageRef::new("registry", "app", "deploy-1");

        let report = updater.update(&image, &descriptor(), &mut |_| {}).await.unwrap();

        assert!(report.stable);
        assert_eq!(report.poll_attempts, 2);
        assert_eq!(target.activated.lock().unwrap().as_slice(), ["app:4"]);
        let registered = target.registered.lock().unwrap();
        assert_eq!(registered[0]["containerDefinitions"][0]["image"], "registry/app:deploy-1");
        assert_eq!(registered[0]["cpu"], "512");
        assert!(registered[0].get("revision").is_none());
    }

    #[tokio::test]
    async fn test_never_stable_rollout_is_not_an_error() {
        let target = Arc::new(ScriptedTarget::new(vec![ServiceCounts { running: 0, desired: 2 }]));
        let updater = ReleaseUpdater::new(target, 6, Duration::ZERO);
        let mut notes = Vec::new();

        let report = updater
            .update(&ImageRef::new("r", "app", "t"), &descriptor(), &mut |n| notes.push(n))
            .await
            .unwrap();

        assert!(!report.stable);
        assert_eq!(report.poll_attempts, 6);
        assert_eq!(notes.len(), 2);
    }

    #[test]
    fn test_zero_desired_is_not_stable() {
        assert!(!ServiceCounts { running: 0, desired: 0 }.is_stable());
        assert!(ServiceCounts { running: 2, desired: 2 }.is_stable());
    }
}
