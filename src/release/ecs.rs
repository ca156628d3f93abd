use super::updater::{ReleaseError, ReleaseTarget, ServiceCounts};
use crate::util::process::{run_command, CommandSpec};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// ECS service driven through the aws CLI with JSON output
#[derive(Debug, Clone)]
pub struct EcsReleaseTarget {
    region: String,
    cluster: String,
    service: String,
    timeout: Duration,
}

impl EcsReleaseTarget {
    pub fn new(
        region: impl Into<String>,
        cluster: impl Into<String>,
        service: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            region: region.into(),
            cluster: cluster.into(),
            service: service.into(),
            timeout,
        }
    }

    async fn ecs(&self, args: &[&str]) -> Result<Value, ReleaseError> {
        let spec = CommandSpec::new("aws", self.timeout)
            .arg("ecs")
            .args(args.iter().copied())
            .args(["--region", self.region.as_str(), "--output", "json"]);
        let output = run_command(&spec).await?;
        serde_json::from_str(&output.stdout).map_err(|e| ReleaseError::Parse(e.to_string()))
    }

    async fn describe_service(&self) -> Result<Value, ReleaseError> {
        let json = self
            .ecs(&[
                "describe-services",
                "--cluster",
                &self.cluster,
                "--services",
                &self.service,
            ])
            .await?;
        json.pointer("/services/0")
            .cloned()
            .ok_or_else(|| ReleaseError::ServiceNotFound {
                cluster: self.cluster.clone(),
                service: self.service.clone(),
            })
    }
}

fn count(service: &Value, field: &str) -> Result<u32, ReleaseError> {
    service
        .get(field)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| ReleaseError::Parse(format!("missing {}", field)))
}

#[async_trait]
impl ReleaseTarget for EcsReleaseTarget {
    async fn current_definition(&self) -> Result<Value, ReleaseError> {
        let service = self.describe_service().await?;
        let arn = service
            .get("taskDefinition")
            .and_then(Value::as_str)
            .ok_or_else(|| ReleaseError::Parse("service has no task definition".to_string()))?
            .to_string();

        let json = self
            .ecs(&["describe-task-definition", "--task-definition", &arn])
            .await?;
        json.get("taskDefinition")
            .cloned()
            .ok_or_else(|| ReleaseError::Parse("missing taskDefinition".to_string()))
    }

    async fn register_definition(&self, definition: &Value) -> Result<String, ReleaseError> {
        let input = definition.to_string();
        let json = self
            .ecs(&["register-task-definition", "--cli-input-json", &input])
            .await?;
        json.pointer("/taskDefinition/taskDefinitionArn")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ReleaseError::Parse("missing taskDefinitionArn".to_string()))
    }

    async fn activate(&self, definition_id: &str) -> Result<(), ReleaseError> {
        self.ecs(&[
            "update-service",
            "--cluster",
            &self.cluster,
            "--service",
            &self.service,
            "--task-definition",
            definition_id,
            "--force-new-deployment",
        ])
        .await?;
        Ok(())
    }

    async fn counts(&self) -> Result<ServiceCounts, ReleaseError> {
        let service = self.describe_service().await?;
        Ok(ServiceCounts {
            running: count(&service, "runningCount")?,
            desired: count(&service, "desiredCount")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_count_reads_integer_fields() {
        let service = json!({"runningCount": 1, "desiredCount": 2});
        assert_eq!(count(&service, "runningCount").unwrap(), 1);
        assert!(count(&service, "pendingCount").is_err());
    }
}
