use super::image::ImageRef;
use crate::util::process::{run_command, CommandError, CommandSpec};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("registry login failed: {0}")]
    Login(#[source] CommandError),

    #[error("image push failed: {0}")]
    Push(#[source] CommandError),
}

#[async_trait]
pub trait ImagePublisher: Send + Sync {
    async fn publish(&self, image: &ImageRef) -> Result<(), PublishError>;
}

/// Pushes to ECR after logging the docker CLI in with a short-lived password
#[derive(Debug, Clone)]
pub struct EcrPublisher {
    region: String,
    login_timeout: Duration,
    push_timeout: Duration,
}

impl EcrPublisher {
    pub fn new(region: impl Into<String>, login_timeout: Duration, push_timeout: Duration) -> Self {
        Self {
            region: region.into(),
            login_timeout,
            push_timeout,
        }
    }

    async fn login(&self, registry: &str) -> Result<(), CommandError> {
        let password = run_command(
            &CommandSpec::new("aws", self.login_timeout).args([
                "ecr",
                "get-login-password",
                "--region",
                self.region.as_str(),
            ]),
        )
        .await?;

        run_command(
            &CommandSpec::new("docker", self.login_timeout)
                .args(["login", "--username", "AWS", "--password-stdin", registry])
                .stdin(password.stdout.trim().to_string()),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ImagePublisher for EcrPublisher {
    async fn publish(&self, image: &ImageRef) -> Result<(), PublishError> {
        self.login(&image.registry).await.map_err(PublishError::Login)?;

        let reference = image.to_string();
        info!(image = %reference, "Pushing image");
        run_command(&CommandSpec::new("docker", self.push_timeout).args(["push", reference.as_str()]))
            .await
            .map_err(PublishError::Push)?;
        Ok(())
    }
}
