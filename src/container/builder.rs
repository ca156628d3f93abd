use super::image::ImageRef;
use crate::source::CheckoutHandle;
use crate::util::process::{run_command, CommandError, CommandSpec};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("no container build file was generated")]
    MissingBuildFile,

    #[error("failed to write build file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image build failed: {0}")]
    Command(#[from] CommandError),
}

#[async_trait]
pub trait ImageBuilder: Send + Sync {
    /// Builds `image` from the checkout using `build_file` as its Dockerfile
    async fn build(
        &self,
        checkout: &CheckoutHandle,
        build_file: &str,
        image: &ImageRef,
    ) -> Result<(), BuildError>;
}

/// Builds with the local `docker` CLI
#[derive(Debug, Clone)]
pub struct DockerCliBuilder {
    timeout: Duration,
}

impl DockerCliBuilder {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ImageBuilder for DockerCliBuilder {
    async fn build(
        &self,
        checkout: &CheckoutHandle,
        build_file: &str,
        image: &ImageRef,
    ) -> Result<(), BuildError> {
        if build_file.trim().is_empty() {
            return Err(BuildError::MissingBuildFile);
        }

        let path = checkout.root.join("Dockerfile");
        tokio::fs::write(&path, build_file)
            .await
            .map_err(|source| BuildError::Io {
                path: path.clone(),
                source,
            })?;

        let tag = image.to_string();
        info!(image = %tag, dir = %checkout.root.display(), "Building image");
        let spec = CommandSpec::new("docker", self.timeout)
            .current_dir(&checkout.root)
            .args(["build", "-t", tag.as_str(), "-f", "Dockerfile", "."]);
        run_command(&spec).await?;
        Ok(())
    }
}
