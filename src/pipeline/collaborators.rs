//! Process-wide registry of external collaborators
//!
//! Built once at startup and handed to the orchestrator, so every boundary
//! the pipeline touches can be replaced in tests.

use super::config::PipelineConfig;
use crate::analysis::{FileDescriptorCache, ProjectAnalyzer};
use crate::artifacts::{ArtifactGenerator, ArtifactStore};
use crate::config::{ConfigError, DeployboxConfig};
use crate::container::{DockerCliBuilder, EcrPublisher, ImageBuilder, ImagePublisher};
use crate::execution_log::{JsonlLogSink, LogSink};
use crate::health::{HealthProbe, HttpHealthProbe};
use crate::llm::LLMClient;
use crate::progress::{LoggingHandler, ProgressHandler};
use crate::release::{EcsReleaseTarget, ReleaseTarget};
use crate::source::{ChainedSecretStore, EnvSecretStore, GitFetcher, SecretStore, SourceFetcher, SsmSecretStore};
use std::sync::Arc;

const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

pub struct Collaborators {
    pub fetcher: Arc<dyn SourceFetcher>,
    pub analyzer: Arc<ProjectAnalyzer>,
    pub generator: Arc<ArtifactGenerator>,
    pub artifact_store: ArtifactStore,
    pub builder: Arc<dyn ImageBuilder>,
    pub publisher: Arc<dyn ImagePublisher>,
    pub release_target: Arc<dyn ReleaseTarget>,
    pub health_probe: Arc<dyn HealthProbe>,
    pub log_sink: Arc<dyn LogSink>,
    pub progress: Arc<dyn ProgressHandler>,
}

impl Collaborators {
    /// Production wiring: git, docker, aws CLI, reqwest probes and file-backed state
    pub fn from_config(
        config: &DeployboxConfig,
        pipeline: &PipelineConfig,
    ) -> Result<Self, ConfigError> {
        let llm: Arc<dyn LLMClient> = config.create_llm_client()?;
        Self::with_llm(config, pipeline, llm)
    }

    pub fn with_llm(
        config: &DeployboxConfig,
        pipeline: &PipelineConfig,
        llm: Arc<dyn LLMClient>,
    ) -> Result<Self, ConfigError> {
        let cache = Arc::new(FileDescriptorCache::new(config.cache_path()));

        let env_token: Arc<dyn SecretStore> = Arc::new(EnvSecretStore::new(TOKEN_ENV_VAR));
        let ssm_token: Arc<dyn SecretStore> = Arc::new(SsmSecretStore::new(
            config.region.clone(),
            pipeline.release_api_timeout,
        ));
        let secrets: Arc<dyn SecretStore> =
            Arc::new(ChainedSecretStore::new(vec![env_token, ssm_token]));
        let fetcher = GitFetcher::new(pipeline.fetch_timeout)
            .with_token(secrets, config.github_token_param.clone());

        let analyzer = ProjectAnalyzer::new(llm.clone(), cache).with_bounds(
            pipeline.analyzer_max_paths,
            pipeline.analyzer_max_readme_bytes,
        );
        let generator = ArtifactGenerator::new(llm).with_bounds(
            pipeline.generator_max_paths,
            pipeline.generator_max_readme_bytes,
        );

        let probe = HttpHealthProbe::new(pipeline.health_probe_timeout)
            .map_err(|e| ConfigError::ValidationFailed(e.to_string()))?;

        Ok(Self {
            fetcher: Arc::new(fetcher),
            analyzer: Arc::new(analyzer),
            generator: Arc::new(generator),
            artifact_store: ArtifactStore::new(config.artifacts_dir()),
            builder: Arc::new(DockerCliBuilder::new(pipeline.build_timeout)),
            publisher: Arc::new(EcrPublisher::new(
                config.region.clone(),
                pipeline.login_timeout,
                pipeline.publish_timeout,
            )),
            release_target: Arc::new(EcsReleaseTarget::new(
                config.region.clone(),
                config.ecs_cluster.clone(),
                config.ecs_service.clone(),
                pipeline.release_api_timeout,
            )),
            health_probe: Arc::new(probe),
            log_sink: Arc::new(JsonlLogSink::new(config.log_dir())),
            progress: Arc::new(LoggingHandler),
        })
    }
}
