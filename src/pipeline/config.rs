use crate::config::{ConfigError, DeployboxConfig};
use std::time::Duration;

/// Per-run settings: where images go and how long each step may take
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub registry: String,
    pub image_repository: String,
    /// Overrides the endpoint derived from the descriptor's port
    pub health_url: Option<String>,

    pub fetch_timeout: Duration,
    pub build_timeout: Duration,
    pub publish_timeout: Duration,
    pub login_timeout: Duration,
    pub release_api_timeout: Duration,

    pub release_poll_attempts: u32,
    pub release_poll_interval: Duration,
    pub health_attempts: u32,
    pub health_interval: Duration,
    pub health_probe_timeout: Duration,

    pub analyzer_max_paths: usize,
    pub analyzer_max_readme_bytes: usize,
    pub generator_max_paths: usize,
    pub generator_max_readme_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            registry: String::new(),
            image_repository: "deploybox".to_string(),
            health_url: None,
            fetch_timeout: Duration::from_secs(120),
            build_timeout: Duration::from_secs(600),
            publish_timeout: Duration::from_secs(600),
            login_timeout: Duration::from_secs(30),
            release_api_timeout: Duration::from_secs(60),
            release_poll_attempts: 30,
            release_poll_interval: Duration::from_secs(10),
            health_attempts: 10,
            health_interval: Duration::from_secs(3),
            health_probe_timeout: Duration::from_secs(5),
            analyzer_max_paths: 100,
            analyzer_max_readme_bytes: 3000,
            generator_max_paths: 50,
            generator_max_readme_bytes: 2000,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deployment settings from the environment; fails without a registry
    pub fn from_config(config: &DeployboxConfig) -> Result<Self, ConfigError> {
        Ok(Self::default()
            .with_registry(config.require_registry()?, config.image_repository.clone())
            .with_health_url(config.health_url.clone()))
    }

    pub fn with_registry(mut self, registry: impl Into<String>, repository: impl Into<String>) -> Self {
        self.registry = registry.into();
        self.image_repository = repository.into();
        self
    }

    pub fn with_health_url(mut self, url: Option<String>) -> Self {
        self.health_url = url;
        self
    }

    pub fn with_release_polling(mut self, attempts: u32, interval: Duration) -> Self {
        self.release_poll_attempts = attempts;
        self.release_poll_interval = interval;
        self
    }

    pub fn with_health_polling(mut self, attempts: u32, interval: Duration) -> Self {
        self.health_attempts = attempts;
        self.health_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.fetch_timeout, Duration::from_secs(120));
        assert_eq!(config.build_timeout, Duration::from_secs(600));
        assert_eq!(config.release_poll_attempts, 30);
        assert_eq!(config.release_poll_interval, Duration::from_secs(10));
        assert_eq!(config.health_attempts, 10);
        assert_eq!(config.analyzer_max_paths, 100);
        assert_eq!(config.generator_max_readme_bytes, 2000);
    }

    #[test]
    fn test_builder_pattern() {
        let config = PipelineConfig::new()
            .with_registry("registry.example", "widget")
            .with_release_polling(2, Duration::ZERO)
            .with_health_polling(3, Duration::from_millis(5));

        assert_eq!(config.registry, "registry.example");
        assert_eq!(config.image_repository, "widget");
        assert_eq!(config.release_poll_attempts, 2);
        assert_eq!(config.health_attempts, 3);
        assert_eq!(config.health_interval, Duration::from_millis(5));
    }
}
