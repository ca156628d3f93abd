//! Configuration management for deploybox
//!
//! Settings are loaded from environment variables with defaults suited to a
//! single-account AWS deployment target. Provider credentials (API keys) are
//! read by the genai library directly and are not part of this struct.
//!
//! # Environment Variables
//!
//! - `DEPLOYBOX_PROVIDER`: genai adapter (openai|anthropic|ollama|gemini|groq|xai|deepseek) - default: "openai"
//! - `DEPLOYBOX_MODEL`: model name - default: "gpt-4o"
//! - `DEPLOYBOX_API_BASE_URL`: OpenAI-compatible gateway URL - optional
//! - `DEPLOYBOX_INFERENCE_TIMEOUT`: inference timeout in seconds - default: "900"
//! - `DEPLOYBOX_REGION`: AWS region - default: "ap-northeast-2"
//! - `DEPLOYBOX_REGISTRY`: container registry host - required for `deploy`
//! - `DEPLOYBOX_IMAGE_REPOSITORY`: registry repository name - default: "deploybox"
//! - `DEPLOYBOX_ECS_CLUSTER` / `DEPLOYBOX_ECS_SERVICE`: release target
//! - `DEPLOYBOX_GITHUB_TOKEN_PARAM`: SSM parameter holding the fetch token
//! - `DEPLOYBOX_HEALTH_URL`: health endpoint override - optional
//! - `DEPLOYBOX_STATE_DIR`: execution logs, cache and artifacts
//! - `DEPLOYBOX_LOG_LEVEL`: logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use deploybox::DeployboxConfig;
//!
//! let config = DeployboxConfig::default();
//! config.validate().expect("Invalid configuration");
//! let client = config.create_llm_client().expect("LLM client");
//! ```

use crate::llm::{BackendError, GenAIClient};
use genai::adapter::AdapterKind;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PROVIDER: AdapterKind = AdapterKind::OpenAI;
const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_INFERENCE_TIMEOUT_SECS: u64 = 900;
const MAX_INFERENCE_TIMEOUT_SECS: u64 = 1800;
const DEFAULT_REGION: &str = "ap-northeast-2";
const DEFAULT_IMAGE_REPOSITORY: &str = "deploybox";
const DEFAULT_ECS_CLUSTER: &str = "deploybox-cluster";
const DEFAULT_ECS_SERVICE: &str = "deploybox-service";
const DEFAULT_GITHUB_TOKEN_PARAM: &str = "/deploybox/github/token";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid provider: {0}. Valid options: openai, anthropic, ollama, gemini, groq, xai, deepseek")]
    InvalidProvider(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("LLM client initialization failed: {0}")]
    BackendInitError(#[from] BackendError),
}

#[derive(Debug, Clone)]
pub struct DeployboxConfig {
    pub provider: AdapterKind,
    pub model: String,
    pub api_base_url: Option<String>,
    pub inference_timeout_secs: u64,

    pub region: String,
    /// Registry host, e.g. `123456789012.dkr.ecr.ap-northeast-2.amazonaws.com`
    pub registry: Option<String>,
    pub image_repository: String,
    pub ecs_cluster: String,
    pub ecs_service: String,
    pub github_token_param: String,
    pub health_url: Option<String>,

    pub state_dir: PathBuf,
    pub log_level: String,
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

pub fn parse_provider(name: &str) -> Result<AdapterKind, ConfigError> {
    let lowered = name.trim().to_lowercase();
    let lowered = match lowered.as_str() {
        "claude" => "anthropic".to_string(),
        "grok" => "xai".to_string(),
        _ => lowered,
    };
    AdapterKind::from_lower_str(&lowered).ok_or_else(|| ConfigError::InvalidProvider(name.to_string()))
}

fn default_state_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(env::temp_dir)
        .join("deploybox")
}

impl Default for DeployboxConfig {
    /// Loads from `DEPLOYBOX_*` variables; unparsable values fall back to defaults
    fn default() -> Self {
        let provider = env_opt("DEPLOYBOX_PROVIDER")
            .and_then(|p| parse_provider(&p).ok())
            .unwrap_or(DEFAULT_PROVIDER);

        let inference_timeout_secs = env_opt("DEPLOYBOX_INFERENCE_TIMEOUT")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_INFERENCE_TIMEOUT_SECS);

        let state_dir = env_opt("DEPLOYBOX_STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_state_dir);

        Self {
            provider,
            model: env_or("DEPLOYBOX_MODEL", DEFAULT_MODEL),
            api_base_url: env_opt("DEPLOYBOX_API_BASE_URL"),
            inference_timeout_secs,
            region: env_or("DEPLOYBOX_REGION", DEFAULT_REGION),
            registry: env_opt("DEPLOYBOX_REGISTRY"),
            image_repository: env_or("DEPLOYBOX_IMAGE_REPOSITORY", DEFAULT_IMAGE_REPOSITORY),
            ecs_cluster: env_or("DEPLOYBOX_ECS_CLUSTER", DEFAULT_ECS_CLUSTER),
            ecs_service: env_or("DEPLOYBOX_ECS_SERVICE", DEFAULT_ECS_SERVICE),
            github_token_param: env_or("DEPLOYBOX_GITHUB_TOKEN_PARAM", DEFAULT_GITHUB_TOKEN_PARAM),
            health_url: env_opt("DEPLOYBOX_HEALTH_URL"),
            state_dir,
            log_level: env_or("DEPLOYBOX_LOG_LEVEL", DEFAULT_LOG_LEVEL).to_lowercase(),
        }
    }
}

impl DeployboxConfig {
    /// Checks ranges and required names.
    ///
    /// The registry is not checked here because offline commands do not
    /// need it; see [`DeployboxConfig::require_registry`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inference_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Inference timeout must be at least 1 second".to_string(),
            ));
        }
        if self.inference_timeout_secs > MAX_INFERENCE_TIMEOUT_SECS {
            return Err(ConfigError::ValidationFailed(
                "Inference timeout cannot exceed 30 minutes".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        if self.ecs_cluster.trim().is_empty() || self.ecs_service.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "ECS cluster and service names must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn require_registry(&self) -> Result<&str, ConfigError> {
        self.registry.as_deref().ok_or(ConfigError::Missing("DEPLOYBOX_REGISTRY"))
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.inference_timeout_secs)
    }

    pub fn create_llm_client(&self) -> Result<Arc<GenAIClient>, ConfigError> {
        let client = GenAIClient::new(
            self.provider,
            self.model.clone(),
            self.inference_timeout(),
            self.api_base_url.clone(),
        )?;
        Ok(Arc::new(client))
    }

    pub fn log_dir(&self) -> PathBuf {
        self.state_dir.join("runs")
    }

    pub fn cache_path(&self) -> PathBuf {
        self.state_dir.join("descriptor-cache.json")
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.state_dir.join("artifacts")
    }

    pub fn to_display_map(&self) -> std::collections::BTreeMap<String, String> {
        let mut map = std::collections::BTreeMap::new();
        map.insert("provider".to_string(), self.provider.as_str().to_string());
        map.insert("model".to_string(), self.model.clone());
        map.insert("region".to_string(), self.region.clone());
        map.insert(
            "registry".to_string(),
            self.registry.clone().unwrap_or_else(|| "<unset>".to_string()),
        );
        map.insert("image_repository".to_string(), self.image_repository.clone());
        map.insert("ecs_cluster".to_string(), self.ecs_cluster.clone());
        map.insert("ecs_service".to_string(), self.ecs_service.clone());
        map.insert("state_dir".to_string(), self.state_dir.display().to_string());
        map.insert("log_level".to_string(), self.log_level.clone());
        map
    }
}

impl fmt::Display for DeployboxConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Deploybox Configuration:")?;
        writeln!(f, "  Provider: {}", self.provider.as_str())?;
        writeln!(f, "  Model: {}", self.model)?;
        writeln!(f, "  Inference Timeout: {}s", self.inference_timeout_secs)?;
        writeln!(f, "  Region: {}", self.region)?;
        writeln!(
            f,
            "  Registry: {}",
            self.registry.as_deref().unwrap_or("<unset>")
        )?;
        writeln!(f, "  Release Target: {}/{}", self.ecs_cluster, self.ecs_service)?;
        writeln!(f, "  State Dir: {}", self.state_dir.display())?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }

        fn unset(key: &str) -> Self {
            let old_value = env::var(key).ok();
            env::remove_var(key);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_configuration() {
        let _guards = vec![
            EnvGuard::unset("DEPLOYBOX_PROVIDER"),
            EnvGuard::unset("DEPLOYBOX_MODEL"),
            EnvGuard::unset("DEPLOYBOX_REGISTRY"),
            EnvGuard::unset("DEPLOYBOX_INFERENCE_TIMEOUT"),
            EnvGuard::unset("DEPLOYBOX_ECS_CLUSTER"),
            EnvGuard::unset("DEPLOYBOX_LOG_LEVEL"),
        ];

        let config = DeployboxConfig::default();

        assert_eq!(config.provider, AdapterKind::OpenAI);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.inference_timeout_secs, DEFAULT_INFERENCE_TIMEOUT_SECS);
        assert_eq!(config.ecs_cluster, DEFAULT_ECS_CLUSTER);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert!(config.registry.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_environment_variable_parsing() {
        let _guards = vec![
            EnvGuard::set("DEPLOYBOX_PROVIDER", "claude"),
            EnvGuard::set("DEPLOYBOX_MODEL", "claude-sonnet"),
            EnvGuard::set("DEPLOYBOX_INFERENCE_TIMEOUT", "120"),
            EnvGuard::set("DEPLOYBOX_REGISTRY", "example.dkr.ecr.local"),
            EnvGuard::set("DEPLOYBOX_STATE_DIR", "/tmp/deploybox-state"),
            EnvGuard::set("DEPLOYBOX_LOG_LEVEL", "DEBUG"),
        ];

        let config = DeployboxConfig::default();

        assert_eq!(config.provider, AdapterKind::Anthropic);
        assert_eq!(config.model, "claude-sonnet");
        assert_eq!(config.inference_timeout_secs, 120);
        assert_eq!(config.require_registry().unwrap(), "example.dkr.ecr.local");
        assert_eq!(config.log_level, "debug");
        assert_eq!(
            config.log_dir(),
            PathBuf::from("/tmp/deploybox-state/runs")
        );
    }

    #[test]
    #[serial]
    fn test_unparsable_timeout_uses_default() {
        let _guard = EnvGuard::set("DEPLOYBOX_INFERENCE_TIMEOUT", "soon");
        let config = DeployboxConfig::default();
        assert_eq!(config.inference_timeout_secs, DEFAULT_INFERENCE_TIMEOUT_SECS);
    }

    #[test]
    #[serial]
    fn test_validation_rejects_bad_values() {
        let mut config = DeployboxConfig::default();
        config.inference_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = DeployboxConfig::default();
        config.inference_timeout_secs = 3600;
        assert!(config.validate().is_err());

        let mut config = DeployboxConfig::default();
        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = DeployboxConfig::default();
        config.ecs_service = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_require_registry_missing() {
        let _guard = EnvGuard::unset("DEPLOYBOX_REGISTRY");
        let config = DeployboxConfig::default();
        assert!(matches!(
            config.require_registry(),
            Err(ConfigError::Missing("DEPLOYBOX_REGISTRY"))
        ));
    }

    #[test]
    fn test_parse_provider() {
        assert_eq!(parse_provider("OpenAI").unwrap(), AdapterKind::OpenAI);
        assert_eq!(parse_provider("ollama").unwrap(), AdapterKind::Ollama);
        assert_eq!(parse_provider("grok").unwrap(), AdapterKind::Xai);
        assert!(parse_provider("mystery").is_err());
    }

    #[test]
    #[serial]
    fn test_config_display() {
        let config = DeployboxConfig::default();
        let display = format!("{}", config);
        assert!(display.contains("Deploybox Configuration:"));
        assert!(display.contains("Release Target:"));
    }
}
