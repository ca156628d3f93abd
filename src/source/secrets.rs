//! Credential lookup for private repository access

use crate::util::process::{run_command, CommandError, CommandSpec};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret {0} not found")]
    NotFound(String),

    #[error("secret store command failed: {0}")]
    Command(#[from] CommandError),

    #[error("unexpected secret store response: {0}")]
    Parse(String),
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<String, SecretError>;
}

/// AWS SSM Parameter Store, queried through the aws CLI
#[derive(Debug, Clone)]
pub struct SsmSecretStore {
    region: String,
    timeout: Duration,
}

impl SsmSecretStore {
    pub fn new(region: impl Into<String>, timeout: Duration) -> Self {
        Self {
            region: region.into(),
            timeout,
        }
    }
}

#[async_trait]
impl SecretStore for SsmSecretStore {
    async fn get(&self, name: &str) -> Result<String, SecretError> {
        let spec = CommandSpec::new("aws", self.timeout).args([
            "ssm",
            "get-parameter",
            "--name",
            name,
            "--with-decryption",
            "--region",
            &self.region,
            "--output",
            "json",
        ]);

        let output = match run_command(&spec).await {
            Ok(output) => output,
            Err(CommandError::NonZeroExit { stderr, .. }) if stderr.contains("ParameterNotFound") => {
                return Err(SecretError::NotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let json: serde_json::Value = serde_json::from_str(&output.stdout)
            .map_err(|e| SecretError::Parse(e.to_string()))?;
        json.pointer("/Parameter/Value")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| SecretError::Parse("missing Parameter.Value".to_string()))
    }
}

/// Reads a fixed environment variable regardless of the requested name
#[derive(Debug, Clone)]
pub struct EnvSecretStore {
    var: String,
}

impl EnvSecretStore {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn get(&self, _name: &str) -> Result<String, SecretError> {
        std::env::var(&self.var)
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| SecretError::NotFound(self.var.clone()))
    }
}

/// Tries each store in order and returns the first hit
pub struct ChainedSecretStore {
    stores: Vec<Arc<dyn SecretStore>>,
}

impl ChainedSecretStore {
    pub fn new(stores: Vec<Arc<dyn SecretStore>>) -> Self {
        Self { stores }
    }
}

#[async_trait]
impl SecretStore for ChainedSecretStore {
    async fn get(&self, name: &str) -> Result<String, SecretError> {
        let mut last_err = SecretError::NotFound(name.to_string());
        for store in &self.stores {
            match store.get(name).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    debug!(secret = name, error = %e, "Secret store miss");
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }
}
