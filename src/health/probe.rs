use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe transport error: {0}")]
    Transport(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// One probe; returns the HTTP status code
    async fn probe(&self, endpoint: &str) -> Result<u16, ProbeError>;
}

pub struct HttpHealthProbe {
    client: Client,
}

impl HttpHealthProbe {
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProbeError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn probe(&self, endpoint: &str) -> Result<u16, ProbeError> {
        let response = self
            .client
            .get(endpoint)
            .send()
            .await
            .map_err(|e| ProbeError::Transport(e.to_string()))?;
        Ok(response.status().as_u16())
    }
}
