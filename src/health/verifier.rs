use super::probe::HealthProbe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Health endpoint used when none is configured
pub fn default_endpoint(port: u16) -> String {
    format!("http://localhost:{}/health", port)
}

/// Every probe failed; non-fatal to the run
#[derive(Debug, Error)]
#[error("{endpoint} not healthy after {attempts} attempts (last: {last})")]
pub struct HealthCheckTimeout {
    pub endpoint: String,
    pub attempts: u32,
    pub last: String,
}

pub struct HealthVerifier {
    probe: Arc<dyn HealthProbe>,
}

impl HealthVerifier {
    pub fn new(probe: Arc<dyn HealthProbe>) -> Self {
        Self { probe }
    }

    /// True on the first 2xx response, false once `max_attempts` probes failed
    pub async fn check(&self, endpoint: &str, max_attempts: u32, interval: Duration) -> bool {
        self.verify(endpoint, max_attempts, interval, &mut |_| {})
            .await
            .is_ok()
    }

    /// Like [`check`](Self::check) but returns the attempt count or the
    /// reason the last probe failed. Transport errors count as "not yet
    /// healthy".
    pub async fn verify(
        &self,
        endpoint: &str,
        max_attempts: u32,
        interval: Duration,
        note: &mut (dyn FnMut(String) + Send),
    ) -> Result<u32, HealthCheckTimeout> {
        let mut last = "no probe attempted".to_string();
        for attempt in 1..=max_attempts {
            match self.probe.probe(endpoint).await {
                Ok(status) if (200..300).contains(&status) => {
                    info!(endpoint, attempt, status, "Health check passed");
                    return Ok(attempt);
                }
                Ok(status) => last = format!("HTTP {}", status),
                Err(e) => last = e.to_string(),
            }
            debug!(endpoint, attempt, last = %last, "Health probe failed");
            note(format!("health probe {}/{}: {}", attempt, max_attempts, last));

            if attempt < max_attempts {
                tokio::time::sleep(interval).await;
            }
        }

        Err(HealthCheckTimeout {
            endpoint: endpoint.to_string(),
            attempts: max_attempts,
            last,
        })
    }
}
