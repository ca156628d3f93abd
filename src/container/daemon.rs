//! Docker daemon preflight

use bollard::Docker;
use tracing::debug;

/// Daemon version when it is reachable over the local socket
pub async fn docker_daemon_version() -> Option<String> {
    let docker = match Docker::connect_with_local_defaults() {
        Ok(d) => d,
        Err(e) => {
            debug!("Failed to connect to Docker: {}", e);
            return None;
        }
    };

    match docker.version().await {
        Ok(v) => Some(v.version.unwrap_or_else(|| "unknown".to_string())),
        Err(e) => {
            debug!("Failed to get Docker version: {}", e);
            None
        }
    }
}
