//! Post-release health verification

mod probe;
mod verifier;

pub use probe::{HealthProbe, HttpHealthProbe, ProbeError};
pub use verifier::{default_endpoint, HealthCheckTimeout, HealthVerifier};
