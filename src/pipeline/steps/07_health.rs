use crate::health::{default_endpoint, HealthVerifier};
use crate::pipeline::collaborators::Collaborators;
use crate::pipeline::context::RunContext;
use crate::pipeline::error::StepError;
use crate::pipeline::step::{DeployStep, StepOutcome};
use async_trait::async_trait;

pub struct HealthStep;

#[async_trait]
impl DeployStep for HealthStep {
    fn label(&self) -> &'static str {
        "Verify Health"
    }

    /// Never fails: an unhealthy endpoint is reported as a warning because
    /// the release has already been updated
    async fn execute(
        &self,
        context: &mut RunContext,
        deps: &Collaborators,
    ) -> Result<StepOutcome, StepError> {
        let port = context
            .analysis
            .as_ref()
            .map(|a| a.descriptor.listen_port)
            .ok_or_else(|| StepError::missing("project descriptor"))?;
        let endpoint = context
            .options
            .health_url
            .clone()
            .or_else(|| context.config.health_url.clone())
            .unwrap_or_else(|| default_endpoint(port));

        let verifier = HealthVerifier::new(deps.health_probe.clone());
        let mut notify = context.notifier("Verify Health");
        match verifier
            .verify(
                &endpoint,
                context.config.health_attempts,
                context.config.health_interval,
                &mut notify,
            )
            .await
        {
            Ok(attempts) => Ok(StepOutcome::Succeeded(format!(
                "{} healthy after {} attempt(s)",
                endpoint, attempts
            ))),
            Err(timeout) => Ok(StepOutcome::Warning(timeout.to_string())),
        }
    }
}
