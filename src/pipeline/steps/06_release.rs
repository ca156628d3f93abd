use crate::pipeline::collaborators::Collaborators;
use crate::pipeline::context::RunContext;
use crate::pipeline::error::StepError;
use crate::pipeline::step::{DeployStep, StepOutcome};
use crate::release::ReleaseUpdater;
use async_trait::async_trait;

pub struct ReleaseStep;

#[async_trait]
impl DeployStep for ReleaseStep {
    fn label(&self) -> &'static str {
        "Update Release"
    }

    async fn execute(
        &self,
        context: &mut RunContext,
        deps: &Collaborators,
    ) -> Result<StepOutcome, StepError> {
        let image = context
            .image
            .as_ref()
            .ok_or_else(|| StepError::missing("published image"))?;
        let analysis = context
            .analysis
            .as_ref()
            .ok_or_else(|| StepError::missing("project descriptor"))?;

        let updater = ReleaseUpdater::new(
            deps.release_target.clone(),
            context.config.release_poll_attempts,
            context.config.release_poll_interval,
        );
        let mut notify = context.notifier("Update Release");
        let report = updater
            .update(image, &analysis.descriptor, &mut notify)
            .await?;

        // an unsettled rollout is left to the health check
        let message = match (report.stable, report.counts) {
            (true, _) => format!("{} rolled out", report.definition_id),
            (false, Some(c)) => format!(
                "{} registered; rollout not yet stable ({}/{} running after {} polls)",
                report.definition_id, c.running, c.desired, report.poll_attempts
            ),
            (false, None) => format!(
                "{} registered; rollout status unavailable",
                report.definition_id
            ),
        };
        context.release = Some(report);
        Ok(StepOutcome::Succeeded(message))
    }
}
