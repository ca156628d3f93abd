use crate::pipeline::collaborators::Collaborators;
use crate::pipeline::context::RunContext;
use crate::pipeline::error::StepError;
use crate::pipeline::step::{DeployStep, StepOutcome};
use async_trait::async_trait;

pub struct PublishStep;

#[async_trait]
impl DeployStep for PublishStep {
    fn label(&self) -> &'static str {
        "Publish"
    }

    async fn execute(
        &self,
        context: &mut RunContext,
        deps: &Collaborators,
    ) -> Result<StepOutcome, StepError> {
        let image = context
            .image
            .as_ref()
            .ok_or_else(|| StepError::missing("built image"))?;
        deps.publisher.publish(image).await?;
        Ok(StepOutcome::Succeeded(format!("pushed {}", image)))
    }
}
