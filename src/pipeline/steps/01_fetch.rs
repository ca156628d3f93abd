use crate::pipeline::collaborators::Collaborators;
use crate::pipeline::context::RunContext;
use crate::pipeline::error::StepError;
use crate::pipeline::step::{DeployStep, StepOutcome};
use async_trait::async_trait;

pub struct FetchStep;

#[async_trait]
impl DeployStep for FetchStep {
    fn label(&self) -> &'static str {
        "Fetch"
    }

    async fn execute(
        &self,
        context: &mut RunContext,
        deps: &Collaborators,
    ) -> Result<StepOutcome, StepError> {
        let checkout = deps.fetcher.fetch(&context.identity.source).await?;
        let message = format!(
            "checked out {} at {}",
            context.identity.source,
            if checkout.revision.is_empty() {
                "unknown revision"
            } else {
                checkout.revision.as_str()
            }
        );
        context.checkout = Some(checkout);
        Ok(StepOutcome::Succeeded(message))
    }
}
