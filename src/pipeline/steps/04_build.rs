use crate::container::{image_tag, BuildError, ImageRef};
use crate::pipeline::collaborators::Collaborators;
use crate::pipeline::context::RunContext;
use crate::pipeline::error::StepError;
use crate::pipeline::step::{DeployStep, StepOutcome};
use async_trait::async_trait;

pub struct BuildStep;

#[async_trait]
impl DeployStep for BuildStep {
    fn label(&self) -> &'static str {
        "Build"
    }

    async fn execute(
        &self,
        context: &mut RunContext,
        deps: &Collaborators,
    ) -> Result<StepOutcome, StepError> {
        let checkout = context
            .checkout
            .as_ref()
            .ok_or_else(|| StepError::missing("checkout"))?;
        let build_file = context
            .artifacts
            .as_ref()
            .and_then(|a| a.bundle.container_build_file())
            .ok_or(BuildError::MissingBuildFile)?;

        let image = ImageRef::new(
            context.config.registry.clone(),
            context.config.image_repository.clone(),
            image_tag(context.run_id()),
        );
        deps.builder.build(checkout, build_file, &image).await?;

        let message = format!("built {}", image);
        context.image = Some(image);
        Ok(StepOutcome::Succeeded(message))
    }
}
