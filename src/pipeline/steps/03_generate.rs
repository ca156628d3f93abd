use crate::artifacts::GenerationSource;
use crate::container::image_tag;
use crate::pipeline::collaborators::Collaborators;
use crate::pipeline::context::RunContext;
use crate::pipeline::error::StepError;
use crate::pipeline::step::{DeployStep, StepOutcome};
use async_trait::async_trait;
use tracing::warn;

pub struct GenerateStep;

#[async_trait]
impl DeployStep for GenerateStep {
    fn label(&self) -> &'static str {
        "Generate Artifacts"
    }

    async fn execute(
        &self,
        context: &mut RunContext,
        deps: &Collaborators,
    ) -> Result<StepOutcome, StepError> {
        let analysis = context
            .analysis
            .as_ref()
            .ok_or_else(|| StepError::missing("project descriptor"))?;
        let snapshot = context
            .snapshot
            .as_ref()
            .ok_or_else(|| StepError::missing("project snapshot"))?;
        let analysis_id = context.analysis_id.clone().unwrap_or_default();

        let generated = deps
            .generator
            .generate(
                &analysis.descriptor,
                snapshot.readme.as_deref(),
                &snapshot.files,
                &analysis_id,
                &image_tag(context.run_id()),
            )
            .await;

        let kinds: Vec<&str> = generated.bundle.kinds().iter().map(|k| k.as_str()).collect();
        let mut message = format!(
            "generated {} ({})",
            kinds.join(", "),
            match generated.source {
                GenerationSource::Inference => "inference",
                GenerationSource::Template => "template",
            }
        );
        if let Some(note) = &generated.note {
            message.push_str(&format!("; {}", note));
        }
        if !generated.fixups_applied.is_empty() {
            message.push_str(&format!("; fix-ups: {}", generated.fixups_applied.join(", ")));
        }

        let outcome = match deps
            .artifact_store
            .persist(context.run_id(), &generated.bundle)
        {
            Ok(locations) => {
                context.artifact_locations = locations;
                StepOutcome::Succeeded(message)
            }
            Err(e) => {
                warn!(run_id = %context.run_id(), error = %e, "Failed to store artifacts");
                StepOutcome::Warning(format!("{}; artifacts not stored: {}", message, e))
            }
        };

        context.artifacts = Some(generated);
        Ok(outcome)
    }
}
