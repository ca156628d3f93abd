use crate::analysis::{DescriptorSource, ProjectSnapshot};
use crate::pipeline::collaborators::Collaborators;
use crate::pipeline::context::RunContext;
use crate::pipeline::error::StepError;
use crate::pipeline::step::{DeployStep, StepOutcome};
use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};

pub struct AnalyzeStep;

/// Stable short id for one analysis: sha256 of repository, revision and time
pub fn analysis_id(repository: &str, revision: &str, timestamp: &str) -> String {
    let digest = Sha256::digest(format!("{}-{}-{}", repository, revision, timestamp).as_bytes());
    hex::encode(digest)[..16].to_string()
}

#[async_trait]
impl DeployStep for AnalyzeStep {
    fn label(&self) -> &'static str {
        "Analyze"
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

        let snapshot = match &context.options.files {
            Some(files) => ProjectSnapshot::new(files.clone(), context.options.readme.clone()),
            None => ProjectSnapshot::from_checkout(&checkout.root, deps.analyzer.max_readme_bytes()),
        };

        let repository = context.identity.source.identity();
        let revision = if checkout.revision.is_empty() {
            context.identity.source.git_ref.clone()
        } else {
            checkout.revision.clone()
        };

        let known = deps.analyzer.known_deployments(&repository);
        let outcome = deps
            .analyzer
            .analyze(&repository, &revision, context.run_id(), &snapshot, &known)
            .await;

        let d = &outcome.descriptor;
        let mut message = format!(
            "{}{} on port {}, tier {}, confidence {} (source: {})",
            d.primary_language,
            d.primary_framework
                .as_deref()
                .map(|f| format!("/{}", f))
                .unwrap_or_default(),
            d.listen_port,
            d.resource_tier,
            d.confidence.as_str(),
            match outcome.source {
                DescriptorSource::Inference => "inference",
                DescriptorSource::Fallback => "fallback",
                DescriptorSource::Cache => "cache",
            }
        );
        if let Some(note) = &outcome.note {
            message.push_str(&format!("; {}", note));
        }

        context.analysis_id = Some(analysis_id(&repository, &revision, &Utc::now().to_rfc3339()));
        context.snapshot = Some(snapshot);
        context.analysis = Some(outcome);
        Ok(StepOutcome::Succeeded(message))
    }
}
