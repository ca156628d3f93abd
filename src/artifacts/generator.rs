use super::bundle::{ArtifactBundle, ArtifactKind};
use super::fixups::{self, FixupContext};
use super::infra_vars::render_tfvars;
use super::templates;
use crate::analysis::ProjectDescriptor;
use crate::llm::extract::{extract_code_block, extract_section};
use crate::llm::{BackendError, LLMClient, LLMRequest};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

const SYSTEM_PROMPT: &str = "You are an expert DevOps engineer specializing in containerized \
deployments on AWS ECS Fargate. Produce production-ready deployment files for the described \
project. Never use heredoc syntax in Dockerfiles and always tag base images as name:version.";

/// Reasons the inference reply could not be turned into artifacts; always
/// recovered with the deterministic templates
#[derive(Debug, Error)]
pub enum GenerationServiceError {
    #[error("inference service error: {0}")]
    Backend(#[from] BackendError),

    #[error("inference reply was empty")]
    EmptyReply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationSource {
    Inference,
    Template,
}

#[derive(Debug, Clone)]
pub struct GeneratedArtifacts {
    pub bundle: ArtifactBundle,
    pub source: GenerationSource,
    pub note: Option<String>,
    /// Fix-up rules that changed the container build file
    pub fixups_applied: Vec<&'static str>,
}

const SECTIONS: &[(&str, ArtifactKind)] = &[
    ("DOCKERFILE", ArtifactKind::ContainerBuildFile),
    ("TERRAFORM", ArtifactKind::InfraDefinition),
    ("APPSPEC", ArtifactKind::ProcessManifest),
    ("BUILDSPEC", ArtifactKind::BuildManifest),
    ("RECOMMENDATIONS", ArtifactKind::ReleaseNotes),
];

/// Splits a reply into artifacts.
///
/// Named `---SECTION---` delimiters are tried first. Kinds that have no
/// section fall back to fenced code blocks. When neither yields release notes
/// the whole reply becomes the release notes.
pub fn parse_sections(reply: &str) -> ArtifactBundle {
    let mut bundle = ArtifactBundle::new();

    for (name, kind) in SECTIONS {
        if let Some(body) = extract_section(reply, name) {
            bundle.insert(*kind, body);
        }
    }

    if !bundle.contains(ArtifactKind::ContainerBuildFile) {
        if let Some(body) = extract_code_block(reply, "dockerfile", None)
            .or_else(|| extract_code_block(reply, "docker", None))
        {
            bundle.insert(ArtifactKind::ContainerBuildFile, body);
        }
    }
    if !bundle.contains(ArtifactKind::InfraDefinition) {
        if let Some(body) = extract_code_block(reply, "terraform", None)
            .or_else(|| extract_code_block(reply, "hcl", None))
        {
            bundle.insert(ArtifactKind::InfraDefinition, body);
        }
    }
    if !bundle.contains(ArtifactKind::ProcessManifest) {
        if let Some(body) = extract_code_block(reply, "yaml", Some("appspec")) {
            bundle.insert(ArtifactKind::ProcessManifest, body);
        }
    }
    if !bundle.contains(ArtifactKind::BuildManifest) {
        if let Some(body) = extract_code_block(reply, "yaml", Some("buildspec")) {
            bundle.insert(ArtifactKind::BuildManifest, body);
        }
    }
    if !bundle.contains(ArtifactKind::ReleaseNotes) {
        bundle.insert(ArtifactKind::ReleaseNotes, reply.trim());
    }

    bundle
}

pub struct ArtifactGenerator {
    llm: Arc<dyn LLMClient>,
    max_paths: usize,
    max_readme_bytes: usize,
}

impl ArtifactGenerator {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self {
            llm,
            max_paths: 50,
            max_readme_bytes: 2000,
        }
    }

    pub fn with_bounds(mut self, max_paths: usize, max_readme_bytes: usize) -> Self {
        self.max_paths = max_paths;
        self.max_readme_bytes = max_readme_bytes;
        self
    }

    /// Produces the artifact bundle; never fails.
    ///
    /// Inference output is used when available, otherwise the templates for
    /// the descriptor's language. Infra variables are always rendered from
    /// the descriptor, and the container build file always goes through the
    /// fix-up passes.
    pub async fn generate(
        &self,
        descriptor: &ProjectDescriptor,
        readme: Option<&str>,
        files: &[String],
        analysis_id: &str,
        image_tag: &str,
    ) -> GeneratedArtifacts {
        let (mut bundle, source, mut note) = match self.infer(descriptor, readme, files).await {
            Ok(bundle) => (bundle, GenerationSource::Inference, None),
            Err(e) => {
                warn!(error = %e, "Artifact generation falling back to templates");
                (
                    templates::fallback_bundle(descriptor),
                    GenerationSource::Template,
                    Some(e.to_string()),
                )
            }
        };

        if !bundle.contains(ArtifactKind::ContainerBuildFile) {
            debug!("Inference reply had no container build file, using template");
            bundle.insert(
                ArtifactKind::ContainerBuildFile,
                templates::container_build_file(descriptor),
            );
            note.get_or_insert_with(|| "container build file taken from template".to_string());
        }

        bundle.insert(
            ArtifactKind::InfraVariables,
            render_tfvars(descriptor, analysis_id, image_tag),
        );

        let mut fixups_applied = Vec::new();
        if let Some(text) = bundle.container_build_file() {
            let ctx = FixupContext { descriptor, files };
            let report = fixups::apply_all(text, &ctx);
            if !report.applied.is_empty() {
                info!(rules = ?report.applied, "Applied container build file fix-ups");
            }
            fixups_applied = report.applied;
            bundle.insert(ArtifactKind::ContainerBuildFile, report.text);
        }

        GeneratedArtifacts {
            bundle,
            source,
            note,
            fixups_applied,
        }
    }

    async fn infer(
        &self,
        descriptor: &ProjectDescriptor,
        readme: Option<&str>,
        files: &[String],
    ) -> Result<ArtifactBundle, GenerationServiceError> {
        let request = LLMRequest::instructed(SYSTEM_PROMPT, self.build_prompt(descriptor, readme, files))
            .with_temperature(0.3);
        let response = self.llm.chat(request).await?;

        if response.content.trim().is_empty() {
            return Err(GenerationServiceError::EmptyReply);
        }

        let bundle = parse_sections(&response.content);
        debug!(
            kinds = ?bundle.kinds(),
            response_ms = response.response_time.as_millis(),
            "Parsed generated artifacts"
        );
        Ok(bundle)
    }

    fn build_prompt(
        &self,
        descriptor: &ProjectDescriptor,
        readme: Option<&str>,
        files: &[String],
    ) -> String {
        let files: Vec<&str> = files.iter().take(self.max_paths).map(String::as_str).collect();
        let readme = readme
            .map(|r| crate::analysis::truncate_bytes(r, self.max_readme_bytes))
            .unwrap_or("No README available");
        let descriptor_json =
            serde_json::to_string_pretty(descriptor).unwrap_or_else(|_| descriptor.primary_language.clone());

        format!(
            "Generate deployment files for this project.\n\n\
             # Project Analysis\n```json\n{descriptor_json}\n```\n\n\
             # File Structure\n```\n{files}\n```\n\n\
             # README\n```\n{readme}\n```\n\n\
             The application listens on port {port} and needs {cpu} CPU units and {memory} MiB.\n\n\
             Reply with these sections, each starting on its own line:\n\
             ---DOCKERFILE---\n(multi-stage Dockerfile with a HEALTHCHECK)\n\
             ---TERRAFORM---\n(ECS Fargate task definition and service)\n\
             ---APPSPEC---\n(CodeDeploy appspec.yaml)\n\
             ---BUILDSPEC---\n(CodeBuild buildspec.yaml)\n\
             ---RECOMMENDATIONS---\n(deployment recommendations in markdown)\n",
            files = files.join("\n"),
            port = descriptor.listen_port,
            cpu = descriptor.resource_tier.cpu_units(),
            memory = descriptor.resource_tier.memory_mib(),
        )
    }
}
