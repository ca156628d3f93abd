use super::cache::{CacheEntry, DescriptorCache};
use super::descriptor::{
    AnalysisOutcome, Confidence, DatabaseKind, DescriptorSource, KnownDeployment,
    ProjectDescriptor, ResourceTier,
};
use super::fallback;
use super::snapshot::ProjectSnapshot;
use crate::llm::extract::extract_json_from_markdown;
use crate::llm::{BackendError, LLMClient, LLMRequest};
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

const SYSTEM_PROMPT: &str = "You are an expert software architect and DevOps engineer. \
Analyze a code repository from its file structure and README and determine its primary \
language, framework, package managers, runtime, the port it listens on, database needs and \
deployment complexity. Return your analysis as a single JSON object.";

const RESPONSE_SCHEMA: &str = r#"Return a JSON object with this structure:
{
  "primary_language": "main language",
  "primary_framework": "main framework or null",
  "package_managers": ["package managers"],
  "runtime": "recommended runtime with version (e.g. 'Python 3.11', 'Node.js 20')",
  "app_port": 8000,
  "database_type": "postgres | mysql | mongodb | redis | none",
  "deployment_complexity": "simple | moderate | complex",
  "confidence": "high | medium | low"
}

Only return the JSON object, nothing else."#;

/// Reasons an inference reply could not be used; always recovered by fallback
#[derive(Debug, Error)]
pub enum AnalysisServiceError {
    #[error("inference service error: {0}")]
    Backend(#[from] BackendError),

    #[error("unusable inference reply: {0}")]
    Unusable(String),
}

/// Shape accepted from the inference service; every field is optional so
/// validation can decide what is fatal
#[derive(Debug, Deserialize)]
struct WireDescriptor {
    primary_language: Option<String>,
    primary_framework: Option<serde_json::Value>,
    runtime: Option<String>,
    app_port: Option<serde_json::Value>,
    deployment_complexity: Option<String>,
    database_type: Option<String>,
    #[serde(default)]
    package_managers: Vec<String>,
    confidence: Option<String>,
}

fn parse_port(value: &serde_json::Value) -> Option<u16> {
    let port = match value {
        serde_json::Value::Number(n) => n.as_u64()?,
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    u16::try_from(port).ok().filter(|p| *p > 0)
}

/// Converts a reply into a descriptor; `None`-like problems become errors
pub(crate) fn parse_descriptor(reply: &str) -> Result<ProjectDescriptor, AnalysisServiceError> {
    let json = extract_json_from_markdown(reply);
    let wire: WireDescriptor = serde_json::from_str(json)
        .map_err(|e| AnalysisServiceError::Unusable(format!("invalid JSON: {}", e)))?;

    let primary_language = wire
        .primary_language
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty() && !l.eq_ignore_ascii_case("unknown"))
        .ok_or_else(|| AnalysisServiceError::Unusable("missing primary_language".to_string()))?;

    let listen_port = wire
        .app_port
        .as_ref()
        .and_then(parse_port)
        .ok_or_else(|| AnalysisServiceError::Unusable("missing or invalid app_port".to_string()))?;

    let primary_framework = match wire.primary_framework {
        Some(serde_json::Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() || s.eq_ignore_ascii_case("none") || s.eq_ignore_ascii_case("null") {
                None
            } else {
                Some(s.to_string())
            }
        }
        _ => None,
    };

    let runtime_label = wire
        .runtime
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| primary_language.clone());

    Ok(ProjectDescriptor {
        primary_language,
        primary_framework,
        runtime_label,
        listen_port,
        resource_tier: wire
            .deployment_complexity
            .as_deref()
            .and_then(ResourceTier::from_label)
            .unwrap_or(ResourceTier::Medium),
        database_requirement: wire.database_type.as_deref().and_then(DatabaseKind::from_label),
        confidence: wire
            .confidence
            .as_deref()
            .and_then(Confidence::from_label)
            .unwrap_or(Confidence::Medium),
        package_managers: wire.package_managers,
    })
}

pub struct ProjectAnalyzer {
    llm: Arc<dyn LLMClient>,
    cache: Arc<dyn DescriptorCache>,
    max_paths: usize,
    max_readme_bytes: usize,
}

impl ProjectAnalyzer {
    pub fn new(llm: Arc<dyn LLMClient>, cache: Arc<dyn DescriptorCache>) -> Self {
        Self {
            llm,
            cache,
            max_paths: 100,
            max_readme_bytes: 3000,
        }
    }

    pub fn with_bounds(mut self, max_paths: usize, max_readme_bytes: usize) -> Self {
        self.max_paths = max_paths;
        self.max_readme_bytes = max_readme_bytes;
        self
    }

    pub fn max_readme_bytes(&self) -> usize {
        self.max_readme_bytes
    }

    /// Deployments on the platform other than `repository`; empty if the
    /// cache cannot be read
    pub fn known_deployments(&self, repository: &str) -> Vec<KnownDeployment> {
        match self.cache.known_deployments(repository) {
            Ok(known) => known,
            Err(e) => {
                warn!(error = %e, "Failed to read known deployments");
                Vec::new()
            }
        }
    }

    /// Classifies a project; never fails.
    ///
    /// Order: cache hit, then inference, then the rule-based detector. Only
    /// inference results are written back to the cache.
    pub async fn analyze(
        &self,
        repository: &str,
        revision: &str,
        run_id: &str,
        snapshot: &ProjectSnapshot,
        known: &[KnownDeployment],
    ) -> AnalysisOutcome {
        match self.cache.lookup(repository, revision) {
            Ok(Some(hit)) => {
                info!(
                    repository,
                    revision,
                    cached_revision = %hit.revision,
                    "Reusing cached project descriptor"
                );
                return AnalysisOutcome {
                    descriptor: hit.descriptor,
                    source: DescriptorSource::Cache,
                    note: Some(format!("cache hit from run {} ({})", hit.run_id, hit.revision)),
                };
            }
            Ok(None) => debug!(repository, revision, "Descriptor cache miss"),
            Err(e) => warn!(error = %e, "Descriptor cache lookup failed"),
        }

        match self.infer(snapshot, known).await {
            Ok(descriptor) => {
                let entry = CacheEntry {
                    repository: repository.to_string(),
                    revision: revision.to_string(),
                    run_id: run_id.to_string(),
                    descriptor: descriptor.clone(),
                    stored_at: Utc::now(),
                };
                if let Err(e) = self.cache.store(entry) {
                    warn!(error = %e, "Failed to cache project descriptor");
                }
                AnalysisOutcome {
                    descriptor,
                    source: DescriptorSource::Inference,
                    note: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "Project analysis falling back to file detection");
                let claimed: HashSet<u16> = known.iter().map(|k| k.listen_port).collect();
                AnalysisOutcome {
                    descriptor: fallback::detect(&snapshot.files, &claimed),
                    source: DescriptorSource::Fallback,
                    note: Some(e.to_string()),
                }
            }
        }
    }

    async fn infer(
        &self,
        snapshot: &ProjectSnapshot,
        known: &[KnownDeployment],
    ) -> Result<ProjectDescriptor, AnalysisServiceError> {
        let request = LLMRequest::instructed(SYSTEM_PROMPT, self.build_prompt(snapshot, known))
            .with_temperature(0.3)
            .with_json_mode();

        let response = self.llm.chat(request).await?;
        let descriptor = parse_descriptor(&response.content)?;

        debug!(
            language = %descriptor.primary_language,
            port = descriptor.listen_port,
            confidence = descriptor.confidence.as_str(),
            response_ms = response.response_time.as_millis(),
            "Inference classified project"
        );
        Ok(descriptor)
    }

    fn build_prompt(&self, snapshot: &ProjectSnapshot, known: &[KnownDeployment]) -> String {
        let files: Vec<&str> = snapshot
            .files
            .iter()
            .take(self.max_paths)
            .map(String::as_str)
            .collect();
        let readme = snapshot
            .readme_excerpt(self.max_readme_bytes)
            .unwrap_or("No README available");

        let mut prompt = format!(
            "Analyze this repository and provide detailed project information.\n\n\
             # File Structure\n```\n{}\n```\n\n# README Content\n```\n{}\n```\n",
            files.join("\n"),
            readme
        );

        if !known.is_empty() {
            prompt.push_str("\n# Existing Deployments\n");
            prompt.push_str("The following services are already deployed. You MUST avoid port conflicts:\n\n");
            let mut used: Vec<u16> = known.iter().map(|k| k.listen_port).collect();
            used.sort_unstable();
            used.dedup();
            for k in known {
                let _ = writeln!(
                    prompt,
                    "- Repository: {}\n  Language: {}, Framework: {}\n  Port: {}, Tier: {}\n",
                    k.repository,
                    k.primary_language,
                    k.primary_framework.as_deref().unwrap_or("none"),
                    k.listen_port,
                    k.resource_tier
                );
            }
            let ports: Vec<String> = used.iter().map(u16::to_string).collect();
            let _ = writeln!(prompt, "Used ports: [{}]", ports.join(", "));
            prompt.push_str("Select a port that is NOT in the used ports list.\n");
        }

        prompt.push('\n');
        prompt.push_str(RESPONSE_SCHEMA);
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::MemoryDescriptorCache;
    use crate::llm::{MockLLMClient, MockResponse};

    const FASTAPI_REPLY: &str = r#"{
        "primary_language": "Python",
        "primary_framework": "FastAPI",
        "runtime": "Python 3.11",
        "app_port": 8000,
        "deployment_complexity": "simple",
        "database_type": "postgres",
        "package_managers": ["pip"],
        "confidence": "high"
    }"#;

    fn snapshot() -> ProjectSnapshot {
        ProjectSnapshot::new(
            vec!["main.py".to_string(), "requirements.txt".to_string()],
            Some("# Widget API".to_string()),
        )
    }

    #[test]
    fn test_parse_descriptor_full() {
        let d = parse_descriptor(FASTAPI_REPLY).unwrap();
        assert_eq!(d.primary_language, "Python");
        assert_eq!(d.primary_framework.as_deref(), Some("FastAPI"));
        assert_eq!(d.listen_port, 8000);
        assert_eq!(d.resource_tier, ResourceTier::Small);
        assert_eq!(d.database_requirement, Some(DatabaseKind::Postgres));
        assert_eq!(d.confidence, Confidence::High);
    }

    #[test]
    fn test_parse_descriptor_fenced_and_string_port() {
        let reply = "```json\n{\"primary_language\": \"Go\", \"app_port\": \"9090\", \"primary_framework\": null}\n```";
        let d = parse_descriptor(reply).unwrap();
        assert_eq!(d.listen_port, 9090);
        assert!(d.primary_framework.is_none());
        assert_eq!(d.runtime_label, "Go");
        assert_eq!(d.confidence, Confidence::Medium);
        assert_eq!(d.resource_tier, ResourceTier::Medium);
    }

    #[test]
    fn test_parse_descriptor_rejects_bad_port() {
        for port in ["0", "70000", "\"http\""] {
            let reply = format!("{{\"primary_language\": \"Go\", \"app_port\": {}}}", port);
            assert!(parse_descriptor(&reply).is_err(), "port {} accepted", port);
        }
    }

    #[test]
    fn test_parse_descriptor_rejects_prose() {
        assert!(matches!(
            parse_descriptor("I think this is a Python project."),
            Err(AnalysisServiceError::Unusable(_))
        ));
    }

    #[tokio::test]
    async fn test_analyze_uses_inference_and_caches() {
        let llm = Arc::new(MockLLMClient::new());
        llm.add_response(MockResponse::text(FASTAPI_REPLY));
        let cache = Arc::new(MemoryDescriptorCache::new());
        let analyzer = ProjectAnalyzer::new(llm.clone(), cache.clone());

        let outcome = analyzer
            .analyze("acme/widget", "deadbeef123", "run-1", &snapshot(), &[])
            .await;

        assert_eq!(outcome.source, DescriptorSource::Inference);
        assert_eq!(llm.call_count(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_analyze_falls_back_without_caching() {
        let llm = Arc::new(MockLLMClient::new());
        llm.add_response(MockResponse::text("not json at all"));
        let cache = Arc::new(MemoryDescriptorCache::new());
        let analyzer = ProjectAnalyzer::new(llm, cache.clone());

        let outcome = analyzer
            .analyze("acme/widget", "deadbeef123", "run-1", &snapshot(), &[])
            .await;

        assert_eq!(outcome.source, DescriptorSource::Fallback);
        assert_eq!(outcome.descriptor.primary_language, "Python");
        assert_eq!(outcome.descriptor.confidence, Confidence::Low);
        assert!(outcome.note.is_some());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_analyze_backend_error_falls_back() {
        let llm = Arc::new(MockLLMClient::new());
        llm.add_response(MockResponse::error(BackendError::TimeoutError { seconds: 900 }));
        let analyzer = ProjectAnalyzer::new(llm, Arc::new(MemoryDescriptorCache::new()));

        let outcome = analyzer
            .analyze("acme/widget", "abcdef0", "run-1", &snapshot(), &[])
            .await;
        assert_eq!(outcome.source, DescriptorSource::Fallback);
    }

    #[tokio::test]
    async fn test_fallback_sees_manifest_beyond_prompt_bound() {
        let llm = Arc::new(MockLLMClient::new());
        llm.add_response(MockResponse::text("not json at all"));
        let analyzer = ProjectAnalyzer::new(llm, Arc::new(MemoryDescriptorCache::new())).with_bounds(100, 3000);

        let mut files: Vec<String> = (0..120).map(|i| format!("assets/icon{:03}.svg", i)).collect();
        files.push("requirements.txt".to_string());
        files.push("server.py".to_string());
        let snapshot = ProjectSnapshot::new(files, None);

        let outcome = analyzer
            .analyze("acme/widget", "deadbeef123", "run-1", &snapshot, &[])
            .await;
        assert_eq!(outcome.source, DescriptorSource::Fallback);
        assert_eq!(outcome.descriptor.primary_language, "Python");
        assert!(!analyzer.build_prompt(&snapshot, &[]).contains("requirements.txt"));
    }

    #[test]
    fn test_prompt_lists_used_ports_and_bounds_files() {
        let analyzer = ProjectAnalyzer::new(
            Arc::new(MockLLMClient::new()),
            Arc::new(MemoryDescriptorCache::new()),
        )
        .with_bounds(2, 5);
        let snapshot = ProjectSnapshot::new(
            vec!["a.py".to_string(), "b.py".to_string(), "c.py".to_string()],
            Some("0123456789".to_string()),
        );
        let known = vec![KnownDeployment {
            repository: "acme/gadget".to_string(),
            primary_language: "Go".to_string(),
            primary_framework: None,
            listen_port: 8080,
            resource_tier: ResourceTier::Small,
        }];

        let prompt = analyzer.build_prompt(&snapshot, &known);
        assert!(prompt.contains("b.py"));
        assert!(!prompt.contains("c.py"));
        assert!(prompt.contains("01234\n"));
        assert!(!prompt.contains("012345"));
        assert!(prompt.contains("Used ports: [8080]"));
    }
}
