//! Shared fakes for pipeline integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use deploybox::analysis::{CacheEntry, MemoryDescriptorCache, ProjectAnalyzer};
use deploybox::artifacts::{ArtifactGenerator, ArtifactStore};
use deploybox::container::{BuildError, ImageBuilder, ImagePublisher, ImageRef, PublishError};
use deploybox::execution_log::MemoryLogSink;
use deploybox::health::{HealthProbe, ProbeError};
use deploybox::llm::{MockLLMClient, MockResponse};
use deploybox::pipeline::{Collaborators, PipelineConfig};
use deploybox::progress::NoOpHandler;
use deploybox::release::{ReleaseError, ReleaseTarget, ServiceCounts};
use deploybox::source::{CheckoutHandle, FetchError, SourceFetcher, SourceReference};
use deploybox::util::CommandError;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const FASTAPI_REPLY: &str = r#"{
    "primary_language": "Python",
    "primary_framework": "FastAPI",
    "runtime": "Python 3.11",
    "app_port": 8000,
    "deployment_complexity": "simple",
    "database_type": "none",
    "package_managers": ["pip"],
    "confidence": "high"
}"#;

pub fn python_files() -> Vec<String> {
    vec!["main.py".to_string(), "requirements.txt".to_string()]
}

/// Hands out a fixed checkout path; never touches git
#[derive(Default)]
pub struct FakeFetcher {
    pub fail: bool,
    pub fetches: Mutex<Vec<SourceReference>>,
    pub cleanups: Mutex<Vec<Option<PathBuf>>>,
}

impl FakeFetcher {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn cleanup_calls(&self) -> Vec<Option<PathBuf>> {
        self.cleanups.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceFetcher for FakeFetcher {
    async fn fetch(&self, source: &SourceReference) -> Result<CheckoutHandle, FetchError> {
        self.fetches.lock().unwrap().push(source.clone());
        if self.fail {
            return Err(FetchError::RefNotFound {
                repository: source.repository.clone(),
                git_ref: source.git_ref.clone(),
            });
        }
        Ok(CheckoutHandle::new(
            std::env::temp_dir().join("deploybox-fake-checkout"),
            source.git_ref.clone(),
        ))
    }

    async fn cleanup(&self, handle: Option<&CheckoutHandle>) -> Result<(), FetchError> {
        self.cleanups
            .lock()
            .unwrap()
            .push(handle.map(|h| h.root.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeBuilder {
    pub fail: bool,
    pub build_files: Mutex<Vec<String>>,
}

impl FakeBuilder {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl ImageBuilder for FakeBuilder {
    async fn build(
        &self,
        _checkout: &CheckoutHandle,
        build_file: &str,
        _image: &ImageRef,
    ) -> Result<(), BuildError> {
        self.build_files.lock().unwrap().push(build_file.to_string());
        if self.fail {
            return Err(BuildError::Command(CommandError::NonZeroExit {
                program: "docker".to_string(),
                code: Some(1),
                stderr: "failed to solve: pip install exited 1".to_string(),
            }));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakePublisher {
    pub fail: bool,
    pub pushed: Mutex<Vec<String>>,
}

impl FakePublisher {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl ImagePublisher for FakePublisher {
    async fn publish(&self, image: &ImageRef) -> Result<(), PublishError> {
        if self.fail {
            return Err(PublishError::Push(CommandError::NonZeroExit {
                program: "docker".to_string(),
                code: Some(1),
                stderr: "denied: repository does not exist".to_string(),
            }));
        }
        self.pushed.lock().unwrap().push(image.to_string());
        Ok(())
    }
}

/// One-container service that is stable as soon as it is activated
pub struct FakeReleaseTarget {
    /// Service lookup fails as if the service had been deleted
    pub missing_service: bool,
    pub current: Value,
    pub registered: Mutex<Vec<Value>>,
    pub activated: Mutex<Vec<String>>,
}

impl Default for FakeReleaseTarget {
    fn default() -> Self {
        Self {
            missing_service: false,
            current: json!({
                "taskDefinitionArn": "arn:aws:ecs:us-east-1:123:task-definition/app:4",
                "revision": 4,
                "status": "ACTIVE",
                "family": "app",
                "cpu": "256",
                "memory": "512",
                "containerDefinitions": [
                    { "name": "app", "image": "old/app:previous", "essential": true }
                ]
            }),
            registered: Mutex::new(Vec::new()),
            activated: Mutex::new(Vec::new()),
        }
    }
}

impl FakeReleaseTarget {
    pub fn missing_service() -> Self {
        Self {
            missing_service: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl ReleaseTarget for FakeReleaseTarget {
    async fn current_definition(&self) -> Result<Value, ReleaseError> {
        if self.missing_service {
            return Err(ReleaseError::ServiceNotFound {
                cluster: "apps".to_string(),
                service: "widget".to_string(),
            });
        }
        Ok(self.current.clone())
    }

    async fn register_definition(&self, definition: &Value) -> Result<String, ReleaseError> {
        let mut registered = self.registered.lock().unwrap();
        registered.push(definition.clone());
        Ok(format!(
            "arn:aws:ecs:us-east-1:123:task-definition/app:{}",
            4 + registered.len()
        ))
    }

    async fn activate(&self, definition_id: &str) -> Result<(), ReleaseError> {
        self.activated.lock().unwrap().push(definition_id.to_string());
        Ok(())
    }

    async fn counts(&self) -> Result<ServiceCounts, ReleaseError> {
        Ok(ServiceCounts {
            running: 1,
            desired: 1,
        })
    }
}

/// Replays status codes in order, then keeps returning the last one
pub struct ScriptedProbe {
    statuses: Mutex<VecDeque<u16>>,
    last: Mutex<u16>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedProbe {
    pub fn new(statuses: &[u16]) -> Self {
        Self {
            statuses: Mutex::new(statuses.iter().copied().collect()),
            last: Mutex::new(statuses.last().copied().unwrap_or(503)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn healthy() -> Self {
        Self::new(&[200])
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl HealthProbe for ScriptedProbe {
    async fn probe(&self, endpoint: &str) -> Result<u16, ProbeError> {
        self.calls.lock().unwrap().push(endpoint.to_string());
        let next = self.statuses.lock().unwrap().pop_front();
        match next {
            Some(status) => Ok(status),
            None => Ok(*self.last.lock().unwrap()),
        }
    }
}

/// Fakes wired into a [`Collaborators`] plus handles to inspect them
pub struct Harness {
    pub llm: Arc<MockLLMClient>,
    pub cache: Arc<MemoryDescriptorCache>,
    pub fetcher: Arc<FakeFetcher>,
    pub builder: Arc<FakeBuilder>,
    pub publisher: Arc<FakePublisher>,
    pub release: Arc<FakeReleaseTarget>,
    pub probe: Arc<ScriptedProbe>,
    pub log: Arc<MemoryLogSink>,
    pub state: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            llm: Arc::new(MockLLMClient::new()),
            cache: Arc::new(MemoryDescriptorCache::new()),
            fetcher: Arc::new(FakeFetcher::default()),
            builder: Arc::new(FakeBuilder::default()),
            publisher: Arc::new(FakePublisher::default()),
            release: Arc::new(FakeReleaseTarget::default()),
            probe: Arc::new(ScriptedProbe::healthy()),
            log: Arc::new(MemoryLogSink::new()),
            state: TempDir::new().unwrap(),
        }
    }

    pub fn with_cache(mut self, entries: Vec<CacheEntry>) -> Self {
        self.cache = Arc::new(MemoryDescriptorCache::with_entries(entries));
        self
    }

    pub fn with_fetcher(mut self, fetcher: FakeFetcher) -> Self {
        self.fetcher = Arc::new(fetcher);
        self
    }

    pub fn with_builder(mut self, builder: FakeBuilder) -> Self {
        self.builder = Arc::new(builder);
        self
    }

    pub fn with_publisher(mut self, publisher: FakePublisher) -> Self {
        self.publisher = Arc::new(publisher);
        self
    }

    pub fn with_release(mut self, release: FakeReleaseTarget) -> Self {
        self.release = Arc::new(release);
        self
    }

    pub fn with_probe(mut self, probe: ScriptedProbe) -> Self {
        self.probe = Arc::new(probe);
        self
    }

    pub fn respond(&self, replies: &[&str]) {
        self.llm
            .add_responses(replies.iter().map(|r| MockResponse::text(*r)));
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.state.path().join("artifacts")
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            fetcher: self.fetcher.clone(),
            analyzer: Arc::new(ProjectAnalyzer::new(self.llm.clone(), self.cache.clone())),
            generator: Arc::new(ArtifactGenerator::new(self.llm.clone())),
            artifact_store: ArtifactStore::new(self.artifacts_dir()),
            builder: self.builder.clone(),
            publisher: self.publisher.clone(),
            release_target: self.release.clone(),
            health_probe: self.probe.clone(),
            log_sink: self.log.clone(),
            progress: Arc::new(NoOpHandler),
        }
    }
}

/// Registry configured, zero poll intervals so tests never sleep
pub fn fast_config() -> PipelineConfig {
    PipelineConfig::new()
        .with_registry("123.dkr.ecr.us-east-1.amazonaws.com", "apps")
        .with_release_polling(3, Duration::ZERO)
        .with_health_polling(3, Duration::ZERO)
}
