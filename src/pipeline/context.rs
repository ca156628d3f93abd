//! Mutable state threaded through the steps of one run

use super::config::PipelineConfig;
use super::types::RunIdentity;
use crate::analysis::{AnalysisOutcome, ProjectSnapshot};
use crate::artifacts::{ArtifactKind, GeneratedArtifacts};
use crate::container::ImageRef;
use crate::progress::{ProgressEvent, ProgressHandler};
use crate::release::ReleaseReport;
use crate::source::CheckoutHandle;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Caller-supplied inputs for a run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub run_id: Option<String>,
    pub health_url: Option<String>,
    /// Precomputed file list used instead of walking the checkout
    pub files: Option<Vec<String>>,
    pub readme: Option<String>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_health_url(mut self, url: impl Into<String>) -> Self {
        self.health_url = Some(url.into());
        self
    }

    pub fn with_snapshot(mut self, files: Vec<String>, readme: Option<String>) -> Self {
        self.files = Some(files);
        self.readme = readme;
        self
    }
}

pub struct RunContext {
    pub identity: RunIdentity,
    pub options: RunOptions,
    pub config: PipelineConfig,
    progress: Arc<dyn ProgressHandler>,

    pub checkout: Option<CheckoutHandle>,
    pub snapshot: Option<ProjectSnapshot>,
    pub analysis: Option<AnalysisOutcome>,
    pub analysis_id: Option<String>,
    pub artifacts: Option<GeneratedArtifacts>,
    pub artifact_locations: BTreeMap<ArtifactKind, PathBuf>,
    pub image: Option<ImageRef>,
    pub release: Option<ReleaseReport>,
}

impl RunContext {
    pub fn new(
        identity: RunIdentity,
        options: RunOptions,
        config: PipelineConfig,
        progress: Arc<dyn ProgressHandler>,
    ) -> Self {
        Self {
            identity,
            options,
            config,
            progress,
            checkout: None,
            snapshot: None,
            analysis: None,
            analysis_id: None,
            artifacts: None,
            artifact_locations: BTreeMap::new(),
            image: None,
            release: None,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.identity.run_id
    }

    /// Callback that sends intermediate progress lines for `label`, handed
    /// to long-running collaborators
    pub fn notifier(&self, label: &'static str) -> impl FnMut(String) + Send + 'static {
        let progress = self.progress.clone();
        let run_id = self.identity.run_id.clone();
        move |message| {
            progress.on_progress(&ProgressEvent::StepNote {
                run_id: run_id.clone(),
                label: label.to_string(),
                message,
            })
        }
    }
}
