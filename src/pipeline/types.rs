//! Run identity and the terminal result of a run

use crate::analysis::{Confidence, DescriptorSource, ProjectDescriptor};
use crate::artifacts::ArtifactKind;
use crate::source::SourceReference;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Immutable identity shared by every record of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunIdentity {
    pub run_id: String,
    pub source: SourceReference,
    pub started_at: DateTime<Utc>,
}

impl RunIdentity {
    pub fn new(run_id: impl Into<String>, source: SourceReference) -> Self {
        Self {
            run_id: run_id.into(),
            source,
            started_at: Utc::now(),
        }
    }

    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FinalStatus {
    Success,
    Failed,
}

impl FinalStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, FinalStatus::Success)
    }
}

impl fmt::Display for FinalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinalStatus::Success => f.write_str("success"),
            FinalStatus::Failed => f.write_str("failed"),
        }
    }
}

/// Error code carried by a failed result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    #[serde(rename = "FetchError")]
    Fetch,
    #[serde(rename = "BuildError")]
    Build,
    #[serde(rename = "PublishError")]
    Publish,
    #[serde(rename = "ReleaseError")]
    Release,
    #[serde(rename = "InternalError")]
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Fetch => "FetchError",
            ErrorKind::Build => "BuildError",
            ErrorKind::Publish => "PublishError",
            ErrorKind::Release => "ReleaseError",
            ErrorKind::Internal => "InternalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunError {
    pub kind: ErrorKind,
    pub step: String,
    pub message: String,
}

/// Where the run's execution log lives and how far it got
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogReference {
    pub location: String,
    pub last_sequence: u64,
    /// Records the sink failed to persist during this run
    pub unpersisted: usize,
    /// Taken after the last record was appended
    pub sealed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Recommendation {
    AutoApply,
    ReviewRecommended,
    ManualReview,
}

impl Recommendation {
    pub fn assess(confidence: Option<Confidence>, has_build_file: bool) -> Self {
        match confidence {
            Some(Confidence::High) if has_build_file => Recommendation::AutoApply,
            Some(Confidence::Medium) => Recommendation::ReviewRecommended,
            _ => Recommendation::ManualReview,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::AutoApply => "auto-apply",
            Recommendation::ReviewRecommended => "review-recommended",
            Recommendation::ManualReview => "manual-review",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal record of a run, produced exactly once
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub run_id: String,
    pub final_status: FinalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RunError>,
    pub artifact_locations: BTreeMap<ArtifactKind, String>,
    pub log_reference: LogReference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<ProjectDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptor_source: Option<DescriptorSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub recommendation: Recommendation,
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        self.final_status.is_success()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}
