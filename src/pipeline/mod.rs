//! Deployment pipeline
//!
//! Fetch, Analyze, Generate Artifacts, Build, Publish, Update Release and
//! Verify Health, run in that order by the [`PipelineOrchestrator`] against
//! an explicit [`Collaborators`] registry.

pub mod collaborators;
pub mod config;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod step;
pub mod steps;
pub mod types;

pub use collaborators::Collaborators;
pub use config::PipelineConfig;
pub use context::{RunContext, RunOptions};
pub use error::StepError;
pub use orchestrator::PipelineOrchestrator;
pub use step::{DeployStep, StepOutcome};
pub use types::{
    ErrorKind, FinalStatus, LogReference, PipelineResult, Recommendation, RunError, RunIdentity,
};
