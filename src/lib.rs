//! deploybox - AI-assisted deployment pipeline
//!
//! Takes a repository reference and a git ref, classifies the project, emits
//! deployment artifacts, builds and publishes a container image, rolls the
//! new image out to a running service and checks that it answers.
//!
//! # Core Concepts
//!
//! - **Pipeline**: seven ordered steps (Fetch, Analyze, Generate Artifacts,
//!   Build, Publish, Update Release, Verify Health) run by the
//!   [`PipelineOrchestrator`]
//! - **Project Descriptor**: the classification produced by the Analyze step,
//!   from the descriptor cache, inference, or the rule-based fallback
//! - **Execution Log**: append-only, ordered record of every step transition
//!   for a run
//!
//! # Example Usage
//!
//! ```ignore
//! use deploybox::{Collaborators, DeployboxConfig, PipelineConfig, PipelineOrchestrator};
//! use deploybox::pipeline::RunOptions;
//! use deploybox::source::SourceReference;
//!
//! async fn deploy() -> anyhow::Result<()> {
//!     let config = DeployboxConfig::default();
//!     let pipeline = PipelineConfig::from_config(&config)?;
//!     let deps = Collaborators::from_config(&config, &pipeline)?;
//!
//!     let result = PipelineOrchestrator::new(deps, pipeline)
//!         .run(SourceReference::new("acme/shop", "main"), RunOptions::new())
//!         .await;
//!
//!     println!("{}: {:?}", result.run_id, result.final_status);
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod artifacts;
pub mod cli;
pub mod config;
pub mod container;
pub mod execution_log;
pub mod health;
pub mod llm;
pub mod pipeline;
pub mod progress;
pub mod release;
pub mod source;
pub mod util;

pub use analysis::{AnalysisOutcome, DescriptorSource, ProjectAnalyzer, ProjectDescriptor};
pub use artifacts::{ArtifactBundle, ArtifactGenerator, ArtifactKind};
pub use config::{ConfigError, DeployboxConfig};
pub use execution_log::{ExecutionLog, LogSink, StepRecord, StepStatus};
pub use llm::{BackendError, LLMClient};
pub use pipeline::{Collaborators, PipelineConfig, PipelineOrchestrator, PipelineResult};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
