use super::collaborators::Collaborators;
use super::config::PipelineConfig;
use super::context::{RunContext, RunOptions};
use super::step::{DeployStep, StepOutcome};
use super::steps::default_steps;
use super::types::{
    FinalStatus, LogReference, PipelineResult, Recommendation, RunError, RunIdentity,
};
use crate::execution_log::{ExecutionLog, StepStatus};
use crate::progress::ProgressEvent;
use crate::source::SourceReference;
use chrono::Utc;
use std::time::Instant;
use tracing::{debug, info, warn};

const CLEANUP_LABEL: &str = "Cleanup";

/// Runs the deployment steps strictly in sequence.
///
/// Each step gets a `started` record before it runs and exactly one of
/// `succeeded`, `warning` or `failed` after. The first failure stops the run.
/// The scratch checkout is released afterwards whatever the outcome.
pub struct PipelineOrchestrator {
    deps: Collaborators,
    config: PipelineConfig,
    steps: Vec<Box<dyn DeployStep>>,
}

impl PipelineOrchestrator {
    pub fn new(deps: Collaborators, config: PipelineConfig) -> Self {
        Self {
            deps,
            config,
            steps: default_steps(),
        }
    }

    pub fn with_steps(mut self, steps: Vec<Box<dyn DeployStep>>) -> Self {
        self.steps = steps;
        self
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.deps
    }

    pub async fn run(&self, source: SourceReference, options: RunOptions) -> PipelineResult {
        let start = Instant::now();
        let run_id = options
            .run_id
            .clone()
            .unwrap_or_else(RunIdentity::generate_id);
        let identity = RunIdentity::new(run_id.clone(), source);
        let progress = self.deps.progress.clone();

        progress.on_progress(&ProgressEvent::RunStarted {
            run_id: run_id.clone(),
            repository: identity.source.repository.clone(),
            git_ref: identity.source.git_ref.clone(),
        });

        let mut log = ExecutionLog::new(run_id.clone(), self.deps.log_sink.clone());
        let mut context = RunContext::new(identity, options, self.config.clone(), progress.clone());
        let mut failure: Option<RunError> = None;
        let mut step_index: u32 = 0;

        for step in &self.steps {
            step_index += 1;
            let label = step.label();
            log.append(step_index, label, StepStatus::Started, "");
            progress.on_progress(&ProgressEvent::StepStarted {
                run_id: run_id.clone(),
                step_index,
                label: label.to_string(),
            });

            let step_start = Instant::now();
            match step.execute(&mut context, &self.deps).await {
                Ok(outcome) => {
                    let status = match outcome {
                        StepOutcome::Succeeded(_) => StepStatus::Succeeded,
                        StepOutcome::Warning(_) => StepStatus::Warning,
                    };
                    log.append(step_index, label, status, outcome.message());
                    progress.on_progress(&ProgressEvent::StepFinished {
                        run_id: run_id.clone(),
                        step_index,
                        label: label.to_string(),
                        duration: step_start.elapsed(),
                        warning: outcome.is_warning(),
                    });
                }
                Err(e) => {
                    let message = e.to_string();
                    log.append(step_index, label, StepStatus::Failed, message.clone());
                    progress.on_progress(&ProgressEvent::RunFailed {
                        run_id: run_id.clone(),
                        step_label: label.to_string(),
                        error: message.clone(),
                    });
                    failure = Some(RunError {
                        kind: e.kind(),
                        step: label.to_string(),
                        message,
                    });
                    break;
                }
            }
        }

        self.cleanup(&context, &mut log, step_index).await;

        let final_status = if failure.is_some() {
            FinalStatus::Failed
        } else {
            FinalStatus::Success
        };
        if final_status.is_success() {
            progress.on_progress(&ProgressEvent::RunCompleted {
                run_id: run_id.clone(),
                total_time: start.elapsed(),
            });
        }

        let has_build_file = context
            .artifacts
            .as_ref()
            .map(|a| a.bundle.container_build_file().is_some())
            .unwrap_or(false);
        let recommendation = Recommendation::assess(
            context.analysis.as_ref().map(|a| a.descriptor.confidence),
            has_build_file,
        );

        let result = PipelineResult {
            run_id,
            final_status,
            error: failure,
            artifact_locations: context
                .artifact_locations
                .iter()
                .map(|(kind, path)| (*kind, path.display().to_string()))
                .collect(),
            log_reference: LogReference {
                location: log.location(),
                last_sequence: log.last_sequence(),
                unpersisted: log.persist_failures(),
                sealed_at: Utc::now(),
            },
            descriptor: context.analysis.as_ref().map(|a| a.descriptor.clone()),
            descriptor_source: context.analysis.as_ref().map(|a| a.source),
            image: context.image.as_ref().map(|i| i.to_string()),
            recommendation,
        };

        info!(
            run_id = %result.run_id,
            status = %result.final_status,
            records = result.log_reference.last_sequence,
            "Run finished"
        );
        result
    }

    /// Releases the scratch checkout; records only when there was one or
    /// removal failed
    async fn cleanup(&self, context: &RunContext, log: &mut ExecutionLog, step_index: u32) {
        let handle = context.checkout.as_ref();
        match self.deps.fetcher.cleanup(handle).await {
            Ok(()) => {
                if let Some(handle) = handle {
                    debug!(run_id = %context.run_id(), dir = %handle.root.display(), "Checkout released");
                    log.append(
                        step_index,
                        CLEANUP_LABEL,
                        StepStatus::Info,
                        format!("removed {}", handle.root.display()),
                    );
                }
            }
            Err(e) => {
                warn!(run_id = %context.run_id(), error = %e, "Cleanup failed");
                log.append(
                    step_index,
                    CLEANUP_LABEL,
                    StepStatus::Info,
                    format!("cleanup failed: {}", e),
                );
            }
        }
    }
}
