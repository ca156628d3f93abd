//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, error, info, warn};

/// Handler that mirrors run progress into tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::RunStarted {
                run_id,
                repository,
                git_ref,
            } => {
                info!(run_id = %run_id, repository = %repository, git_ref = %git_ref, "Starting deployment");
            }
            ProgressEvent::StepStarted {
                run_id,
                step_index,
                label,
            } => {
                info!(run_id = %run_id, step = step_index, label = %label, "Starting step");
            }
            ProgressEvent::StepFinished {
                run_id,
                step_index,
                label,
                duration,
                warning,
            } => {
                if *warning {
                    warn!(
                        run_id = %run_id,
                        step = step_index,
                        label = %label,
                        duration_ms = duration.as_millis(),
                        "Step finished with warning"
                    );
                } else {
                    info!(
                        run_id = %run_id,
                        step = step_index,
                        label = %label,
                        duration_ms = duration.as_millis(),
                        "Step complete"
                    );
                }
            }
            ProgressEvent::StepNote {
                run_id,
                label,
                message,
            } => {
                debug!(run_id = %run_id, label = %label, "{}", message);
            }
            ProgressEvent::RunCompleted { run_id, total_time } => {
                info!(
                    run_id = %run_id,
                    total_time_ms = total_time.as_millis(),
                    "Deployment complete"
                );
            }
            ProgressEvent::RunFailed {
                run_id,
                step_label,
                error,
            } => {
                error!(run_id = %run_id, step = %step_label, error = %error, "Deployment failed");
            }
        }
    }
}
