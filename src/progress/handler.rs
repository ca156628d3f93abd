//! Progress handler trait and events

use std::time::Duration;

/// Events emitted while a run advances through its steps
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    RunStarted {
        run_id: String,
        repository: String,
        git_ref: String,
    },

    StepStarted {
        run_id: String,
        step_index: u32,
        label: String,
    },

    /// A step returned; `warning` marks a degraded but non-fatal outcome
    StepFinished {
        run_id: String,
        step_index: u32,
        label: String,
        duration: Duration,
        warning: bool,
    },

    /// Intermediate note from a long-running step (rollout polling, health probes)
    StepNote {
        run_id: String,
        label: String,
        message: String,
    },

    RunCompleted {
        run_id: String,
        total_time: Duration,
    },

    RunFailed {
        run_id: String,
        step_label: String,
        error: String,
    },
}

pub trait ProgressHandler: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
