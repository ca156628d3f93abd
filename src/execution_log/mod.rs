//! Per-run execution log
//!
//! Every step transition of a run is appended as a [`StepRecord`] and written
//! through to a [`LogSink`] before the orchestrator moves on, so a reader can
//! tail an in-flight run. Records are never rewritten.

mod log;
mod record;
mod sink;

pub use log::ExecutionLog;
pub use record::{StepRecord, StepStatus};
pub use sink::{JsonlLogSink, LogSink, LogSinkError, MemoryLogSink};
