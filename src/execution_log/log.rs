use super::record::{StepRecord, StepStatus};
use super::sink::LogSink;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// Ordered, append-only record of one run
///
/// Each append is written through to the sink immediately. A sink failure is
/// reported through tracing and the record is still kept in memory, so the
/// run itself never fails because its log store is unavailable.
///
/// Reopening a run id that already has records continues its numbering, so
/// `(run_id, sequence)` stays unique in the sink.
pub struct ExecutionLog {
    run_id: String,
    sink: Arc<dyn LogSink>,
    /// Highest sequence already in the sink when this log was opened
    base_sequence: u64,
    records: Vec<StepRecord>,
    persist_failures: usize,
}

impl ExecutionLog {
    pub fn new(run_id: impl Into<String>, sink: Arc<dyn LogSink>) -> Self {
        let run_id = run_id.into();
        let base_sequence = sink
            .read(&run_id)
            .ok()
            .and_then(|existing| existing.iter().map(|r| r.sequence).max())
            .unwrap_or(0);
        if base_sequence > 0 {
            info!(run_id = %run_id, base_sequence, "Continuing existing execution log");
        }

        Self {
            run_id,
            sink,
            base_sequence,
            records: Vec::new(),
            persist_failures: 0,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn append(
        &mut self,
        step_index: u32,
        label: &str,
        status: StepStatus,
        message: impl Into<String>,
    ) -> &StepRecord {
        let record = StepRecord {
            run_id: self.run_id.clone(),
            sequence: self.last_sequence() + 1,
            step_index,
            label: label.to_string(),
            status,
            message: message.into(),
            timestamp: Utc::now(),
        };

        if let Err(e) = self.sink.append(&record) {
            self.persist_failures += 1;
            warn!(
                run_id = %self.run_id,
                sequence = record.sequence,
                error = %e,
                "Failed to persist execution log record"
            );
        }

        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&StepRecord> {
        self.records.last()
    }

    pub fn last_sequence(&self) -> u64 {
        self.base_sequence + self.records.len() as u64
    }

    pub fn location(&self) -> String {
        self.sink.location(&self.run_id)
    }

    /// Number of records the sink refused; they exist only in memory
    pub fn persist_failures(&self) -> usize {
        self.persist_failures
    }
}

impl std::fmt::Debug for ExecutionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionLog")
            .field("run_id", &self.run_id)
            .field("records", &self.records.len())
            .finish()
    }
}
