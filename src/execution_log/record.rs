use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Started,
    Succeeded,
    Failed,
    /// Step completed in a degraded way that does not fail the run
    Warning,
    /// Informational note, e.g. rollout progress or cleanup
    Info,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Started => "started",
            StepStatus::Succeeded => "succeeded",
            StepStatus::Failed => "failed",
            StepStatus::Warning => "warning",
            StepStatus::Info => "info",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub run_id: String,
    /// Position in the run's log, starting at 1
    pub sequence: u64,
    pub step_index: u32,
    pub label: String,
    pub status: StepStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&StepStatus::Succeeded).unwrap(),
            "\"succeeded\""
        );
        let parsed: StepStatus = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(parsed, StepStatus::Warning);
    }
}
