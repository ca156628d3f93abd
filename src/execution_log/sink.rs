use super::record::StepRecord;
use crate::util::path_key;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogSinkError {
    #[error("log I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed log record at {path}:{line}: {source}")]
    Malformed {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode log record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("no execution log for run {0}")]
    NotFound(String),
}

/// Durable append-only store keyed by (run_id, sequence)
pub trait LogSink: Send + Sync {
    /// Persists one record; it must be readable once this returns
    fn append(&self, record: &StepRecord) -> Result<(), LogSinkError>;

    fn read(&self, run_id: &str) -> Result<Vec<StepRecord>, LogSinkError>;

    /// Human-readable location of the run's log
    fn location(&self, run_id: &str) -> String;
}

/// One JSON-lines file per run under a directory
#[derive(Debug, Clone)]
pub struct JsonlLogSink {
    dir: PathBuf,
}

impl JsonlLogSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("{}.jsonl", path_key(run_id)))
    }
}

impl LogSink for JsonlLogSink {
    fn append(&self, record: &StepRecord) -> Result<(), LogSinkError> {
        let path = self.path_for(&record.run_id);
        let io_err = |source| LogSinkError::Io {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(|source| LogSinkError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_err)?;
        file.write_all(line.as_bytes()).map_err(io_err)?;
        file.flush().map_err(io_err)?;
        file.sync_data().map_err(io_err)?;
        Ok(())
    }

    fn read(&self, run_id: &str) -> Result<Vec<StepRecord>, LogSinkError> {
        let path = self.path_for(run_id);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LogSinkError::NotFound(run_id.to_string()))
            }
            Err(source) => return Err(LogSinkError::Io { path, source }),
        };

        let complete = content.ends_with('\n');
        let lines: Vec<&str> = content.lines().collect();
        let mut records = Vec::with_capacity(lines.len());

        for (i, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<StepRecord>(line) {
                Ok(record) => records.push(record),
                // a writer may be mid-append on the final line
                Err(_) if !complete && i + 1 == lines.len() => break,
                Err(source) => {
                    return Err(LogSinkError::Malformed {
                        path,
                        line: i + 1,
                        source,
                    })
                }
            }
        }

        Ok(records)
    }

    fn location(&self, run_id: &str) -> String {
        self.path_for(run_id).display().to_string()
    }
}

/// In-process sink for tests and offline commands
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    runs: Mutex<HashMap<String, Vec<StepRecord>>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a run's records; empty when the run is unknown
    pub fn records(&self, run_id: &str) -> Vec<StepRecord> {
        self.runs
            .lock()
            .map(|runs| runs.get(run_id).cloned().unwrap_or_default())
            .unwrap_or_default()
    }
}

impl LogSink for MemoryLogSink {
    fn append(&self, record: &StepRecord) -> Result<(), LogSinkError> {
        if let Ok(mut runs) = self.runs.lock() {
            runs.entry(record.run_id.clone())
                .or_default()
                .push(record.clone());
        }
        Ok(())
    }

    fn read(&self, run_id: &str) -> Result<Vec<StepRecord>, LogSinkError> {
        let records = self.records(run_id);
        if records.is_empty() {
            Err(LogSinkError::NotFound(run_id.to_string()))
        } else {
            Ok(records)
        }
    }

    fn location(&self, run_id: &str) -> String {
        format!("memory://{}", run_id)
    }
}
