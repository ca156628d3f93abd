use super::descriptor::{KnownDeployment, ProjectDescriptor};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Number of leading revision characters that must agree for a cache hit
pub const REVISION_PREFIX_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cache lock poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Canonical repository identity
    pub repository: String,
    pub revision: String,
    pub run_id: String,
    pub descriptor: ProjectDescriptor,
    pub stored_at: DateTime<Utc>,
}

/// True when both revisions have at least [`REVISION_PREFIX_LEN`] characters
/// and agree on all of them
pub fn revision_prefix_matches(a: &str, b: &str) -> bool {
    let (Some(pa), Some(pb)) = (a.get(..REVISION_PREFIX_LEN), b.get(..REVISION_PREFIX_LEN)) else {
        return false;
    };
    pa == pb
}

/// True when `newer` would answer every lookup `older` answers
fn supersedes(newer: &CacheEntry, older: &CacheEntry) -> bool {
    newer.repository == older.repository
        && (newer.revision == older.revision || revision_prefix_matches(&newer.revision, &older.revision))
}

/// Shared store of previously computed descriptors
///
/// Implementors provide raw entry access; matching and the known-deployment
/// projection are shared.
pub trait DescriptorCache: Send + Sync {
    fn entries(&self) -> Result<Vec<CacheEntry>, CacheError>;

    fn store(&self, entry: CacheEntry) -> Result<(), CacheError>;

    /// Newest entry for `repository` whose revision shares the prefix
    fn lookup(&self, repository: &str, revision: &str) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| e.repository == repository && revision_prefix_matches(&e.revision, revision))
            .max_by_key(|e| e.stored_at))
    }

    /// Latest descriptor per repository, excluding `exclude`
    fn known_deployments(&self, exclude: &str) -> Result<Vec<KnownDeployment>, CacheError> {
        let mut latest: HashMap<String, CacheEntry> = HashMap::new();
        for entry in self.entries()? {
            if entry.repository == exclude {
                continue;
            }
            match latest.get(&entry.repository) {
                Some(existing) if existing.stored_at >= entry.stored_at => {}
                _ => {
                    latest.insert(entry.repository.clone(), entry);
                }
            }
        }

        let mut known: Vec<KnownDeployment> = latest
            .into_values()
            .map(|e| KnownDeployment {
                repository: e.repository,
                primary_language: e.descriptor.primary_language,
                primary_framework: e.descriptor.primary_framework,
                listen_port: e.descriptor.listen_port,
                resource_tier: e.descriptor.resource_tier,
            })
            .collect();
        known.sort_by(|a, b| a.repository.cmp(&b.repository));
        Ok(known)
    }
}

/// JSON file holding one entry per repository and revision prefix,
/// rewritten atomically on store
#[derive(Debug)]
pub struct FileDescriptorCache {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileDescriptorCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<Vec<CacheEntry>, CacheError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(CacheError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|source| CacheError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }
}

impl DescriptorCache for FileDescriptorCache {
    fn entries(&self) -> Result<Vec<CacheEntry>, CacheError> {
        let _guard = self.lock.lock().map_err(|_| CacheError::Poisoned)?;
        self.read_entries()
    }

    fn store(&self, entry: CacheEntry) -> Result<(), CacheError> {
        let _guard = self.lock.lock().map_err(|_| CacheError::Poisoned)?;
        let mut entries = self.read_entries()?;
        entries.retain(|existing| !supersedes(&entry, existing));
        entries.push(entry);

        let io_err = |source| CacheError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(&entries).map_err(|source| CacheError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryDescriptorCache {
    entries: Mutex<Vec<CacheEntry>>,
}

impl MemoryDescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<CacheEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DescriptorCache for MemoryDescriptorCache {
    fn entries(&self) -> Result<Vec<CacheEntry>, CacheError> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .map_err(|_| CacheError::Poisoned)
    }

    fn store(&self, entry: CacheEntry) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        entries.retain(|existing| !supersedes(&entry, existing));
        entries.push(entry);
        Ok(())
    }
}
