use super::bundle::{ArtifactBundle, ArtifactKind};
use crate::util::path_key;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ArtifactStoreError {
    #[error("artifact I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no artifacts stored for run {0}")]
    NotFound(String),
}

/// Durable artifact storage laid out as `<root>/<run_id>/<file name>`
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root.join(path_key(run_id))
    }

    /// Writes every artifact in the bundle and returns where each landed
    pub fn persist(
        &self,
        run_id: &str,
        bundle: &ArtifactBundle,
    ) -> Result<BTreeMap<ArtifactKind, PathBuf>, ArtifactStoreError> {
        let dir = self.run_dir(run_id);
        fs::create_dir_all(&dir).map_err(|source| ArtifactStoreError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut locations = BTreeMap::new();
        for (kind, content) in bundle.iter() {
            let path = dir.join(kind.file_name());
            fs::write(&path, content).map_err(|source| ArtifactStoreError::Io {
                path: path.clone(),
                source,
            })?;
            debug!(kind = kind.as_str(), path = %path.display(), "Stored artifact");
            locations.insert(kind, path);
        }
        Ok(locations)
    }

    /// Reads back whatever artifacts exist for the run
    pub fn load(&self, run_id: &str) -> Result<ArtifactBundle, ArtifactStoreError> {
        let dir = self.run_dir(run_id);
        if !dir.is_dir() {
            return Err(ArtifactStoreError::NotFound(run_id.to_string()));
        }

        let mut bundle = ArtifactBundle::new();
        for kind in ArtifactKind::ALL {
            let path = dir.join(kind.file_name());
            match fs::read_to_string(&path) {
                Ok(content) => bundle.insert(kind, content),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(ArtifactStoreError::Io { path, source }),
            }
        }
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_persist_and_load() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path().join("artifacts"));
        let bundle = ArtifactBundle::new()
            .with(ArtifactKind::ContainerBuildFile, "FROM python:3.11\n")
            .with(ArtifactKind::ReleaseNotes, "notes");

        let locations = store.persist("run-1", &bundle).unwrap();
        assert_eq!(locations.len(), 2);
        assert!(locations[&ArtifactKind::ContainerBuildFile].ends_with("run-1/Dockerfile"));

        let loaded = store.load("run-1").unwrap();
        assert_eq!(loaded, bundle);
    }

    #[test]
    fn test_load_missing_run() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(matches!(store.load("nope"), Err(ArtifactStoreError::NotFound(_))));
    }

    #[test]
    fn test_run_dir_is_sanitized() {
        let store = ArtifactStore::new("/state");
        let dir = store.run_dir("../etc");
        assert_eq!(dir.parent(), Some(Path::new("/state")));
        assert_ne!(dir, store.run_dir("___etc"));
    }
}
