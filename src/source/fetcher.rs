use super::reference::{CheckoutHandle, SourceReference};
use super::secrets::SecretStore;
use crate::util::process::{run_command, CommandError, CommandSpec};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid source reference {0}")]
    InvalidReference(String),

    #[error("ref {git_ref} not found in {repository}")]
    RefNotFound { repository: String, git_ref: String },

    #[error("fetch timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("git failed: {0}")]
    Command(#[from] CommandError),

    #[error("scratch directory error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Produces a shallow single-ref copy in a fresh scratch location
    async fn fetch(&self, source: &SourceReference) -> Result<CheckoutHandle, FetchError>;

    /// Removes the scratch location; a missing handle or directory is a no-op
    async fn cleanup(&self, handle: Option<&CheckoutHandle>) -> Result<(), FetchError>;
}

pub struct GitFetcher {
    scratch_root: PathBuf,
    timeout: Duration,
    secrets: Option<Arc<dyn SecretStore>>,
    token_param: String,
}

impl GitFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            scratch_root: std::env::temp_dir(),
            timeout,
            secrets: None,
            token_param: String::new(),
        }
    }

    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = root.into();
        self
    }

    /// Looks up an access token under `param` before each fetch
    pub fn with_token(mut self, secrets: Arc<dyn SecretStore>, param: impl Into<String>) -> Self {
        self.secrets = Some(secrets);
        self.token_param = param.into();
        self
    }

    async fn access_token(&self) -> Option<String> {
        let secrets = self.secrets.as_ref()?;
        match secrets.get(&self.token_param).await {
            Ok(token) => Some(token),
            Err(e) => {
                debug!(error = %e, "No repository token available, fetching anonymously");
                None
            }
        }
    }

    fn git(&self, dir: &Path, token: Option<&str>) -> CommandSpec {
        let mut spec = CommandSpec::new("git", self.timeout).current_dir(dir);
        if let Some(token) = token {
            spec = spec
                .arg("-c")
                .arg(format!("http.extraHeader=Authorization: Bearer {}", token));
        }
        spec
    }

    async fn fetch_into(
        &self,
        source: &SourceReference,
        dir: &Path,
    ) -> Result<String, FetchError> {
        let token = self.access_token().await;
        let token = token.as_deref();
        let url = source.clone_url();

        let result = if source.is_commit_id() {
            run_command(&self.git(dir, None).args(["init", "--quiet"])).await?;
            run_command(&self.git(dir, None).args(["remote", "add", "origin", &url])).await?;
            run_command(&self.git(dir, token).args([
                "fetch",
                "--quiet",
                "--depth",
                "1",
                "origin",
                &source.git_ref,
            ]))
            .await
            .map(|_| ())
        } else {
            run_command(&self.git(dir, token).args([
                "clone",
                "--quiet",
                "--depth",
                "1",
                "--single-branch",
                "--branch",
                &source.git_ref,
                &url,
                ".",
            ]))
            .await
            .map(|_| ())
        };

        if let Err(e) = result {
            return Err(classify(source, e));
        }

        if source.is_commit_id() {
            run_command(&self.git(dir, None).args(["checkout", "--quiet", "FETCH_HEAD"])).await?;
        }

        let head = run_command(&self.git(dir, None).args(["rev-parse", "HEAD"])).await?;
        Ok(head.stdout.trim().to_string())
    }
}

fn classify(source: &SourceReference, err: CommandError) -> FetchError {
    match &err {
        CommandError::NonZeroExit { stderr, .. } => {
            let lowered = stderr.to_lowercase();
            if lowered.contains("remote branch")
                || lowered.contains("couldn't find remote ref")
                || lowered.contains("not our ref")
                || lowered.contains("unadvertised object")
            {
                return FetchError::RefNotFound {
                    repository: source.repository.clone(),
                    git_ref: source.git_ref.clone(),
                };
            }
            FetchError::Command(err)
        }
        CommandError::Timeout { timeout, .. } => FetchError::Timeout {
            seconds: timeout.as_secs(),
        },
        _ => FetchError::Command(err),
    }
}

#[async_trait]
impl SourceFetcher for GitFetcher {
    async fn fetch(&self, source: &SourceReference) -> Result<CheckoutHandle, FetchError> {
        // refuse anything git could read as an option
        if source.repository.trim().is_empty()
            || source.git_ref.trim().is_empty()
            || source.repository.starts_with('-')
            || source.git_ref.starts_with('-')
        {
            return Err(FetchError::InvalidReference(source.to_string()));
        }

        let dir = self
            .scratch_root
            .join(format!("deploybox-{}", Uuid::new_v4().simple()));
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| FetchError::Io {
                path: dir.clone(),
                source,
            })?;

        info!(source = %source, dir = %dir.display(), "Fetching repository");

        let outcome = match tokio::time::timeout(self.timeout, self.fetch_into(source, &dir)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                seconds: self.timeout.as_secs(),
            }),
        };

        match outcome {
            Ok(revision) => Ok(CheckoutHandle::new(dir, revision)),
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_dir_all(&dir).await {
                    warn!(dir = %dir.display(), error = %rm, "Failed to remove partial checkout");
                }
                Err(e)
            }
        }
    }

    async fn cleanup(&self, handle: Option<&CheckoutHandle>) -> Result<(), FetchError> {
        let Some(handle) = handle else {
            return Ok(());
        };
        match tokio::fs::remove_dir_all(&handle.root).await {
            Ok(()) => {
                debug!(dir = %handle.root.display(), "Removed checkout");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(FetchError::Io {
                path: handle.root.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_cleanup_without_handle_is_noop() {
        let fetcher = GitFetcher::new(Duration::from_secs(5));
        assert!(fetcher.cleanup(None).await.is_ok());
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let scratch = TempDir::new().unwrap();
        let dir = scratch.path().join("checkout");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("README.md"), "hi").unwrap();

        let fetcher = GitFetcher::new(Duration::from_secs(5));
        let handle = CheckoutHandle::new(&dir, "abc");
        fetcher.cleanup(Some(&handle)).await.unwrap();
        assert!(!dir.exists());
        fetcher.cleanup(Some(&handle)).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_option_like_ref() {
        let fetcher = GitFetcher::new(Duration::from_secs(5));
        let result = fetcher
            .fetch(&SourceReference::new("acme/widget", "--upload-pack=evil"))
            .await;
        assert!(matches!(result, Err(FetchError::InvalidReference(_))));
    }

    #[tokio::test]
    async fn test_failed_fetch_removes_scratch_dir() {
        let scratch = TempDir::new().unwrap();
        let fetcher =
            GitFetcher::new(Duration::from_secs(10)).with_scratch_root(scratch.path());
        let missing = scratch.path().join("no-such-repo");

        let result = fetcher
            .fetch(&SourceReference::new(missing.display().to_string(), "main"))
            .await;

        assert!(result.is_err());
        let leftovers = std::fs::read_dir(scratch.path()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_classify_missing_branch() {
        let source = SourceReference::new("acme/widget", "nope");
        let err = CommandError::NonZeroExit {
            program: "git".to_string(),
            code: Some(128),
            stderr: "warning: Could not find remote branch nope to clone.".to_string(),
        };
        assert!(matches!(
            classify(&source, err),
            FetchError::RefNotFound { .. }
        ));
    }
}
