use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Repository locator plus branch, tag or commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReference {
    pub repository: String,
    pub git_ref: String,
}

impl SourceReference {
    pub fn new(repository: impl Into<String>, git_ref: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            git_ref: git_ref.into(),
        }
    }

    /// Canonical repository identity used for cache matching.
    ///
    /// `https://github.com/acme/widget.git`, `github.com/acme/widget` and
    /// `acme/widget` all map to `acme/widget`; other locators are kept as-is
    /// apart from a trailing `.git` or `/`.
    pub fn identity(&self) -> String {
        let trimmed = self.repository.trim().trim_end_matches('/');
        let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
        for prefix in ["https://github.com/", "http://github.com/", "github.com/", "git@github.com:"] {
            if let Some(rest) = trimmed.strip_prefix(prefix) {
                return rest.to_string();
            }
        }
        trimmed.to_string()
    }

    /// URL handed to git; `owner/repo` shorthand resolves to GitHub over HTTPS
    pub fn clone_url(&self) -> String {
        let repo = self.repository.trim();
        if repo.contains("://") || repo.starts_with("git@") || Path::new(repo).is_absolute() {
            return repo.to_string();
        }
        let identity = self.identity();
        format!("https://github.com/{}.git", identity)
    }

    /// 7 to 40 hex characters are treated as a commit id rather than a branch
    pub fn is_commit_id(&self) -> bool {
        let r = self.git_ref.as_str();
        (7..=40).contains(&r.len()) && r.chars().all(|c| c.is_ascii_hexdigit())
    }
}

impl fmt::Display for SourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.repository, self.git_ref)
    }
}

/// A fetched working copy; exclusively owned by one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutHandle {
    pub root: PathBuf,
    /// Resolved revision identifier (full commit id when known)
    pub revision: String,
}

impl CheckoutHandle {
    pub fn new(root: impl Into<PathBuf>, revision: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            revision: revision.into(),
        }
    }
}
