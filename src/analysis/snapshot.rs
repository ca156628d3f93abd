use ignore::WalkBuilder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// Upper bound on listed files for pathological checkouts
const MAX_WALKED_FILES: usize = 20_000;

const README_CANDIDATES: &[&str] = &["README.md", "README", "README.rst", "README.txt", "readme.md"];

/// File listing and README of a project, used for inference requests and
/// file-based fallbacks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectSnapshot {
    /// Relative paths with `/` separators, in walk order
    pub files: Vec<String>,
    pub readme: Option<String>,
}

impl ProjectSnapshot {
    pub fn new(files: Vec<String>, readme: Option<String>) -> Self {
        Self { files, readme }
    }

    /// Lists the checkout's files (respecting .gitignore) and reads the
    /// README, keeping at most `max_readme_bytes`
    ///
    /// Prompt bounds are applied where the listing is rendered; fallback
    /// detection and fix-ups see every file.
    pub fn from_checkout(root: &Path, max_readme_bytes: usize) -> Self {
        let mut files = Vec::new();
        let walker = WalkBuilder::new(root)
            .hidden(false)
            .git_ignore(true)
            .filter_entry(|entry| entry.file_name() != ".git")
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        for entry in walker.flatten() {
            if files.len() >= MAX_WALKED_FILES {
                warn!(limit = MAX_WALKED_FILES, "Checkout listing truncated");
                break;
            }
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            if let Ok(rel) = entry.path().strip_prefix(root) {
                files.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }

        let readme = README_CANDIDATES
            .iter()
            .map(|name| root.join(name))
            .find(|path| path.is_file())
            .and_then(|path| read_prefix(&path, max_readme_bytes));

        debug!(files = files.len(), has_readme = readme.is_some(), "Built project snapshot");
        Self { files, readme }
    }

    pub fn readme_excerpt(&self, max_bytes: usize) -> Option<&str> {
        self.readme.as_deref().map(|r| truncate_bytes(r, max_bytes))
    }
}

/// Reads at most `max` bytes of `path` as text, replacing invalid UTF-8
fn read_prefix(path: &Path, max: usize) -> Option<String> {
    let mut bytes = Vec::new();
    File::open(path)
        .and_then(|file| file.take(max as u64).read_to_end(&mut bytes))
        .ok()?;

    // a multi-byte char cut at the limit is dropped, not replaced
    if let Err(e) = std::str::from_utf8(&bytes) {
        if e.error_len().is_none() {
            bytes.truncate(e.valid_up_to());
        }
    }
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// Cuts `text` to at most `max` bytes on a char boundary
pub(crate) fn truncate_bytes(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_from_checkout_lists_files_and_readme() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("main.py"), "print('hi')").unwrap();
        fs::write(dir.path().join("README.md"), "x".repeat(5000)).unwrap();
        fs::create_dir_all(dir.path().join("app")).unwrap();
        fs::write(dir.path().join("app/routes.py"), "").unwrap();

        let snapshot = ProjectSnapshot::from_checkout(dir.path(), 3000);

        assert!(snapshot.files.contains(&"main.py".to_string()));
        assert!(snapshot.files.contains(&"app/routes.py".to_string()));
        assert_eq!(snapshot.readme.as_ref().map(|r| r.len()), Some(3000));
    }

    #[test]
    fn test_from_checkout_lists_past_prompt_bounds() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("assets")).unwrap();
        for i in 0..120 {
            fs::write(dir.path().join(format!("assets/icon{:03}.svg", i)), "").unwrap();
        }
        fs::write(dir.path().join("requirements.txt"), "flask\n").unwrap();
        fs::write(dir.path().join("server.py"), "").unwrap();

        let snapshot = ProjectSnapshot::from_checkout(dir.path(), 3000);

        assert_eq!(snapshot.files.len(), 122);
        assert!(snapshot.files.contains(&"requirements.txt".to_string()));
        assert!(snapshot.files.contains(&"server.py".to_string()));
    }

    #[test]
    fn test_readme_read_is_bounded_and_lossy() {
        let dir = TempDir::new().unwrap();
        let mut content = b"caf\xff project ".to_vec();
        content.extend(std::iter::repeat(b'x').take(10_000));
        fs::write(dir.path().join("README.md"), &content).unwrap();

        let snapshot = ProjectSnapshot::from_checkout(dir.path(), 64);
        let readme = snapshot.readme.unwrap();

        assert!(readme.starts_with("caf\u{FFFD} project "));
        assert!(readme.len() <= 64 + 2);
    }

    #[test]
    fn test_readme_cut_inside_char_is_dropped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("README"), "ab\u{e9}cd").unwrap();

        let snapshot = ProjectSnapshot::from_checkout(dir.path(), 3);
        assert_eq!(snapshot.readme.as_deref(), Some("ab"));
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        let text = "héllo";
        assert_eq!(truncate_bytes(text, 2), "h");
        assert_eq!(truncate_bytes(text, 100), text);
    }
}
