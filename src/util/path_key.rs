use sha2::{Digest, Sha256};

fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// File-name form of a run id
///
/// Ids made only of `[A-Za-z0-9_-]` are used as-is. Any other id has its
/// unsafe characters replaced by `_` and gains a digest suffix, so distinct
/// ids never share a path.
pub fn path_key(run_id: &str) -> String {
    if !run_id.is_empty() && run_id.chars().all(is_safe) {
        return run_id.to_string();
    }
    let safe: String = run_id
        .chars()
        .map(|c| if is_safe(c) { c } else { '_' })
        .collect();
    let digest = hex::encode(Sha256::digest(run_id.as_bytes()));
    format!("{}-{}", safe, &digest[..12])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_ids_are_unchanged() {
        assert_eq!(path_key("run-1_a"), "run-1_a");
    }

    #[test]
    fn test_unsafe_ids_do_not_collide() {
        let slash = path_key("a/b");
        assert!(slash.starts_with("a_b-"));
        assert_ne!(slash, path_key("a_b"));
        assert_ne!(slash, path_key("a.b"));
        assert!(!path_key("../etc").contains('/'));
        assert_ne!(path_key(""), "");
    }
}
