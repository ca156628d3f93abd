use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn user_creation() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*RUN\s+(?:useradd|adduser|groupadd|addgroup)\b").expect("valid regex")
    })
}

fn user_directive() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*USER\s+([^\s:]+)").expect("valid regex"))
}

fn chown_flag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s--chown=([^\s:]+)(?::\S+)?").expect("valid regex"))
}

/// Account names created by a `useradd`/`adduser` command line
fn created_names(command: &str) -> Vec<String> {
    command
        .split("&&")
        .filter_map(|segment| {
            let mut tokens = segment.split_whitespace();
            let first = tokens.next()?;
            let first = if first.eq_ignore_ascii_case("RUN") {
                tokens.next()?
            } else {
                first
            };
            if first == "useradd" || first == "adduser" {
                tokens
                    .filter(|t| !t.starts_with('-') && *t != "\\")
                    .last()
                    .map(str::to_string)
            } else {
                None
            }
        })
        .collect()
}

/// Drops user-creation `RUN` lines (with their continuations) and the
/// `USER`/`--chown` references to the removed accounts
pub(super) fn strip(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut kept: Vec<&str> = Vec::with_capacity(lines.len());
    let mut removed: HashSet<String> = HashSet::from(["appuser".to_string()]);

    let mut i = 0;
    while i < lines.len() {
        if user_creation().is_match(lines[i]) {
            let mut command = String::new();
            loop {
                let line = lines[i].trim_end();
                command.push_str(line.trim_end_matches('\\'));
                command.push(' ');
                i += 1;
                if !line.ends_with('\\') || i >= lines.len() {
                    break;
                }
            }
            removed.extend(created_names(&command));
            continue;
        }
        kept.push(lines[i]);
        i += 1;
    }

    kept.into_iter()
        .filter(|line| match user_directive().captures(line) {
            Some(caps) => !removed.contains(&caps[1]),
            None => true,
        })
        .map(|line| {
            let mut out = line.to_string();
            if let Some(caps) = chown_flag().captures(line) {
                if removed.contains(&caps[1]) {
                    out = line.replacen(&caps[0], "", 1);
                }
            }
            out
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_useradd_and_matching_user() {
        let text = "FROM python:3.11\nRUN useradd -m -u 1000 web\nUSER web\nCMD [\"python\", \"app.py\"]";
        assert_eq!(strip(text), "FROM python:3.11\nCMD [\"python\", \"app.py\"]");
    }

    #[test]
    fn test_removes_continued_command() {
        let text = "RUN groupadd -r app && \\\n    useradd -r -g app svc\nUSER svc:app\nEXPOSE 8000";
        assert_eq!(strip(text), "EXPOSE 8000");
    }

    #[test]
    fn test_keeps_unrelated_user() {
        let text = "USER node\nUSER appuser";
        assert_eq!(strip(text), "USER node");
    }

    #[test]
    fn test_strips_chown_for_removed_user() {
        let text = "RUN adduser --disabled-password app\nCOPY --chown=app:app . /app\nCOPY --chown=root . /opt";
        assert_eq!(strip(text), "COPY . /app\nCOPY --chown=root . /opt");
    }

    #[test]
    fn test_idempotent() {
        let text = "RUN useradd -m x\nUSER x\nRUN ls";
        let once = strip(text);
        assert_eq!(strip(&once), once);
    }
}
