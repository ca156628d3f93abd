use super::FixupContext;
use crate::analysis::LanguageFamily;
use regex::Regex;
use std::sync::OnceLock;

fn from_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*FROM\s+\S").expect("valid regex"))
}

fn named_stage() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\sAS\s+\S+\s*$").expect("valid regex"))
}

fn copy_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*COPY\s").expect("valid regex"))
}

fn copy_from() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*COPY\s+(?:--\S+\s+)*--from=").expect("valid regex"))
}

fn copy_whole_context() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*COPY\s+(?:--\S+\s+)*\.\s+\.\s*$").expect("valid regex"))
}

fn copy_into_workdir() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*COPY\s+.*\s\./?\s*$").expect("valid regex"))
}

fn pip_install() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:pip3?|poetry|pipenv)\s+install\b").expect("valid regex"))
}

fn node_install() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:npm|yarn|pnpm)\s+(?:install|ci)\b").expect("valid regex"))
}

fn package_manifest() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)package[^\s]*\.json").expect("valid regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Installer {
    Pip,
    Npm,
}

impl Installer {
    fn for_family(family: LanguageFamily) -> Option<Self> {
        match family {
            LanguageFamily::Python => Some(Installer::Pip),
            LanguageFamily::Node => Some(Installer::Npm),
            _ => None,
        }
    }

    fn manifest(self) -> &'static str {
        match self {
            Installer::Pip => "requirements.txt",
            Installer::Npm => "package.json",
        }
    }

    fn command(self) -> &'static str {
        match self {
            Installer::Pip => "RUN pip install --no-cache-dir -r requirements.txt",
            Installer::Npm => "RUN npm install --production",
        }
    }

    fn installs(self, line: &str) -> bool {
        match self {
            Installer::Pip => pip_install().is_match(line),
            Installer::Npm => node_install().is_match(line),
        }
    }

    /// A `COPY` after which dependencies are expected to be installed
    fn triggers(self, line: &str, named_stage: bool) -> bool {
        if !copy_line().is_match(line) {
            return false;
        }
        match self {
            Installer::Pip => {
                line.contains("requirements.txt")
                    || (!named_stage && (copy_from().is_match(line) || copy_whole_context().is_match(line)))
            }
            Installer::Npm => {
                package_manifest().is_match(line) || (!named_stage && copy_into_workdir().is_match(line))
            }
        }
    }

    /// pip packages live outside the copied tree, so each stage installs its
    /// own; one npm install anywhere is enough
    fn per_stage(self) -> bool {
        self == Installer::Pip
    }
}

/// `(first line, end, named)` for each `FROM` stage
fn stages(lines: &[&str]) -> Vec<(usize, usize, bool)> {
    let mut stages: Vec<(usize, usize, bool)> = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if from_line().is_match(line) {
            if let Some(last) = stages.last_mut() {
                last.1 = i;
            }
            stages.push((i, lines.len(), named_stage().is_match(line)));
        }
    }
    if stages.is_empty() {
        stages.push((0, lines.len(), false));
    } else if stages[0].0 > 0 {
        stages.insert(0, (0, stages[0].0, false));
    }
    stages
}

fn indent_of(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// Inserts the missing dependency install after the first triggering `COPY`
/// of a stage that never installs
pub(super) fn insert(text: &str, ctx: &FixupContext<'_>) -> String {
    let Some(installer) = Installer::for_family(ctx.descriptor.language_family()) else {
        return text.to_string();
    };
    let manifest = installer.manifest();
    if !ctx
        .files
        .iter()
        .any(|f| f.rsplit('/').next() == Some(manifest))
    {
        return text.to_string();
    }

    let lines: Vec<&str> = text.split('\n').collect();
    if !installer.per_stage() && lines.iter().any(|l| installer.installs(l)) {
        return text.to_string();
    }

    let mut insert_after: Vec<usize> = stages(&lines)
        .into_iter()
        .filter(|(start, end, _)| !lines[*start..*end].iter().any(|l| installer.installs(l)))
        .filter_map(|(start, end, named)| {
            lines[start..end]
                .iter()
                .position(|l| installer.triggers(l, named))
                .map(|offset| start + offset)
        })
        .collect();
    if !installer.per_stage() {
        insert_after.truncate(1);
    }
    if insert_after.is_empty() {
        return text.to_string();
    }

    let mut out: Vec<String> = Vec::with_capacity(lines.len() + insert_after.len());
    for (i, line) in lines.iter().enumerate() {
        out.push(line.to_string());
        if insert_after.contains(&i) {
            out.push(format!("{}{}", indent_of(line), installer.command()));
        }
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Confidence, ProjectDescriptor, ResourceTier};

    fn descriptor(language: &str) -> ProjectDescriptor {
        ProjectDescriptor {
            primary_language: language.to_string(),
            primary_framework: None,
            runtime_label: language.to_string(),
            listen_port: 8000,
            resource_tier: ResourceTier::Small,
            database_requirement: None,
            confidence: Confidence::High,
            package_managers: vec![],
        }
    }

    fn run(text: &str, language: &str, files: &[&str]) -> String {
        let d = descriptor(language);
        let files: Vec<String> = files.iter().map(|f| f.to_string()).collect();
        insert(
            text,
            &FixupContext {
                descriptor: &d,
                files: &files,
            },
        )
    }

    #[test]
    fn test_pip_install_after_requirements_copy() {
        let text = "FROM python:3.11-slim\nWORKDIR /app\nCOPY requirements.txt .\nCOPY . .\nCMD [\"python\", \"main.py\"]";
        let fixed = run(text, "Python", &["main.py", "requirements.txt"]);
        assert_eq!(
            fixed,
            "FROM python:3.11-slim\nWORKDIR /app\nCOPY requirements.txt .\n\
             RUN pip install --no-cache-dir -r requirements.txt\nCOPY . .\nCMD [\"python\", \"main.py\"]"
        );
    }

    #[test]
    fn test_pip_install_after_whole_context_copy() {
        let text = "FROM python:3.11\nCOPY . .\nCMD [\"python\", \"app.py\"]";
        let fixed = run(text, "Python", &["app.py", "requirements.txt"]);
        assert!(fixed.contains("COPY . .\nRUN pip install --no-cache-dir -r requirements.txt\nCMD"));
    }

    #[test]
    fn test_final_stage_of_multi_stage_build() {
        let text = "FROM python:3.11 AS builder\nCOPY . /src\nRUN pip install --user -r /src/requirements.txt\n\
                    FROM python:3.11-slim\nCOPY --from=builder /src /app\nCMD [\"python\", \"/app/main.py\"]";
        let fixed = run(text, "Python", &["main.py", "requirements.txt"]);
        assert!(fixed.contains("COPY --from=builder /src /app\nRUN pip install --no-cache-dir -r requirements.txt\n"));
        assert_eq!(fixed.matches("pip install").count(), 2);
    }

    #[test]
    fn test_existing_install_is_left_alone() {
        let text = "FROM python:3.11\nCOPY requirements.txt .\nRUN apt-get update\nRUN pip install -r requirements.txt\nCOPY . .";
        assert_eq!(run(text, "Python", &["requirements.txt"]), text);
    }

    #[test]
    fn test_requires_manifest_in_file_list() {
        let text = "FROM python:3.11\nCOPY . .\nCMD [\"python\", \"main.py\"]";
        assert_eq!(run(text, "Python", &["main.py", "pyproject.toml"]), text);
        assert_eq!(run(text, "Go", &["requirements.txt"]), text);
    }

    #[test]
    fn test_npm_install_after_package_copy() {
        let text = "FROM node:20-alpine\nWORKDIR /app\n  COPY package*.json ./\nCOPY . .\nCMD [\"node\", \"index.js\"]";
        let fixed = run(text, "JavaScript", &["index.js", "package.json"]);
        assert!(fixed.contains("  COPY package*.json ./\n  RUN npm install --production\nCOPY . ."));
        assert_eq!(fixed.matches("npm install").count(), 1);
    }

    #[test]
    fn test_npm_install_anywhere_counts() {
        let text = "FROM node:20 AS builder\nCOPY package.json ./\nRUN yarn install\nCOPY . .\n\
                    FROM node:20-alpine\nCOPY --from=builder /app .\nCMD [\"node\", \"index.js\"]";
        assert_eq!(run(text, "TypeScript", &["package.json", "index.ts"]), text);
    }

    #[test]
    fn test_idempotent() {
        let text = "FROM python:3.11\nCOPY requirements.txt .\nCOPY . .\nFROM python:3.11-slim\nCOPY --from=0 /app /app";
        let files = &["requirements.txt", "main.py"];
        let once = run(text, "Python", files);
        assert_ne!(once, text);
        assert_eq!(run(&once, "Python", files), once);

        let node = "FROM node:20\nCOPY . .\nCMD [\"node\", \"server.js\"]";
        let once = run(node, "Node.js", &["package.json", "server.js"]);
        assert!(once.contains("COPY . .\nRUN npm install --production"));
        assert_eq!(run(&once, "Node.js", &["package.json", "server.js"]), once);
    }
}
