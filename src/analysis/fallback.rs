//! Rule-based project detection used when inference is unavailable
//!
//! Manifest filenames map to a language, a runtime label and a package
//! manager. When several manifests are present the shallowest one wins, with
//! table order breaking ties, so a repository with `package.json` at the root
//! and a `requirements.txt` under `scripts/` is classified as JavaScript.

use super::descriptor::{Confidence, LanguageFamily, ProjectDescriptor, ResourceTier};
use std::collections::HashSet;

struct ManifestRule {
    manifest: &'static str,
    language: &'static str,
    runtime: &'static str,
    package_manager: &'static str,
}

const MANIFEST_RULES: &[ManifestRule] = &[
    ManifestRule {
        manifest: "package.json",
        language: "JavaScript",
        runtime: "Node.js 20",
        package_manager: "npm",
    },
    ManifestRule {
        manifest: "requirements.txt",
        language: "Python",
        runtime: "Python 3.11",
        package_manager: "pip",
    },
    ManifestRule {
        manifest: "pyproject.toml",
        language: "Python",
        runtime: "Python 3.11",
        package_manager: "poetry",
    },
    ManifestRule {
        manifest: "go.mod",
        language: "Go",
        runtime: "Go 1.21",
        package_manager: "go modules",
    },
    ManifestRule {
        manifest: "Cargo.toml",
        language: "Rust",
        runtime: "Rust 1.75",
        package_manager: "cargo",
    },
    ManifestRule {
        manifest: "pom.xml",
        language: "Java",
        runtime: "Java 17",
        package_manager: "maven",
    },
    ManifestRule {
        manifest: "build.gradle",
        language: "Java",
        runtime: "Java 17",
        package_manager: "gradle",
    },
    ManifestRule {
        manifest: "Gemfile",
        language: "Ruby",
        runtime: "Ruby 3.2",
        package_manager: "bundler",
    },
    ManifestRule {
        manifest: "composer.json",
        language: "PHP",
        runtime: "PHP 8.2",
        package_manager: "composer",
    },
];

const FRAMEWORK_HINTS: &[(&str, &str)] = &[
    ("manage.py", "Django"),
    ("next.config.js", "Next.js"),
    ("next.config.mjs", "Next.js"),
    ("nest-cli.json", "NestJS"),
];

const UNKNOWN_PORT: u16 = 8000;

pub fn default_port(family: LanguageFamily) -> u16 {
    match family {
        LanguageFamily::Python => 8000,
        LanguageFamily::Node | LanguageFamily::Ruby => 3000,
        LanguageFamily::Go | LanguageFamily::Rust | LanguageFamily::Java | LanguageFamily::Php => {
            8080
        }
        LanguageFamily::Other => UNKNOWN_PORT,
    }
}

/// First port at or above `preferred` that nobody has claimed
pub fn free_port(preferred: u16, claimed: &HashSet<u16>) -> u16 {
    let mut port = preferred;
    while claimed.contains(&port) {
        port = match port.checked_add(1) {
            Some(next) => next,
            None => return preferred,
        };
    }
    port
}

fn depth(path: &str) -> usize {
    path.matches('/').count()
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Classifies a project from its file list alone; always returns a descriptor
pub fn detect(files: &[String], claimed_ports: &HashSet<u16>) -> ProjectDescriptor {
    let mut best: Option<(usize, usize)> = None;
    for (rule_idx, rule) in MANIFEST_RULES.iter().enumerate() {
        let shallowest = files
            .iter()
            .filter(|f| basename(f) == rule.manifest)
            .map(|f| depth(f))
            .min();
        if let Some(d) = shallowest {
            if best.map(|(bd, _)| d < bd).unwrap_or(true) {
                best = Some((d, rule_idx));
            }
        }
    }

    let Some((_, rule_idx)) = best else {
        return ProjectDescriptor {
            primary_language: "Unknown".to_string(),
            primary_framework: None,
            runtime_label: "Unknown".to_string(),
            listen_port: free_port(UNKNOWN_PORT, claimed_ports),
            resource_tier: ResourceTier::Medium,
            database_requirement: None,
            confidence: Confidence::Low,
            package_managers: Vec::new(),
        };
    };

    let chosen = &MANIFEST_RULES[rule_idx];
    let package_managers: Vec<String> = MANIFEST_RULES
        .iter()
        .filter(|r| r.language == chosen.language)
        .filter(|r| files.iter().any(|f| basename(f) == r.manifest))
        .map(|r| r.package_manager.to_string())
        .collect();

    let family = LanguageFamily::from_language(chosen.language);
    let primary_framework = FRAMEWORK_HINTS
        .iter()
        .find(|(hint, framework)| {
            files.iter().any(|f| basename(f) == *hint) && framework_fits(family, framework)
        })
        .map(|(_, framework)| framework.to_string());

    ProjectDescriptor {
        primary_language: chosen.language.to_string(),
        primary_framework,
        runtime_label: chosen.runtime.to_string(),
        listen_port: free_port(default_port(family), claimed_ports),
        resource_tier: ResourceTier::Medium,
        database_requirement: None,
        confidence: Confidence::Low,
        package_managers,
    }
}

fn framework_fits(family: LanguageFamily, framework: &str) -> bool {
    match framework {
        "Django" => family == LanguageFamily::Python,
        _ => family == LanguageFamily::Node,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_detect_node_project() {
        let d = detect(&files(&["package.json", "index.js"]), &HashSet::new());
        assert_eq!(d.primary_language, "JavaScript");
        assert_eq!(d.runtime_label, "Node.js 20");
        assert_eq!(d.listen_port, 3000);
        assert_eq!(d.package_managers, vec!["npm"]);
        assert_eq!(d.confidence, Confidence::Low);
        assert_eq!(d.resource_tier, ResourceTier::Medium);
    }

    #[test]
    fn test_detect_django_project() {
        let d = detect(
            &files(&["manage.py", "requirements.txt", "pyproject.toml"]),
            &HashSet::new(),
        );
        assert_eq!(d.primary_language, "Python");
        assert_eq!(d.primary_framework.as_deref(), Some("Django"));
        assert_eq!(d.package_managers, vec!["pip", "poetry"]);
        assert_eq!(d.listen_port, 8000);
    }

    #[test]
    fn test_root_manifest_wins_over_nested() {
        let d = detect(
            &files(&["scripts/tools/requirements.txt", "go.mod", "main.go"]),
            &HashSet::new(),
        );
        assert_eq!(d.primary_language, "Go");
        assert_eq!(d.listen_port, 8080);
    }

    #[test]
    fn test_unknown_project() {
        let d = detect(&files(&["notes.txt"]), &HashSet::new());
        assert_eq!(d.primary_language, "Unknown");
        assert_eq!(d.runtime_label, "Unknown");
        assert_eq!(d.listen_port, 8000);
        assert!(d.package_managers.is_empty());
    }

    #[test]
    fn test_port_avoids_claimed() {
        let claimed: HashSet<u16> = [3000, 3001].into_iter().collect();
        let d = detect(&files(&["package.json"]), &claimed);
        assert_eq!(d.listen_port, 3002);
    }

    #[test]
    fn test_django_hint_ignored_for_node() {
        let d = detect(&files(&["package.json", "manage.py"]), &HashSet::new());
        assert_eq!(d.primary_language, "JavaScript");
        assert!(d.primary_framework.is_none());
    }
}
