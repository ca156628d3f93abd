use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceTier {
    Small,
    Medium,
    Large,
}

impl ResourceTier {
    /// Accepts both size names and the complexity vocabulary
    /// (simple/moderate/complex) used by inference replies
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "small" | "simple" | "low" => Some(ResourceTier::Small),
            "medium" | "moderate" => Some(ResourceTier::Medium),
            "large" | "complex" | "high" => Some(ResourceTier::Large),
            _ => None,
        }
    }

    /// Fargate CPU units
    pub fn cpu_units(&self) -> u32 {
        match self {
            ResourceTier::Small => 256,
            ResourceTier::Medium => 512,
            ResourceTier::Large => 1024,
        }
    }

    pub fn memory_mib(&self) -> u32 {
        match self {
            ResourceTier::Small => 512,
            ResourceTier::Medium => 1024,
            ResourceTier::Large => 2048,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceTier::Small => "small",
            ResourceTier::Medium => "medium",
            ResourceTier::Large => "large",
        }
    }
}

impl fmt::Display for ResourceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    Postgres,
    Mysql,
    Mongodb,
    Redis,
}

impl DatabaseKind {
    /// `None` for "none", empty or unrecognized labels
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Some(DatabaseKind::Postgres),
            "mysql" | "mariadb" => Some(DatabaseKind::Mysql),
            "mongodb" | "mongo" => Some(DatabaseKind::Mongodb),
            "redis" => Some(DatabaseKind::Redis),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseKind::Postgres => "postgres",
            DatabaseKind::Mysql => "mysql",
            DatabaseKind::Mongodb => "mongodb",
            DatabaseKind::Redis => "redis",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "high" => Some(Confidence::High),
            "medium" => Some(Confidence::Medium),
            "low" => Some(Confidence::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

/// Coarse runtime family derived from the free-form language name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageFamily {
    Python,
    Node,
    Go,
    Rust,
    Java,
    Ruby,
    Php,
    Other,
}

impl LanguageFamily {
    pub fn from_language(language: &str) -> Self {
        let lowered = language.trim().to_lowercase();
        match lowered.as_str() {
            "python" => LanguageFamily::Python,
            "javascript" | "typescript" | "node" | "nodejs" | "node.js" => LanguageFamily::Node,
            "go" | "golang" => LanguageFamily::Go,
            "rust" => LanguageFamily::Rust,
            "java" | "kotlin" => LanguageFamily::Java,
            "ruby" => LanguageFamily::Ruby,
            "php" => LanguageFamily::Php,
            _ if lowered.starts_with("python") => LanguageFamily::Python,
            _ if lowered.contains("script") || lowered.starts_with("node") => LanguageFamily::Node,
            _ => LanguageFamily::Other,
        }
    }
}

/// Structured classification of a project; immutable once produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDescriptor {
    pub primary_language: String,
    pub primary_framework: Option<String>,
    pub runtime_label: String,
    pub listen_port: u16,
    pub resource_tier: ResourceTier,
    pub database_requirement: Option<DatabaseKind>,
    pub confidence: Confidence,
    #[serde(default)]
    pub package_managers: Vec<String>,
}

impl ProjectDescriptor {
    pub fn language_family(&self) -> LanguageFamily {
        LanguageFamily::from_language(&self.primary_language)
    }

    /// Case-insensitive framework check, e.g. `has_framework("fastapi")`
    pub fn has_framework(&self, name: &str) -> bool {
        self.primary_framework
            .as_deref()
            .map(|f| f.to_lowercase().contains(&name.to_lowercase()))
            .unwrap_or(false)
    }

    pub fn uses_package_manager(&self, name: &str) -> bool {
        self.package_managers
            .iter()
            .any(|p| p.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorSource {
    Inference,
    Fallback,
    Cache,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisOutcome {
    pub descriptor: ProjectDescriptor,
    pub source: DescriptorSource,
    /// Why inference was not used, when it was bypassed or failed
    pub note: Option<String>,
}

/// A service already running on the shared platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownDeployment {
    pub repository: String,
    pub primary_language: String,
    pub primary_framework: Option<String>,
    pub listen_port: u16,
    pub resource_tier: ResourceTier,
}
