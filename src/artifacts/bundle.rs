use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    ContainerBuildFile,
    InfraDefinition,
    InfraVariables,
    ProcessManifest,
    BuildManifest,
    ReleaseNotes,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 6] = [
        ArtifactKind::ContainerBuildFile,
        ArtifactKind::InfraDefinition,
        ArtifactKind::InfraVariables,
        ArtifactKind::ProcessManifest,
        ArtifactKind::BuildManifest,
        ArtifactKind::ReleaseNotes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::ContainerBuildFile => "container-build-file",
            ArtifactKind::InfraDefinition => "infra-definition",
            ArtifactKind::InfraVariables => "infra-variables",
            ArtifactKind::ProcessManifest => "process-manifest",
            ArtifactKind::BuildManifest => "build-manifest",
            ArtifactKind::ReleaseNotes => "release-notes",
        }
    }

    /// File name used when the artifact is written to disk
    pub fn file_name(&self) -> &'static str {
        match self {
            ArtifactKind::ContainerBuildFile => "Dockerfile",
            ArtifactKind::InfraDefinition => "ecs.tf",
            ArtifactKind::InfraVariables => "terraform.tfvars",
            ArtifactKind::ProcessManifest => "appspec.yaml",
            ArtifactKind::BuildManifest => "buildspec.yaml",
            ArtifactKind::ReleaseNotes => "deployment_recommendations.md",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Artifact kind to raw text; any subset of kinds may be present
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactBundle {
    artifacts: BTreeMap<ArtifactKind, String>,
}

impl ArtifactBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `content` unless it is blank; blank content means "absent"
    pub fn insert(&mut self, kind: ArtifactKind, content: impl Into<String>) {
        let content = content.into();
        if content.trim().is_empty() {
            self.artifacts.remove(&kind);
        } else {
            self.artifacts.insert(kind, content);
        }
    }

    pub fn with(mut self, kind: ArtifactKind, content: impl Into<String>) -> Self {
        self.insert(kind, content);
        self
    }

    pub fn get(&self, kind: ArtifactKind) -> Option<&str> {
        self.artifacts.get(&kind).map(String::as_str)
    }

    pub fn contains(&self, kind: ArtifactKind) -> bool {
        self.artifacts.contains_key(&kind)
    }

    pub fn container_build_file(&self) -> Option<&str> {
        self.get(ArtifactKind::ContainerBuildFile)
    }

    pub fn kinds(&self) -> Vec<ArtifactKind> {
        self.artifacts.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArtifactKind, &str)> {
        self.artifacts.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_content_is_absent() {
        let mut bundle = ArtifactBundle::new().with(ArtifactKind::BuildManifest, "version: 0.2");
        bundle.insert(ArtifactKind::ProcessManifest, "   \n");
        assert!(bundle.contains(ArtifactKind::BuildManifest));
        assert!(!bundle.contains(ArtifactKind::ProcessManifest));

        bundle.insert(ArtifactKind::BuildManifest, "");
        assert!(bundle.is_empty());
    }

    #[test]
    fn test_kind_serde_names() {
        assert_eq!(
            serde_json::to_string(&ArtifactKind::ContainerBuildFile).unwrap(),
            "\"container-build-file\""
        );
        for kind in ArtifactKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_kinds_are_ordered() {
        let bundle = ArtifactBundle::new()
            .with(ArtifactKind::ReleaseNotes, "notes")
            .with(ArtifactKind::ContainerBuildFile, "FROM x:y");
        assert_eq!(
            bundle.kinds(),
            vec![ArtifactKind::ContainerBuildFile, ArtifactKind::ReleaseNotes]
        );
    }
}
