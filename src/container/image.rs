use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag applied to every image built by a run: `deploy-<first 8 chars of run id>`
pub fn image_tag(run_id: &str) -> String {
    let short: String = run_id.chars().take(8).collect();
    format!("deploy-{}", short)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub registry: String,
    pub repository: String,
    pub tag: String,
}

impl ImageRef {
    pub fn new(
        registry: impl Into<String>,
        repository: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            registry: registry.into().trim_end_matches('/').to_string(),
            repository: repository.into(),
            tag: tag.into(),
        }
    }

    pub fn for_run(registry: &str, repository: &str, run_id: &str) -> Self {
        Self::new(registry, repository, image_tag(run_id))
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.registry, self.repository, self.tag)
    }
}
