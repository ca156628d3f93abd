use super::types::ErrorKind;
use crate::container::{BuildError, PublishError};
use crate::release::ReleaseError;
use crate::source::FetchError;
use thiserror::Error;

/// Fatal failure of a step; aborts the run
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Release(#[from] ReleaseError),

    /// A step ran without the inputs an earlier step should have produced
    #[error("internal error: {0}")]
    Internal(String),
}

impl StepError {
    pub fn missing(what: &str) -> Self {
        StepError::Internal(format!("{} is not available", what))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StepError::Fetch(_) => ErrorKind::Fetch,
            StepError::Build(_) => ErrorKind::Build,
            StepError::Publish(_) => ErrorKind::Publish,
            StepError::Release(_) => ErrorKind::Release,
            StepError::Internal(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_follows_source_error() {
        let err: StepError = BuildError::MissingBuildFile.into();
        assert_eq!(err.kind(), ErrorKind::Build);
        assert_eq!(err.to_string(), "no container build file was generated");

        let err: StepError = FetchError::Timeout { seconds: 120 }.into();
        assert_eq!(err.kind(), ErrorKind::Fetch);
        assert_eq!(StepError::missing("checkout").kind(), ErrorKind::Internal);
    }
}
