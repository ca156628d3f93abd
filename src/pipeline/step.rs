use super::collaborators::Collaborators;
use super::context::RunContext;
use super::error::StepError;
use async_trait::async_trait;

/// How a step that did not fail ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded(String),
    /// Degraded but non-fatal; the run continues
    Warning(String),
}

impl StepOutcome {
    pub fn message(&self) -> &str {
        match self {
            StepOutcome::Succeeded(m) | StepOutcome::Warning(m) => m,
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, StepOutcome::Warning(_))
    }
}

#[async_trait]
pub trait DeployStep: Send + Sync {
    fn label(&self) -> &'static str;

    async fn execute(
        &self,
        context: &mut RunContext,
        deps: &Collaborators,
    ) -> Result<StepOutcome, StepError>;
}
