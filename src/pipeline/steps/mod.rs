// Deployment steps, in execution order
//
// Each step reads what earlier steps left in the RunContext and stores its
// own result there. A step that finds its inputs missing fails with an
// internal error rather than guessing.

#[path = "01_fetch.rs"]
pub mod fetch;
#[path = "02_analyze.rs"]
pub mod analyze;
#[path = "03_generate.rs"]
pub mod generate;
#[path = "04_build.rs"]
pub mod build;
#[path = "05_publish.rs"]
pub mod publish;
#[path = "06_release.rs"]
pub mod release;
#[path = "07_health.rs"]
pub mod health;

use super::step::DeployStep;

pub use analyze::AnalyzeStep;
pub use build::BuildStep;
pub use fetch::FetchStep;
pub use generate::GenerateStep;
pub use health::HealthStep;
pub use publish::PublishStep;
pub use release::ReleaseStep;

/// The fixed step sequence
pub fn default_steps() -> Vec<Box<dyn DeployStep>> {
    vec![
        Box::new(FetchStep),
        Box::new(AnalyzeStep),
        Box::new(GenerateStep),
        Box::new(BuildStep),
        Box::new(PublishStep),
        Box::new(ReleaseStep),
        Box::new(HealthStep),
    ]
}
