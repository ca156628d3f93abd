pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{AnalyzeArgs, CliArgs, Commands, DeployArgs, HealthArgs, LogsArgs};
pub use output::{AnalysisReport, OutputFormat, OutputFormatter, ToolStatus};
