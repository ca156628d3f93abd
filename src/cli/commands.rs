use clap::{Parser, Subcommand, ValueEnum};
use genai::adapter::AdapterKind;
use std::path::PathBuf;

/// AI-assisted deployment pipeline for GitHub repositories
#[derive(Parser, Debug)]
#[command(
    name = "deploybox",
    about = "AI-assisted deployment pipeline for GitHub repositories",
    version,
    author,
    long_about = "deploybox fetches a repository, classifies it with an LLM, generates a \
                  Dockerfile and deployment manifests, then builds, pushes and rolls the image \
                  out to an ECS service. Every step is recorded in a per-run execution log."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Run the full deployment pipeline",
        long_about = "Fetches the repository at the given ref, analyzes it, generates artifacts, \
                      builds and publishes the image, updates the release and verifies health.\n\n\
                      Examples:\n  \
                      deploybox deploy acme/widget\n  \
                      deploybox deploy acme/widget --ref deadbeef123 --format json\n  \
                      deploybox deploy https://github.com/acme/widget --health-url http://widget.internal/health"
    )]
    Deploy(DeployArgs),

    #[command(
        about = "Analyze a project offline and generate its artifacts",
        long_about = "Classifies a project from a precomputed file list and optional README, then \
                      generates deployment artifacts. Nothing is fetched, built or deployed.\n\n\
                      Examples:\n  \
                      deploybox analyze acme/widget --files files.txt\n  \
                      deploybox analyze acme/widget --files files.txt --readme README.md --output out/"
    )]
    Analyze(AnalyzeArgs),

    #[command(about = "Print the execution log of a run")]
    Logs(LogsArgs),

    #[command(
        about = "Check tool availability",
        long_about = "Checks that git, the aws CLI and the Docker daemon are reachable.\n\n\
                      Examples:\n  \
                      deploybox health\n  \
                      deploybox health --format json"
    )]
    Health(HealthArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct DeployArgs {
    #[arg(value_name = "REPOSITORY", help = "owner/repo or GitHub URL")]
    pub repository: String,

    #[arg(long = "ref", value_name = "REF", default_value = "main", help = "Branch or commit id")]
    pub git_ref: String,

    #[arg(long, value_name = "ID", help = "Run id (generated when omitted)")]
    pub run_id: Option<String>,

    #[arg(long, value_name = "URL", help = "Health endpoint to poll after the release")]
    pub health_url: Option<String>,

    #[arg(long, value_name = "FILE", help = "Newline-separated file list to analyze instead of the checkout")]
    pub files: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "README to analyze instead of the checkout's")]
    pub readme: Option<PathBuf>,

    #[arg(
        short = 'p',
        long,
        value_parser = parse_adapter_kind,
        help = "Inference provider (overrides DEPLOYBOX_PROVIDER)"
    )]
    pub provider: Option<AdapterKind>,

    #[arg(short = 'm', long, value_name = "MODEL", help = "Model name (overrides DEPLOYBOX_MODEL)")]
    pub model: Option<String>,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct AnalyzeArgs {
    #[arg(value_name = "REPOSITORY", help = "owner/repo or GitHub URL")]
    pub repository: String,

    #[arg(long = "ref", value_name = "REF", default_value = "main", help = "Revision used as the cache key")]
    pub git_ref: String,

    #[arg(long, value_name = "FILE", help = "Newline-separated file list")]
    pub files: PathBuf,

    #[arg(long, value_name = "FILE", help = "README content")]
    pub readme: Option<PathBuf>,

    #[arg(short = 'o', long, value_name = "DIR", help = "Write generated artifacts under DIR/<run id>/ instead of the state directory")]
    pub output: Option<PathBuf>,

    #[arg(
        short = 'p',
        long,
        value_parser = parse_adapter_kind,
        help = "Inference provider (overrides DEPLOYBOX_PROVIDER)"
    )]
    pub provider: Option<AdapterKind>,

    #[arg(short = 'm', long, value_name = "MODEL", help = "Model name (overrides DEPLOYBOX_MODEL)")]
    pub model: Option<String>,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct LogsArgs {
    #[arg(value_name = "RUN_ID")]
    pub run_id: String,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct HealthArgs {
    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

fn parse_adapter_kind(s: &str) -> Result<AdapterKind, String> {
    crate::config::parse_provider(s).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_default_deploy_args() {
        let args = CliArgs::parse_from(["deploybox", "deploy", "acme/widget"]);
        match args.command {
            Commands::Deploy(deploy) => {
                assert_eq!(deploy.repository, "acme/widget");
                assert_eq!(deploy.git_ref, "main");
                assert_eq!(deploy.format, OutputFormatArg::Human);
                assert!(deploy.run_id.is_none());
                assert!(deploy.provider.is_none());
            }
            _ => panic!("Expected Deploy command"),
        }
    }

    #[test]
    fn test_deploy_with_options() {
        let args = CliArgs::parse_from([
            "deploybox",
            "deploy",
            "acme/widget",
            "--ref",
            "deadbeef123",
            "--run-id",
            "run-1",
            "--provider",
            "claude",
            "--format",
            "json",
        ]);
        match args.command {
            Commands::Deploy(deploy) => {
                assert_eq!(deploy.git_ref, "deadbeef123");
                assert_eq!(deploy.run_id.as_deref(), Some("run-1"));
                assert_eq!(deploy.provider, Some(AdapterKind::Anthropic));
                assert_eq!(deploy.format, OutputFormatArg::Json);
            }
            _ => panic!("Expected Deploy command"),
        }
    }

    #[test]
    fn test_analyze_requires_files() {
        assert!(CliArgs::try_parse_from(["deploybox", "analyze", "acme/widget"]).is_err());
        let args =
            CliArgs::parse_from(["deploybox", "analyze", "acme/widget", "--files", "files.txt"]);
        match args.command {
            Commands::Analyze(analyze) => {
                assert_eq!(analyze.files, PathBuf::from("files.txt"));
                assert!(analyze.output.is_none());
            }
            _ => panic!("Expected Analyze command"),
        }
    }

    #[test]
    fn test_logs_command() {
        let args = CliArgs::parse_from(["deploybox", "logs", "run-1", "-f", "yaml"]);
        match args.command {
            Commands::Logs(logs) => {
                assert_eq!(logs.run_id, "run-1");
                assert_eq!(logs.format, OutputFormatArg::Yaml);
            }
            _ => panic!("Expected Logs command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let args = CliArgs::parse_from(["deploybox", "-v", "health"]);
        assert!(args.verbose);
        assert!(!args.quiet);

        let args = CliArgs::parse_from(["deploybox", "--log-level", "debug", "health"]);
        assert_eq!(args.log_level, Some("debug".to_string()));
    }
}
