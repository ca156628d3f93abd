//! Command handlers
//!
//! Each handler returns the process exit code. Errors are reported on stderr
//! and map to exit code 1.

use super::commands::{AnalyzeArgs, DeployArgs, HealthArgs, LogsArgs};
use super::output::{AnalysisReport, OutputFormat, OutputFormatter, ToolStatus};
use crate::analysis::{FileDescriptorCache, ProjectAnalyzer, ProjectSnapshot};
use crate::artifacts::{ArtifactGenerator, ArtifactStore};
use crate::config::DeployboxConfig;
use crate::container::{daemon, image_tag};
use crate::execution_log::{JsonlLogSink, LogSink};
use crate::pipeline::steps::analyze::analysis_id;
use crate::pipeline::{
    Collaborators, PipelineConfig, PipelineOrchestrator, Recommendation, RunIdentity, RunOptions,
};
use crate::source::SourceReference;
use crate::util::process::{run_command, CommandSpec};
use anyhow::{Context, Result};
use chrono::Utc;
use genai::adapter::AdapterKind;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

const TOOL_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

fn report_error(e: &anyhow::Error) -> i32 {
    error!("{:#}", e);
    eprintln!("Error: {:#}", e);
    1
}

fn load_config(provider: Option<AdapterKind>, model: Option<&String>) -> Result<DeployboxConfig> {
    let mut config = DeployboxConfig::default();
    if let Some(provider) = provider {
        config.provider = provider;
    }
    if let Some(model) = model {
        config.model = model.clone();
    }
    config.validate().context("Invalid configuration")?;
    debug!("{}", config);
    Ok(config)
}

async fn read_file_list(path: &Path) -> Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read file list {}", path.display()))?;
    Ok(content
        .lines()
        .map(|l| l.trim().trim_start_matches("./").to_string())
        .filter(|l| !l.is_empty())
        .collect())
}

async fn read_optional(path: Option<&Path>) -> Result<Option<String>> {
    match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .map(Some)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => Ok(None),
    }
}

fn print_output(text: &str) {
    if text.ends_with('\n') {
        print!("{}", text);
    } else {
        println!("{}", text);
    }
}

pub async fn handle_deploy(args: &DeployArgs, quiet: bool) -> i32 {
    match run_deploy(args, quiet).await {
        Ok(code) => code,
        Err(e) => report_error(&e),
    }
}

async fn run_deploy(args: &DeployArgs, quiet: bool) -> Result<i32> {
    let config = load_config(args.provider, args.model.as_ref())?;
    let pipeline = PipelineConfig::from_config(&config).context("Deployment is not configured")?;
    let deps = Collaborators::from_config(&config, &pipeline)
        .context("Failed to initialize collaborators")?;

    let mut options = RunOptions::new();
    if let Some(run_id) = &args.run_id {
        options = options.with_run_id(run_id.clone());
    }
    if let Some(url) = &args.health_url {
        options = options.with_health_url(url.clone());
    }
    if let Some(files) = &args.files {
        let files = read_file_list(files).await?;
        let readme = read_optional(args.readme.as_deref()).await?;
        options = options.with_snapshot(files, readme);
    }

    let orchestrator = PipelineOrchestrator::new(deps, pipeline);
    let result = orchestrator
        .run(SourceReference::new(&args.repository, &args.git_ref), options)
        .await;

    let format: OutputFormat = args.format.into();
    if !(quiet && result.is_success() && format == OutputFormat::Human) {
        print_output(&OutputFormatter::new(format).format_result(&result)?);
    }
    Ok(if result.is_success() { 0 } else { 1 })
}

pub async fn handle_analyze(args: &AnalyzeArgs) -> i32 {
    match run_analyze(args).await {
        Ok(()) => 0,
        Err(e) => report_error(&e),
    }
}

async fn run_analyze(args: &AnalyzeArgs) -> Result<()> {
    let config = load_config(args.provider, args.model.as_ref())?;
    let bounds = PipelineConfig::default();
    let llm = config
        .create_llm_client()
        .context("Failed to create LLM client")?;

    let analyzer = ProjectAnalyzer::new(llm.clone(), Arc::new(FileDescriptorCache::new(config.cache_path())))
        .with_bounds(bounds.analyzer_max_paths, bounds.analyzer_max_readme_bytes);
    let generator = ArtifactGenerator::new(llm)
        .with_bounds(bounds.generator_max_paths, bounds.generator_max_readme_bytes);

    let snapshot = ProjectSnapshot::new(
        read_file_list(&args.files).await?,
        read_optional(args.readme.as_deref()).await?,
    );
    let source = SourceReference::new(&args.repository, &args.git_ref);
    let repository = source.identity();
    let run_id = RunIdentity::generate_id();
    info!(repository = %repository, run_id = %run_id, files = snapshot.files.len(), "Analyzing project offline");

    let known = analyzer.known_deployments(&repository);
    let outcome = analyzer
        .analyze(&repository, &args.git_ref, &run_id, &snapshot, &known)
        .await;

    let id = analysis_id(&repository, &args.git_ref, &Utc::now().to_rfc3339());
    let generated = generator
        .generate(
            &outcome.descriptor,
            snapshot.readme.as_deref(),
            &snapshot.files,
            &id,
            &image_tag(&run_id),
        )
        .await;

    let store = ArtifactStore::new(
        args.output
            .clone()
            .unwrap_or_else(|| config.artifacts_dir()),
    );
    let locations = store
        .persist(&run_id, &generated.bundle)
        .context("Failed to write artifacts")?;

    let report = AnalysisReport {
        repository,
        revision: args.git_ref.clone(),
        recommendation: Recommendation::assess(
            Some(outcome.descriptor.confidence),
            generated.bundle.container_build_file().is_some(),
        ),
        descriptor: outcome.descriptor,
        descriptor_source: outcome.source,
        note: outcome.note.or(generated.note),
        artifacts: generated.bundle.kinds(),
        generation_source: generated.source,
        fixups_applied: generated.fixups_applied,
        artifact_locations: locations
            .into_iter()
            .map(|(kind, path)| (kind, path.display().to_string()))
            .collect(),
    };

    print_output(&OutputFormatter::new(args.format.into()).format_analysis(&report)?);
    Ok(())
}

pub async fn handle_logs(args: &LogsArgs) -> i32 {
    let config = DeployboxConfig::default();
    let sink = JsonlLogSink::new(config.log_dir());

    let result = sink
        .read(&args.run_id)
        .with_context(|| format!("Failed to read execution log for {}", args.run_id))
        .and_then(|records| OutputFormatter::new(args.format.into()).format_log(&records));

    match result {
        Ok(text) => {
            print_output(&text);
            0
        }
        Err(e) => report_error(&e),
    }
}

async fn check_tool(name: &str, args: &[&str]) -> ToolStatus {
    let spec = CommandSpec::new(name, TOOL_CHECK_TIMEOUT).args(args.iter().copied());
    match run_command(&spec).await {
        Ok(output) => {
            let text = if output.stdout.trim().is_empty() {
                output.stderr
            } else {
                output.stdout
            };
            ToolStatus {
                name: name.to_string(),
                available: true,
                detail: text.lines().next().unwrap_or_default().trim().to_string(),
            }
        }
        Err(e) => ToolStatus {
            name: name.to_string(),
            available: false,
            detail: e.to_string(),
        },
    }
}

pub async fn handle_health(args: &HealthArgs) -> i32 {
    let mut tools = vec![
        check_tool("git", &["--version"]).await,
        check_tool("aws", &["--version"]).await,
    ];
    tools.push(match daemon::docker_daemon_version().await {
        Some(version) => ToolStatus {
            name: "docker".to_string(),
            available: true,
            detail: format!("daemon {}", version),
        },
        None => ToolStatus {
            name: "docker".to_string(),
            available: false,
            detail: "daemon not reachable".to_string(),
        },
    });

    match OutputFormatter::new(args.format.into()).format_health(&tools) {
        Ok(text) => print_output(&text),
        Err(e) => return report_error(&e),
    }

    if tools.iter().all(|t| t.available) {
        0
    } else {
        1
    }
}
