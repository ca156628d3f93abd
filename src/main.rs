use deploybox::cli::commands::{CliArgs, Commands};
use deploybox::cli::handlers::{handle_analyze, handle_deploy, handle_health, handle_logs};
use deploybox::util::logging::{init_logging, parse_level, LoggingConfig};
use deploybox::VERSION;

use clap::Parser;
use std::env;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("deploybox v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Deploy(deploy_args) => handle_deploy(deploy_args, args.quiet).await,
        Commands::Analyze(analyze_args) => handle_analyze(analyze_args).await,
        Commands::Logs(logs_args) => handle_logs(logs_args).await,
        Commands::Health(health_args) => handle_health(health_args).await,
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let level = if let Some(level_str) = &args.log_level {
        parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        let level_str = env::var("DEPLOYBOX_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        parse_level(&level_str)
    };

    let use_json = env::var("DEPLOYBOX_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    init_logging(LoggingConfig {
        use_json,
        ..LoggingConfig::with_level(level)
    });
}
