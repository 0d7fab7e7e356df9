//! kubectl-assistant Binary
//!
//! Entry point for `kubectl assistant`, installed on PATH as `kubectl-assistant`.

use clap::{CommandFactory, Parser};
use kube_assistant::cli::{map_error, rewrite_implicit_query, Cli, RunContext};
use kube_assistant::config::{AssistantConfig, ConfigLoader};
use kube_assistant::logging::{init_logging, resolve_log_file_path, LoggingConfig};
use std::process;
use tracing::{error, info};

fn main() {
    let args: Vec<_> = std::env::args_os().collect();
    if args.len() <= 1 {
        if let Err(e) = Cli::command().print_help() {
            eprintln!("Failed to print help: {}", e);
            process::exit(1);
        }
        println!();
        return;
    }
    let cli = Cli::parse_from(rewrite_implicit_query(args));

    let config = load_config();

    // Build logging config from CLI args, env vars, and config file
    let logging_config = build_logging_config(&cli, &config.logging);

    // Initialize logging early
    if let Err(e) = init_logging(&logging_config) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("kubectl-assistant starting");

    let context = match RunContext::new(config) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error initializing stores: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    };

    match context.execute(&cli.command) {
        Ok(output) => {
            info!("Command completed successfully");
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    }
}

/// Application config, or the defaults when the file or environment is invalid.
fn load_config() -> AssistantConfig {
    match ConfigLoader::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: {}; using default configuration", e);
            AssistantConfig::default()
        }
    }
}

/// Build logging configuration from CLI args on top of the loaded config.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli, base: &LoggingConfig) -> LoggingConfig {
    let mut config = base.clone();

    if cli.quiet {
        config.enabled = false;
    }
    let verbose = cli.command.session().map(|s| s.verbose).unwrap_or(false);
    if verbose {
        config.level = "debug".to_string();
        // An explicit --log-output value still takes precedence below.
        if config.output == "file" {
            config.output = "file+stderr".to_string();
        }
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }

    let output_uses_file = config.output == "file" || config.output == "file+stderr";
    if config.enabled && output_uses_file {
        if let Ok(path) = resolve_log_file_path(cli.log_file.clone(), config.file.clone()) {
            config.file = Some(path);
        }
    } else if let Some(ref file) = cli.log_file {
        config.file = Some(file.clone());
    }

    config
}
