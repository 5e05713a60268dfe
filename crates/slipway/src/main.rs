mod cli;
mod init;
mod release;

use clap::Parser;
use cli::{Cli, Commands};
use slipway_core::SlipwayError;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            let cwd = match std::env::current_dir() {
                Ok(dir) => dir,
                Err(e) => {
                    eprintln!("Failed to get current directory: {e}");
                    return ExitCode::from(1);
                }
            };
            match init::init_from_cwd(&cwd) {
                Ok(report) => {
                    println!("Initialized Slipway at {}", report.root.display());
                    let dir = report.root.join(".slipway");
                    if report.created_dir {
                        println!("  created: {}", dir.display());
                    }
                    if report.created_config {
                        println!("  created: {}", dir.join("config.toml").display());
                    }
                }
                Err(e) => {
                    report_failure("init error", &e);
                    return ExitCode::from(1);
                }
            }
        }
        Commands::Release(args) => {
            if let Err(e) = release::run(&args) {
                report_failure("Failed to release", &e);
                return ExitCode::from(1);
            }
        }
    }
    ExitCode::SUCCESS
}

/// Every failure is rendered as a multi-line report: validation failures
/// carry a prepared one, anything else gets a summary line plus the
/// underlying error as an itemized cause.
fn report_failure(context: &str, error: &SlipwayError) {
    for line in failure_report(context, error) {
        eprintln!("{line}");
    }
}

fn failure_report(context: &str, error: &SlipwayError) -> Vec<String> {
    match error {
        SlipwayError::Validation(validation) => validation.messages.clone(),
        SlipwayError::Git(message) => vec![
            "Could not release due to a Git error".to_string(),
            format!(" * {message}"),
        ],
        other => vec![context.to_string(), format!(" * {other}")],
    }
}
