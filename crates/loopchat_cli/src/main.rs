//! loopchat CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Configuration error

use std::process::ExitCode;

use clap::Parser;
use loopchat_core::{ChatError, FaultKind};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands};

/// Process exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const CONFIG_ERROR: u8 = 3;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(
            EnvFilter::from_default_env()
                .add_directive(log_directive(cli.verbose).parse().unwrap())
                .add_directive("warn".parse().unwrap()),
        )
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let widget = cli.widget;
    let result = match cli.command {
        Commands::Chat(args) => commands::chat::execute(args, &widget).await,
        Commands::Send(args) => commands::send::execute(args, &widget).await,
        Commands::History(args) => commands::history::execute(args, &widget).await,
        Commands::Conversations(args) => commands::conversations::execute(args, &widget).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(categorize_error(&e))
        }
    }
}

/// Crate log level for the default filter
fn log_directive(verbose: bool) -> &'static str {
    if verbose {
        "loopchat=debug"
    } else {
        "loopchat=info"
    }
}

/// Map an error to an exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    match e.downcast_ref::<ChatError>().map(ChatError::kind) {
        Some(FaultKind::Config) => ExitCodes::CONFIG_ERROR,
        Some(FaultKind::Model) | Some(FaultKind::Validation) => ExitCodes::INVALID_ARGS,
        _ => ExitCodes::GENERAL_ERROR,
    }
}
