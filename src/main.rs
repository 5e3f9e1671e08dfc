use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use dealrate::cli::reconcile::failure_message;
use dealrate::cli::ui::{StyleType, style_text};
use dealrate::core::log::init_logging;
use std::process::ExitCode;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Compare a deal's stored rate with the NBU rate
    Check {
        /// Deal record id; only the first is used
        #[arg(required = true)]
        entity_ids: Vec<String>,
        /// Evaluate this rate instead of the stored one
        #[arg(long)]
        rate: Option<String>,
    },
    /// Write the NBU rate into the deal when it diverges
    Update {
        /// Deal record id; only the first is used
        #[arg(required = true)]
        entity_ids: Vec<String>,
        /// Update even when the divergence is below the threshold
        #[arg(long)]
        force: bool,
    },
}

impl From<Commands> for dealrate::AppCommand {
    fn from(cmd: Commands) -> dealrate::AppCommand {
        match cmd {
            Commands::Check { entity_ids, rate } => {
                dealrate::AppCommand::Check { entity_ids, rate }
            }
            Commands::Update { entity_ids, force } => {
                dealrate::AppCommand::Update { entity_ids, force }
            }
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Setup) => dealrate::cli::setup::setup(),
        Some(cmd) => dealrate::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "Application failed");
            if let Some(message) = failure_message(&e) {
                eprintln!("{}", style_text(&message, StyleType::Error));
            }
            ExitCode::FAILURE
        }
    }
}
