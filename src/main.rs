use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use curvas::log::init_logging;

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

impl From<Commands> for curvas::AppCommand {
    fn from(cmd: Commands) -> curvas::AppCommand {
        match cmd {
            Commands::Fit => curvas::AppCommand::Fit,
            Commands::Compare => curvas::AppCommand::Compare,
            Commands::Bands => curvas::AppCommand::Bands,
            Commands::Series { identifier } => curvas::AppCommand::Series { identifier },
            Commands::Status => curvas::AppCommand::Status,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fit the disbursement curve for the configured filters
    Fit,
    /// Fit the configured comparison curves on a shared axis
    Compare,
    /// Display normalized prediction bands
    Bands,
    /// Display the disbursement timeseries of one project
    Series {
        /// IATI identifier of the project
        identifier: String,
    },
    /// Check API health and the filter catalog
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => curvas::cli::setup::setup(),
        Some(cmd) => curvas::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
