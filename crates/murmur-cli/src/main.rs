//! CLI entry point - the composition root.
//!
//! Loads configuration, installs logging and dispatches to a handler.

use std::process::ExitCode;

use clap::{CommandFactory, Parser};

use murmur_cli::{Cli, CliConfig, CliError, Commands, handlers, logging};

async fn run(cli: Cli) -> Result<(), CliError> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = CliConfig::load(cli.config.as_deref())?;
    let mut stdout = std::io::stdout().lock();

    match command {
        Commands::Speak(args) => {
            handlers::speak::execute(&config, &args, &mut stdout).await?;
        }
        Commands::Config => {
            handlers::config::execute(&config, &mut stdout)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    logging::init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            eprintln!("Error: {err}");
            let code = u8::try_from(err.exit_code()).unwrap_or(1);
            Ok(ExitCode::from(code))
        }
    }
}
