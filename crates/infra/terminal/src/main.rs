//! bikego-otp binary.

use bikego_terminal::{init_tracing, App, Cli, CliError, Console, TerminalConfig};
use clap::Parser;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match TerminalConfig::load(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(cli.log_level.as_deref().unwrap_or(&config.log_level));

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Aborted) => ExitCode::from(130),
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: TerminalConfig) -> Result<(), CliError> {
    let app = App::from_config(config)?;
    let mut console = Console::new(tokio::io::stdin(), std::io::stdout());
    app.run(cli.command, &mut console).await
}
