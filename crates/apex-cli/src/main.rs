mod cli;
mod commands;
mod error;
mod logging;
mod mock;
mod output;

use clap::Parser;
use std::process::ExitCode;

use crate::cli::Cli;
use crate::error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_json);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            if let Err(render_error) = output::render(&error.to_json(), cli.pretty) {
                eprintln!("error: {render_error}");
            }
            ExitCode::from(error.exit_code())
        }
    }
}

async fn run(cli: &Cli) -> Result<(), CliError> {
    let document = commands::run(cli).await?;
    output::render(&document, cli.pretty)
}
