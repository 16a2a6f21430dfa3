mod cli;
mod commands;
mod errors;
mod tracing;

use crate::cli::parse;
use crate::commands::Command;
use crate::errors::CliResult;
use crate::tracing::{TracingConfig, TracingFormat};
use ::tracing::{Instrument, instrument};
use std::io::Write;
use std::process::ExitCode;

#[tokio::main]
#[allow(clippy::print_stderr)]
async fn main() -> ExitCode {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    match run_main().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run_main() -> miette::Result<()> {
    let cli = parse();

    let tracing_config = TracingConfig {
        format: if cli.json {
            TracingFormat::Json
        } else {
            cli.log_format
        },
        enable_file_location: cli.log_format == TracingFormat::Dev,
        level: cli.level.into(),
        ..Default::default()
    };
    crate::tracing::init_tracing(tracing_config)?;

    let command: Command = cli.command.into();
    let span = command_span!(command.name());
    execute_command(command).instrument(span).await?;
    Ok(())
}

#[instrument(skip_all)]
async fn execute_command(command: Command) -> CliResult<()> {
    let stdout = std::io::stdout();

    match command {
        Command::Version => {
            writeln!(stdout.lock(), "{}", commands::version::get_version_info())?;
            Ok(())
        }
        Command::Generate(args) => {
            let report = commands::generate::execute(args, stdout).await?;
            commands::generate::check(&report)
        }
        Command::Closure { name, cwd, policy } => {
            commands::closure::execute(&name, &cwd, policy, stdout.lock())
        }
    }
}
