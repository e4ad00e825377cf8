mod commands;
mod helpers;

use clap::Parser;
use refl_core::ReflError;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().collect();
    match parse_and_dispatch(args) {
        Ok(code) => code,
        Err(error) => {
            let refl_error = error.as_refl_error();
            eprintln!("{}", refl_error.diagnostic_line());
            refl_error.exit_code()
        }
    }
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => dispatch_parsed(cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "refl-rs",
    version,
    about = "Build, inspect and check layered reflectometry models"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Write a default model to a JSON file
    New(commands::NewArgs),
    /// Print the structure of a model file
    Show(commands::ShowArgs),
    /// List the parameters of a model file
    Parameters(commands::ParametersArgs),
    /// Append a deep copy of one assembly and write the result
    DuplicateAssembly(commands::DuplicateAssemblyArgs),
    /// Verify that a model file loads and round-trips unchanged
    Check(commands::CheckArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::New(args) => commands::run_new_command(args),
        CliCommand::Show(args) => commands::run_show_command(args),
        CliCommand::Parameters(args) => commands::run_parameters_command(args),
        CliCommand::DuplicateAssembly(args) => commands::run_duplicate_assembly_command(args),
        CliCommand::Check(args) => commands::run_check_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(ReflError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<ReflError> for CliError {
    fn from(error: ReflError) -> Self {
        Self::Compute(error)
    }
}

impl CliError {
    fn as_refl_error(&self) -> ReflError {
        match self {
            Self::Usage(message) => {
                ReflError::validation("VALIDATION.CLI_USAGE", message.trim_end().to_string())
            }
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => ReflError::internal("SYS.CLI", format!("{error:#}")),
        }
    }
}
