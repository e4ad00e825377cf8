use super::CliError;
use super::helpers::*;
use refl_core::{Session, SessionConfig};
use std::path::PathBuf;

#[derive(clap::Args)]
pub(super) struct NewArgs {
    /// Model JSON output path
    #[arg(long)]
    output: PathBuf,

    /// Model name (defaults to EasyModel)
    #[arg(long)]
    name: Option<String>,
}

#[derive(clap::Args)]
pub(super) struct ShowArgs {
    /// Model JSON file
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct ParametersArgs {
    /// Model JSON file
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Only list free, enabled and unconstrained parameters
    #[arg(long)]
    free: bool,
}

#[derive(clap::Args)]
pub(super) struct DuplicateAssemblyArgs {
    /// Model JSON file
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Position of the assembly to copy
    #[arg(long)]
    index: usize,

    /// Model JSON output path
    #[arg(long)]
    output: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct CheckArgs {
    /// Model JSON file
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Reject parameter values outside their bounds
    #[arg(long)]
    strict_bounds: bool,
}

pub(super) fn run_new_command(args: NewArgs) -> Result<i32, CliError> {
    let mut session = Session::new();
    let model = session.create_default_model()?;
    if let Some(name) = args.name.as_deref() {
        session.rename_model(&model, name)?;
    }
    write_model(&session, &model, &args.output)?;
    emit(&format!(
        "Wrote model '{}' ({}) to {}\n",
        session.model(&model)?.name(),
        model,
        args.output.display()
    ))?;
    Ok(0)
}

pub(super) fn run_show_command(args: ShowArgs) -> Result<i32, CliError> {
    let (session, model) = load_model(&args.file, SessionConfig::default())?;
    emit(&render_model_summary(&session, &model)?)?;
    Ok(0)
}

pub(super) fn run_parameters_command(args: ParametersArgs) -> Result<i32, CliError> {
    let (session, model) = load_model(&args.file, SessionConfig::default())?;
    let parameters = if args.free {
        session.fit_parameters(&model)?
    } else {
        session.model_parameters(&model)?
    };
    emit(&render_parameter_table(&session, &parameters)?)?;
    Ok(0)
}

pub(super) fn run_duplicate_assembly_command(args: DuplicateAssemblyArgs) -> Result<i32, CliError> {
    let (mut session, model) = load_model(&args.file, SessionConfig::default())?;
    let copy = session.duplicate_model_assembly(&model, args.index)?;
    write_model(&session, &model, &args.output)?;
    emit(&format!(
        "Appended '{}' ({}) to {}\n",
        session.assembly(&copy)?.name(),
        copy,
        args.output.display()
    ))?;
    Ok(0)
}

pub(super) fn run_check_command(args: CheckArgs) -> Result<i32, CliError> {
    let config = if args.strict_bounds {
        SessionConfig::strict()
    } else {
        SessionConfig::default()
    };
    let (session, model) = load_model(&args.file, config)?;
    if args.strict_bounds {
        check_bounds(&session, &model)?;
    }
    check_round_trip(&session, &model, config)?;

    let parameters = session.model_parameters(&model)?.len();
    let free = session.fit_parameters(&model)?.len();
    emit(&format!(
        "Check status: PASS\nModel: {} ({})\nParameters: {} ({} free)\n",
        session.model(&model)?.name(),
        model,
        parameters,
        free
    ))?;
    Ok(0)
}
