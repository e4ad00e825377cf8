use super::CliError;
use anyhow::Context;
use refl_core::serialization::io::{read_document, write_document};
use refl_core::{
    AssemblyShape, ModelId, ParameterId, ReflError, ReflResult, ResolutionFunction, Session,
    SessionConfig,
};
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;
use tracing::debug;

/// Session holding the single model stored in `path`.
pub(super) fn load_model(path: &Path, config: SessionConfig) -> Result<(Session, ModelId), CliError> {
    let document = read_document(path)?;
    let mut session = Session::with_config(config);
    let model = session.model_from_dict(&document)?;
    debug!(path = %path.display(), model = %model, "model loaded");
    Ok((session, model))
}

pub(super) fn write_model(session: &Session, model: &ModelId, path: &Path) -> Result<(), CliError> {
    let document = session.model_as_dict(model)?;
    write_document(path, &document)?;
    debug!(path = %path.display(), model = %model, "model written");
    Ok(())
}

pub(super) fn emit(text: &str) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .and_then(|()| stdout.flush())
        .context("failed to write to stdout")?;
    Ok(())
}

fn describe_resolution(resolution: &ResolutionFunction) -> String {
    match resolution {
        ResolutionFunction::PercentageFwhm { constant } => format!("{}% FWHM", constant),
        ResolutionFunction::LinearSpline { q_data_points, .. } => {
            format!("linear spline over {} points", q_data_points.len())
        }
    }
}

pub(super) fn render_model_summary(session: &Session, id: &ModelId) -> ReflResult<String> {
    let model = session.model(id)?;
    let sample = session.sample(model.sample())?;
    let mut out = String::new();

    let _ = writeln!(out, "Model: {} ({})", model.name(), id);
    let _ = writeln!(out, "  scale: {}", session.value(model.scale())?);
    let _ = writeln!(out, "  background: {}", session.value(model.background())?);
    let _ = writeln!(out, "  resolution: {}", describe_resolution(model.resolution_function()));
    let _ = writeln!(out, "Sample: {} ({})", sample.name(), sample.id());

    for (index, assembly_id) in sample.assemblies().iter().enumerate() {
        let assembly = session.assembly(assembly_id)?;
        let _ = write!(
            out,
            "  [{}] {} ({}, {})",
            index,
            assembly.name(),
            assembly.variant_name(),
            assembly_id
        );
        if let Some(repetitions) = assembly.repetitions() {
            let _ = write!(out, " x{}", session.value(repetitions)?);
        }
        out.push('\n');

        for layer_id in assembly.layers().iter() {
            let layer = session.layer(layer_id)?;
            let material = session.material(layer.material())?;
            let _ = writeln!(
                out,
                "      {:<20} {:<24} thickness={} roughness={} sld={}",
                layer.name(),
                material.name(),
                session.value(layer.thickness())?,
                session.value(layer.roughness())?,
                session.value(material.sld())?
            );
        }
    }

    if let Some(superphase) = sample.superphase() {
        let _ = writeln!(out, "Superphase: {}", session.layer(superphase)?.name());
    }
    if let Some(subphase) = sample.subphase() {
        let _ = writeln!(out, "Subphase: {}", session.layer(subphase)?.name());
    }
    Ok(out)
}

pub(super) fn render_parameter_table(session: &Session, parameters: &[ParameterId]) -> ReflResult<String> {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<16} {:<20} {:>14} {:<12} {}",
        "id", "name", "value", "unit", "state"
    );
    for id in parameters {
        let parameter = session.parameter(id)?;
        let state = if !parameter.enabled() {
            "disabled"
        } else if session.parameters().is_constrained(id) {
            "constrained"
        } else if parameter.fixed() {
            "fixed"
        } else {
            "free"
        };
        let _ = writeln!(
            out,
            "{:<16} {:<20} {:>14} {:<12} {}",
            id,
            parameter.name(),
            parameter.value(),
            parameter.unit(),
            state
        );
    }
    Ok(out)
}

/// First model parameter whose value lies outside its bounds.
pub(super) fn check_bounds(session: &Session, model: &ModelId) -> ReflResult<()> {
    for id in session.model_parameters(model)? {
        let parameter = session.parameter(&id)?;
        if !parameter.in_bounds(parameter.value()) {
            return Err(ReflError::validation(
                "VALIDATION.OUT_OF_BOUNDS",
                format!(
                    "value {} for parameter '{}' ({}) is outside [{}, {}]",
                    parameter.value(),
                    parameter.name(),
                    id,
                    parameter.min(),
                    parameter.max()
                ),
            ));
        }
    }
    Ok(())
}

/// Exports `model`, imports it into a fresh session and compares the two
/// documents.
pub(super) fn check_round_trip(session: &Session, model: &ModelId, config: SessionConfig) -> ReflResult<()> {
    let exported = session.model_as_dict(model)?;
    let mut fresh = Session::with_config(config);
    let restored = fresh.model_from_dict(&exported)?;
    if fresh.model_as_dict(&restored)? == exported {
        Ok(())
    } else {
        Err(ReflError::internal(
            "SYS.ROUND_TRIP",
            format!("model '{}' changed after an export and import cycle", model),
        ))
    }
}
