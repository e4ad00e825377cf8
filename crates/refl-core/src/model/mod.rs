//! Models: a sample with instrument scale, background and resolution,
//! optionally bound to a calculator.

mod collection;
mod resolution;

pub use collection::{DEFAULT_MATERIAL_COLLECTION_NAME, DEFAULT_MODEL_COLLECTION_NAME};
pub use resolution::{DEFAULT_RESOLUTION_PERCENT, ResolutionFunction};

use crate::domain::{AssemblyId, EntityKind, ModelId, ParameterId, ReflError, ReflResult, SampleId};
use crate::parameter::ParameterSpec;
use crate::serialization::{Importer, ModelRecord, append_duplicate_suffix};
use crate::session::Session;
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

pub const DEFAULT_MODEL_NAME: &str = "EasyModel";
pub const DEFAULT_SCALE: f64 = 1.0;
pub const DEFAULT_BACKGROUND: f64 = 1.0e-8;

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub(crate) id: ModelId,
    pub(crate) name: String,
    pub(crate) sample: SampleId,
    pub(crate) scale: ParameterId,
    pub(crate) background: ParameterId,
    pub(crate) resolution: ResolutionFunction,
    pub(crate) interface: Option<String>,
}

impl Model {
    pub fn id(&self) -> &ModelId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample(&self) -> &SampleId {
        &self.sample
    }

    pub fn scale(&self) -> &ParameterId {
        &self.scale
    }

    pub fn background(&self) -> &ParameterId {
        &self.background
    }

    pub fn resolution_function(&self) -> &ResolutionFunction {
        &self.resolution
    }

    /// Name of the attached calculator, if any.
    pub fn interface(&self) -> Option<&str> {
        self.interface.as_deref()
    }
}

pub(crate) fn scale_spec(value: f64) -> ParameterSpec {
    ParameterSpec::new("scale", value)
        .bounds(0.0, f64::INFINITY)
        .fixed(true)
}

pub(crate) fn background_spec(value: f64) -> ParameterSpec {
    ParameterSpec::new("background", value)
        .bounds(0.0, f64::INFINITY)
        .fixed(true)
}

impl Session {
    /// Model over `sample`, or over a fresh default sample.
    pub fn create_model(&mut self, name: &str, sample: Option<&SampleId>) -> ReflResult<ModelId> {
        let sample = match sample {
            Some(sample) => {
                self.sample(sample)?;
                sample.clone()
            }
            None => self.create_default_sample()?,
        };
        let id = self.mint(EntityKind::Model);
        let scale = self.add_parameter(&id, scale_spec(DEFAULT_SCALE))?;
        let background = self.add_parameter(&id, background_spec(DEFAULT_BACKGROUND))?;
        Ok(self.assemble_model(Model {
            id: ModelId::new(id),
            name: name.to_string(),
            sample,
            scale,
            background,
            resolution: ResolutionFunction::default(),
            interface: None,
        }))
    }

    pub fn create_default_model(&mut self) -> ReflResult<ModelId> {
        self.create_model(DEFAULT_MODEL_NAME, None)
    }

    pub(crate) fn assemble_model(&mut self, model: Model) -> ModelId {
        let id = model.id.clone();
        self.registry.link(id.as_str(), model.sample.as_str());
        debug!(model = %id, sample = %model.sample, "model created");
        self.models.insert(id.clone(), model);
        id
    }

    pub fn rename_model(&mut self, id: &ModelId, name: &str) -> ReflResult<()> {
        self.model_mut(id)?.name = name.to_string();
        Ok(())
    }

    pub fn set_scale(&mut self, id: &ModelId, scale: f64) -> ReflResult<()> {
        let parameter = self.model(id)?.scale.clone();
        self.set_parameter_value(&parameter, scale)
    }

    pub fn set_background(&mut self, id: &ModelId, background: f64) -> ReflResult<()> {
        let parameter = self.model(id)?.background.clone();
        self.set_parameter_value(&parameter, background)
    }

    /// Appends `items` to the model's sample; an empty slice adds one default
    /// multilayer. Every item is checked before the sample changes.
    pub fn add_assemblies(&mut self, id: &ModelId, items: &[AssemblyId]) -> ReflResult<Vec<AssemblyId>> {
        let sample = self.model(id)?.sample.clone();
        for item in items {
            self.assembly(item)?;
        }
        let items = if items.is_empty() {
            vec![self.create_default_multilayer()?]
        } else {
            items.to_vec()
        };
        for item in &items {
            self.sample_add_assembly(&sample, item)?;
        }
        Ok(items)
    }

    pub fn remove_assembly(&mut self, id: &ModelId, index: usize) -> ReflResult<AssemblyId> {
        let sample = self.model(id)?.sample.clone();
        self.sample_remove_assembly(&sample, index)
    }

    pub fn duplicate_model_assembly(&mut self, id: &ModelId, index: usize) -> ReflResult<AssemblyId> {
        let sample = self.model(id)?.sample.clone();
        self.sample_duplicate_assembly(&sample, index)
    }

    pub fn move_assembly_up(&mut self, id: &ModelId, index: usize) -> ReflResult<()> {
        let sample = self.model(id)?.sample.clone();
        self.sample_move_assembly_up(&sample, index)
    }

    pub fn move_assembly_down(&mut self, id: &ModelId, index: usize) -> ReflResult<()> {
        let sample = self.model(id)?.sample.clone();
        self.sample_move_assembly_down(&sample, index)
    }

    pub fn set_resolution_function(
        &mut self,
        id: &ModelId,
        resolution: ResolutionFunction,
    ) -> ReflResult<()> {
        resolution.validate()?;
        self.model_mut(id)?.resolution = resolution;
        self.push_resolution(id);
        Ok(())
    }

    /// Attaches the named calculator and describes the full structure to
    /// it, or detaches with `None`.
    pub fn set_interface(&mut self, id: &ModelId, interface: Option<&str>) -> ReflResult<()> {
        self.model(id)?;
        match interface {
            Some(name) => {
                self.factory.ensure_known(name)?;
                self.attach_calculator(id, name)?;
            }
            None => {
                self.detach_calculator(id);
            }
        }
        self.model_mut(id)?.interface = interface.map(str::to_string);
        Ok(())
    }

    /// Swaps the model's sample. The previous sample is released when
    /// nothing else holds it; an attached calculator is rebuilt.
    pub fn set_sample(&mut self, id: &ModelId, sample: &SampleId) -> ReflResult<()> {
        self.sample(sample)?;
        let previous = self.model(id)?.sample.clone();
        if &previous == sample {
            return Ok(());
        }
        self.registry.unlink(id.as_str(), previous.as_str());
        self.registry.link(id.as_str(), sample.as_str());
        self.model_mut(id)?.sample = sample.clone();
        self.release_sample(&previous);
        if let Some(interface) = self.model(id)?.interface.clone() {
            self.attach_calculator(id, &interface)?;
        }
        debug!(model = %id, previous = %previous, sample = %sample, "sample replaced");
        Ok(())
    }

    pub fn reflectivity(&mut self, id: &ModelId, q: &[f64]) -> ReflResult<Vec<f64>> {
        self.model(id)?;
        self.calculators
            .get_mut(id)
            .ok_or_else(|| no_calculator(id))?
            .calculator_mut()
            .fit_func(q, id.as_str())
    }

    pub fn sld_profile(&mut self, id: &ModelId) -> ReflResult<(Vec<f64>, Vec<f64>)> {
        self.model(id)?;
        self.calculators
            .get_mut(id)
            .ok_or_else(|| no_calculator(id))?
            .calculator_mut()
            .sld_profile(id.as_str())
    }

    /// Every parameter reachable from the model, depth first in structure
    /// order, each once.
    pub fn model_parameters(&self, id: &ModelId) -> ReflResult<Vec<ParameterId>> {
        self.model(id)?;
        let mut seen = BTreeSet::new();
        let mut parameters = Vec::new();
        let mut stack = vec![id.to_string()];
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if self.registry.kind_of(&current) == Some(EntityKind::Parameter) {
                parameters.push(ParameterId::new(current));
                continue;
            }
            stack.extend(self.registry.children_of(&current).iter().rev().cloned());
        }
        Ok(parameters)
    }

    /// Free, enabled and unconstrained parameters of the model.
    pub fn fit_parameters(&self, id: &ModelId) -> ReflResult<Vec<ParameterId>> {
        Ok(self
            .model_parameters(id)?
            .into_iter()
            .filter(|parameter| self.parameters.is_fittable(parameter))
            .collect())
    }

    pub fn model_as_dict(&self, id: &ModelId) -> ReflResult<Value> {
        Ok(serde_json::to_value(self.model_record(id)?)?)
    }

    pub fn model_from_dict(&mut self, value: &Value) -> ReflResult<ModelId> {
        let record: ModelRecord = serde_json::from_value(value.clone())?;
        Importer::new(self).run(
            |importer| importer.validate_model(&record),
            |importer| importer.import_model(&record),
        )
    }

    pub fn duplicate_model(&mut self, id: &ModelId) -> ReflResult<ModelId> {
        let original = self.model_record(id)?;
        let mut record = self.duplicate_record(&original)?;
        append_duplicate_suffix(&mut record.name);
        Importer::new(self).run(
            |importer| importer.validate_model(&record),
            |importer| importer.import_model(&record),
        )
    }

    pub(crate) fn release_model(&mut self, id: &ModelId) -> bool {
        if self.registry.has_parents(id.as_str()) {
            return false;
        }
        let Some(model) = self.models.remove(id) else {
            return false;
        };
        self.detach_calculator(id);
        self.drop_parameter(&model.scale);
        self.drop_parameter(&model.background);
        self.deregister(id.as_str());
        self.release_sample(&model.sample);
        debug!(model = %id, "model released");
        true
    }
}

fn no_calculator(id: &ModelId) -> ReflError {
    ReflError::lookup(
        "LOOKUP.CALCULATOR",
        format!("model '{}' has no calculator interface set", id),
    )
}
