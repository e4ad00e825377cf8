//! The session owns every entity arena, the parameter store and the identity
//! registry. Entity modules extend it with their own `impl Session` blocks.

use crate::assembly::Assembly;
use crate::calculator::{Calculator, CalculatorBinding, CalculatorFactory};
use crate::collection::Collection;
use crate::common::{ElementData, NeutronScatteringTable, SessionConfig};
use crate::domain::{
    AssemblyId, CollectionId, EntityKind, LayerId, MaterialId, ModelId, ParameterId, ReflError,
    ReflResult, SampleId,
};
use crate::layer::Layer;
use crate::material::Material;
use crate::model::Model;
use crate::parameter::{
    ConstraintId, Parameter, ParameterSpec, ParameterStore, Relation, check_bounds,
};
use crate::registry::IdentityRegistry;
use crate::sample::Sample;
use crate::serialization::ParameterRecord;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use tracing::debug;

#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    pub(crate) registry: IdentityRegistry,
    pub(crate) parameters: ParameterStore,
    pub(crate) elements: Box<dyn ElementData>,
    pub(crate) materials: BTreeMap<MaterialId, Material>,
    pub(crate) layers: BTreeMap<LayerId, Layer>,
    pub(crate) assemblies: BTreeMap<AssemblyId, Assembly>,
    pub(crate) samples: BTreeMap<SampleId, Sample>,
    pub(crate) models: BTreeMap<ModelId, Model>,
    pub(crate) material_collections: BTreeMap<CollectionId, Collection<MaterialId>>,
    pub(crate) model_collections: BTreeMap<CollectionId, Collection<ModelId>>,
    pub(crate) calculators: BTreeMap<ModelId, CalculatorBinding>,
    pub(crate) factory: CalculatorFactory,
}

impl Default for Session {
    fn default() -> Self {
        Self::with_config(SessionConfig::default())
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            config,
            registry: IdentityRegistry::new(),
            parameters: ParameterStore::new(config.bounds_policy),
            elements: Box::new(NeutronScatteringTable),
            materials: BTreeMap::new(),
            layers: BTreeMap::new(),
            assemblies: BTreeMap::new(),
            samples: BTreeMap::new(),
            models: BTreeMap::new(),
            material_collections: BTreeMap::new(),
            model_collections: BTreeMap::new(),
            calculators: BTreeMap::new(),
            factory: CalculatorFactory::new(),
        }
    }

    pub fn with_element_data(mut self, data: impl ElementData + 'static) -> Self {
        self.elements = Box::new(data);
        self
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    pub fn parameters(&self) -> &ParameterStore {
        &self.parameters
    }

    pub fn element_data(&self) -> &dyn ElementData {
        self.elements.as_ref()
    }

    pub fn calculator_factory(&self) -> &CalculatorFactory {
        &self.factory
    }

    pub fn register_calculator(
        &mut self,
        name: impl Into<String>,
        constructor: impl Fn() -> Box<dyn Calculator> + Send + Sync + 'static,
    ) {
        self.factory.register(name, constructor);
    }

    pub fn find_path(&self, from: &str, to: &str) -> Vec<String> {
        self.registry.find_path(from, to)
    }

    /// Drops every entity, parameter and attached calculator. Registered
    /// calculator constructors and the configuration survive.
    pub fn clear(&mut self) {
        self.registry.clear();
        self.parameters.clear();
        self.materials.clear();
        self.layers.clear();
        self.assemblies.clear();
        self.samples.clear();
        self.models.clear();
        self.material_collections.clear();
        self.model_collections.clear();
        self.calculators.clear();
        debug!("session cleared");
    }

    pub fn parameter(&self, id: &ParameterId) -> ReflResult<&Parameter> {
        self.parameters.get(id)
    }

    pub fn value(&self, id: &ParameterId) -> ReflResult<f64> {
        self.parameters.value(id)
    }

    pub fn set_parameter_value(&mut self, id: &ParameterId, value: f64) -> ReflResult<()> {
        self.parameters.set_value(id, value)?;
        self.flush();
        Ok(())
    }

    pub fn set_parameter_fixed(&mut self, id: &ParameterId, fixed: bool) -> ReflResult<()> {
        self.parameters.set_fixed(id, fixed)
    }

    pub fn set_parameter_bounds(&mut self, id: &ParameterId, min: f64, max: f64) -> ReflResult<()> {
        self.parameters.set_bounds(id, min, max)
    }

    pub fn bind_constraint(
        &mut self,
        output: &ParameterId,
        inputs: &[ParameterId],
        relation: Relation,
    ) -> ReflResult<ConstraintId> {
        let id = self.parameters.bind_constraint(output, inputs, relation)?;
        self.flush();
        Ok(id)
    }

    pub fn unbind_constraint(&mut self, output: &ParameterId) -> bool {
        self.parameters.unbind(output)
    }

    pub(crate) fn mint(&mut self, kind: EntityKind) -> String {
        self.registry.mint(kind)
    }

    /// Registers a restored identifier, or mints a fresh one when the record
    /// carries none.
    pub(crate) fn claim(&mut self, kind: EntityKind, id: Option<&str>) -> ReflResult<String> {
        match id {
            Some(id) => {
                self.registry.register(id, kind)?;
                Ok(id.to_string())
            }
            None => Ok(self.mint(kind)),
        }
    }

    pub(crate) fn add_parameter(&mut self, owner: &str, spec: ParameterSpec) -> ReflResult<ParameterId> {
        check_bounds(&spec.name, spec.min, spec.max)?;
        let id = ParameterId::new(self.mint(EntityKind::Parameter));
        self.parameters.insert(id.clone(), spec)?;
        self.registry.link(owner, id.as_str());
        Ok(id)
    }

    /// Rebuilds a parameter from its record on top of `template`, which
    /// supplies the owner-defined policy (enforced bounds). Only free
    /// `Parameter_*` identifiers are kept; anything else gets a fresh one.
    pub(crate) fn restore_parameter(
        &mut self,
        owner: &str,
        record: &ParameterRecord,
        template: ParameterSpec,
    ) -> ReflResult<ParameterId> {
        let spec = record.apply_to(template);
        check_bounds(&spec.name, spec.min, spec.max)?;
        let id = match record.unique_name.as_deref() {
            Some(name)
                if !self.registry.contains(name)
                    && EntityKind::from_prefix(name) == Some(EntityKind::Parameter) =>
            {
                self.registry.register(name, EntityKind::Parameter)?;
                ParameterId::new(name)
            }
            _ => ParameterId::new(self.mint(EntityKind::Parameter)),
        };
        self.parameters.insert(id.clone(), spec)?;
        self.registry.link(owner, id.as_str());
        Ok(id)
    }

    pub(crate) fn parameter_from(
        &mut self,
        owner: &str,
        source: ParamSource<'_>,
    ) -> ReflResult<ParameterId> {
        match source {
            ParamSource::Fresh(spec) => self.add_parameter(owner, spec),
            ParamSource::Restored(record, template) => {
                self.restore_parameter(owner, record, template)
            }
        }
    }

    pub(crate) fn drop_parameter(&mut self, id: &ParameterId) {
        self.parameters.remove(id);
        self.deregister(id.as_str());
    }

    /// Drops a released identifier from the registry and from every attached
    /// calculator's record of what it has been told.
    pub(crate) fn deregister(&mut self, id: &str) {
        self.registry.deregister(id);
        for binding in self.calculators.values_mut() {
            binding.forget(id);
        }
    }

    /// Removes every entity and parameter registered after `known` was taken.
    /// Imports only ever add entities, so this undoes a partial one.
    pub(crate) fn discard_unknown(&mut self, known: &BTreeSet<String>) {
        let added: Vec<(String, EntityKind)> = self
            .registry
            .ids()
            .filter(|(id, _)| !known.contains(*id))
            .map(|(id, kind)| (id.to_string(), kind))
            .collect();
        for (id, kind) in &added {
            match kind {
                EntityKind::Parameter => {
                    self.parameters.remove(&ParameterId::new(id.as_str()));
                }
                kind if kind.is_material() => {
                    self.materials.remove(&MaterialId::new(id.as_str()));
                }
                kind if kind.is_layer() => {
                    self.layers.remove(&LayerId::new(id.as_str()));
                }
                kind if kind.is_assembly() => {
                    self.assemblies.remove(&AssemblyId::new(id.as_str()));
                }
                EntityKind::Sample => {
                    self.samples.remove(&SampleId::new(id.as_str()));
                }
                EntityKind::Model => {
                    self.models.remove(&ModelId::new(id.as_str()));
                    self.calculators.remove(&ModelId::new(id.as_str()));
                }
                EntityKind::MaterialCollection => {
                    self.material_collections.remove(&CollectionId::new(id.as_str()));
                }
                EntityKind::ModelCollection => {
                    self.model_collections.remove(&CollectionId::new(id.as_str()));
                }
                _ => {}
            }
        }
        for (id, _) in &added {
            self.deregister(id);
        }
        self.parameters.drain_changes();
        debug!(discarded = added.len(), "partial import discarded");
    }

    pub fn material(&self, id: &MaterialId) -> ReflResult<&Material> {
        self.materials.get(id).ok_or_else(|| missing("material", id))
    }

    pub fn layer(&self, id: &LayerId) -> ReflResult<&Layer> {
        self.layers.get(id).ok_or_else(|| missing("layer", id))
    }

    pub fn assembly(&self, id: &AssemblyId) -> ReflResult<&Assembly> {
        self.assemblies.get(id).ok_or_else(|| missing("assembly", id))
    }

    pub fn sample(&self, id: &SampleId) -> ReflResult<&Sample> {
        self.samples.get(id).ok_or_else(|| missing("sample", id))
    }

    pub fn model(&self, id: &ModelId) -> ReflResult<&Model> {
        self.models.get(id).ok_or_else(|| missing("model", id))
    }

    pub fn material_ids(&self) -> impl Iterator<Item = &MaterialId> {
        self.materials.keys()
    }

    pub fn layer_ids(&self) -> impl Iterator<Item = &LayerId> {
        self.layers.keys()
    }

    pub fn assembly_ids(&self) -> impl Iterator<Item = &AssemblyId> {
        self.assemblies.keys()
    }

    pub fn sample_ids(&self) -> impl Iterator<Item = &SampleId> {
        self.samples.keys()
    }

    pub fn model_ids(&self) -> impl Iterator<Item = &ModelId> {
        self.models.keys()
    }

    pub(crate) fn material_mut(&mut self, id: &MaterialId) -> ReflResult<&mut Material> {
        self.materials.get_mut(id).ok_or_else(|| missing("material", id))
    }

    pub(crate) fn layer_mut(&mut self, id: &LayerId) -> ReflResult<&mut Layer> {
        self.layers.get_mut(id).ok_or_else(|| missing("layer", id))
    }

    pub(crate) fn assembly_mut(&mut self, id: &AssemblyId) -> ReflResult<&mut Assembly> {
        self.assemblies.get_mut(id).ok_or_else(|| missing("assembly", id))
    }

    pub(crate) fn sample_mut(&mut self, id: &SampleId) -> ReflResult<&mut Sample> {
        self.samples.get_mut(id).ok_or_else(|| missing("sample", id))
    }

    pub(crate) fn model_mut(&mut self, id: &ModelId) -> ReflResult<&mut Model> {
        self.models.get_mut(id).ok_or_else(|| missing("model", id))
    }

    /// Pushes every parameter written since the last flush to the attached
    /// calculators that bind it.
    pub(crate) fn flush(&mut self) {
        let changes = self.parameters.drain_changes();
        if changes.is_empty() || self.calculators.is_empty() {
            return;
        }
        for binding in self.calculators.values_mut() {
            for id in &changes {
                if let Ok(value) = self.parameters.value(id) {
                    binding.push_value(id, value);
                }
            }
        }
    }
}

/// Where a new parameter takes its fields from: a fresh spec, or a record on
/// top of the owner's template.
pub(crate) enum ParamSource<'a> {
    Fresh(ParameterSpec),
    Restored(&'a ParameterRecord, ParameterSpec),
}

pub(crate) fn missing(kind: &str, id: &impl Display) -> ReflError {
    ReflError::lookup(
        "LOOKUP.ENTITY",
        format!("{} '{}' is not registered in this session", kind, id),
    )
}
