use super::{BindingKey, Calculator};
use crate::assembly::AssemblyKind;
use crate::domain::{AssemblyId, LayerId, MaterialId, ModelId, ParameterId, ReflResult};
use crate::session::Session;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Backend-side entity a parameter is pushed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoundEntity {
    Material(MaterialId),
    Layer(LayerId),
    Item(AssemblyId),
    Model(ModelId),
}

impl BoundEntity {
    pub fn id(&self) -> &str {
        match self {
            Self::Material(id) => id.as_str(),
            Self::Layer(id) => id.as_str(),
            Self::Item(id) => id.as_str(),
            Self::Model(id) => id.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingTarget {
    pub entity: BoundEntity,
    pub key: BindingKey,
}

/// A calculator attached to one model, plus the mirror of what has already
/// been described to it.
#[derive(Debug)]
pub struct CalculatorBinding {
    name: String,
    model: ModelId,
    calculator: Box<dyn Calculator>,
    targets: BTreeMap<ParameterId, BTreeSet<BindingTarget>>,
    created: BTreeSet<String>,
    items: Vec<AssemblyId>,
    item_layers: BTreeMap<AssemblyId, Vec<LayerId>>,
    layer_materials: BTreeMap<LayerId, MaterialId>,
}

/// Edit needed to turn the backend's ordering into the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step<T> {
    Add(T),
    Remove(T),
}

/// Appends and single removals map to one call each; anything else is a
/// full rebuild.
fn reconcile<T: Clone + PartialEq>(current: &[T], desired: &[T]) -> Vec<Step<T>> {
    if desired.starts_with(current) {
        return desired[current.len()..].iter().cloned().map(Step::Add).collect();
    }
    if desired.len() + 1 == current.len() {
        for index in 0..current.len() {
            let without = current[..index].iter().chain(&current[index + 1..]);
            if without.eq(desired.iter()) {
                return vec![Step::Remove(current[index].clone())];
            }
        }
    }
    current
        .iter()
        .cloned()
        .map(Step::Remove)
        .chain(desired.iter().cloned().map(Step::Add))
        .collect()
}

impl CalculatorBinding {
    pub(crate) fn new(name: impl Into<String>, model: ModelId, calculator: Box<dyn Calculator>) -> Self {
        Self {
            name: name.into(),
            model,
            calculator,
            targets: BTreeMap::new(),
            created: BTreeSet::new(),
            items: Vec::new(),
            item_layers: BTreeMap::new(),
            layer_materials: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &ModelId {
        &self.model
    }

    pub fn calculator(&self) -> &dyn Calculator {
        self.calculator.as_ref()
    }

    pub(crate) fn calculator_mut(&mut self) -> &mut dyn Calculator {
        self.calculator.as_mut()
    }

    pub fn targets_of(&self, parameter: &ParameterId) -> impl Iterator<Item = &BindingTarget> {
        self.targets.get(parameter).into_iter().flatten()
    }

    /// Items in the order the backend currently holds them.
    pub fn items(&self) -> &[AssemblyId] {
        &self.items
    }

    /// Sends a changed value to every backend entity bound to it.
    pub(crate) fn push_value(&mut self, parameter: &ParameterId, value: f64) {
        let Some(targets) = self.targets.get(parameter) else {
            return;
        };
        let table = self.calculator.field_table();
        for target in targets {
            let values = [(table.field(target.key), value)];
            match &target.entity {
                BoundEntity::Material(id) => self.calculator.update_material(id.as_str(), &values),
                BoundEntity::Layer(id) => self.calculator.update_layer(id.as_str(), &values),
                BoundEntity::Item(id) => self.calculator.update_item(id.as_str(), &values),
                BoundEntity::Model(id) => self.calculator.update_model(id.as_str(), &values),
            }
        }
    }

    /// Forgets a released entity or parameter, so an entity later registered
    /// under the same identifier is described from scratch.
    pub(crate) fn forget(&mut self, id: &str) {
        self.created.remove(id);
        self.targets.retain(|parameter, targets| {
            targets.retain(|target| target.entity.id() != id);
            parameter.as_str() != id && !targets.is_empty()
        });
        self.item_layers.retain(|item, _| item.as_str() != id);
        self.layer_materials.retain(|layer, _| layer.as_str() != id);
    }

    /// Whether the backend currently holds an entity with this identifier.
    pub fn is_described(&self, id: &str) -> bool {
        self.created.contains(id)
    }

    fn bind(&mut self, parameter: &ParameterId, entity: BoundEntity, key: BindingKey) {
        self.targets
            .entry(parameter.clone())
            .or_default()
            .insert(BindingTarget { entity, key });
    }

    fn describe_model(&mut self, session: &Session) -> ReflResult<()> {
        let model = session.model(&self.model)?;
        let table = self.calculator.field_table();
        let id = self.model.clone();
        self.calculator.create_model(id.as_str());
        self.calculator.update_model(
            id.as_str(),
            &[
                (table.scale, session.value(&model.scale)?),
                (table.background, session.value(&model.background)?),
            ],
        );
        self.bind(&model.scale, BoundEntity::Model(id.clone()), BindingKey::Scale);
        self.bind(&model.background, BoundEntity::Model(id.clone()), BindingKey::Background);
        self.created.insert(id.to_string());
        Ok(())
    }

    fn ensure_material(&mut self, session: &Session, id: &MaterialId) -> ReflResult<()> {
        if self.created.contains(id.as_str()) {
            return Ok(());
        }
        let material = session.material(id)?;
        let table = self.calculator.field_table();
        self.calculator.create_material(id.as_str());
        self.calculator.update_material(
            id.as_str(),
            &[
                (table.sld, session.value(&material.sld)?),
                (table.isld, session.value(&material.isld)?),
            ],
        );
        self.bind(&material.sld, BoundEntity::Material(id.clone()), BindingKey::Sld);
        self.bind(&material.isld, BoundEntity::Material(id.clone()), BindingKey::Isld);
        self.created.insert(id.to_string());
        Ok(())
    }

    fn ensure_layer(&mut self, session: &Session, id: &LayerId) -> ReflResult<()> {
        if self.created.contains(id.as_str()) {
            return Ok(());
        }
        let layer = session.layer(id)?;
        self.ensure_material(session, &layer.material)?;
        let table = self.calculator.field_table();
        self.calculator.create_layer(id.as_str());
        self.calculator.update_layer(
            id.as_str(),
            &[
                (table.thickness, session.value(&layer.thickness)?),
                (table.roughness, session.value(&layer.roughness)?),
            ],
        );
        self.calculator
            .assign_material_to_layer(layer.material.as_str(), id.as_str());
        self.bind(&layer.thickness, BoundEntity::Layer(id.clone()), BindingKey::Thickness);
        self.bind(&layer.roughness, BoundEntity::Layer(id.clone()), BindingKey::Roughness);
        self.layer_materials.insert(id.clone(), layer.material.clone());
        self.created.insert(id.to_string());
        Ok(())
    }

    fn ensure_item(&mut self, session: &Session, id: &AssemblyId) -> ReflResult<()> {
        if self.created.contains(id.as_str()) {
            return Ok(());
        }
        let assembly = session.assembly(id)?;
        self.calculator.create_item(id.as_str());
        for layer in assembly.layers.iter() {
            self.ensure_layer(session, layer)?;
            self.calculator.add_layer_to_item(layer.as_str(), id.as_str());
        }
        if let AssemblyKind::RepeatingMultilayer { repetitions } = &assembly.kind {
            let table = self.calculator.field_table();
            self.calculator
                .update_item(id.as_str(), &[(table.repetitions, session.value(repetitions)?)]);
            self.bind(repetitions, BoundEntity::Item(id.clone()), BindingKey::Repetitions);
        }
        self.item_layers
            .insert(id.clone(), assembly.layers.items().to_vec());
        self.created.insert(id.to_string());
        Ok(())
    }

    /// Brings the backend in line with the model's current structure.
    fn synchronize(&mut self, session: &Session) -> ReflResult<()> {
        let model = session.model(&self.model)?;
        let desired = session.sample(&model.sample)?.assemblies.items().to_vec();

        for step in reconcile(&self.items, &desired) {
            match step {
                Step::Add(item) => {
                    self.ensure_item(session, &item)?;
                    self.calculator
                        .add_item_to_model(item.as_str(), self.model.as_str());
                    debug!(model = %self.model, item = %item, "item pushed to calculator");
                }
                Step::Remove(item) => {
                    self.calculator
                        .remove_item_from_model(item.as_str(), self.model.as_str());
                    debug!(model = %self.model, item = %item, "item removed from calculator");
                }
            }
        }
        self.items = desired;

        for item in self.items.clone() {
            let layers = session.assembly(&item)?.layers.items().to_vec();
            let current = self.item_layers.get(&item).cloned().unwrap_or_default();
            for step in reconcile(&current, &layers) {
                match step {
                    Step::Add(layer) => {
                        self.ensure_layer(session, &layer)?;
                        self.calculator.add_layer_to_item(layer.as_str(), item.as_str());
                    }
                    Step::Remove(layer) => {
                        self.calculator
                            .remove_layer_from_item(layer.as_str(), item.as_str());
                    }
                }
            }
            for layer in &layers {
                let material = &session.layer(layer)?.material;
                if self.layer_materials.get(layer) != Some(material) {
                    self.ensure_material(session, material)?;
                    self.calculator
                        .assign_material_to_layer(material.as_str(), layer.as_str());
                    self.layer_materials.insert(layer.clone(), material.clone());
                }
            }
            self.item_layers.insert(item, layers);
        }
        Ok(())
    }
}

impl Session {
    /// Replaces the model's calculator and describes the whole structure to
    /// the new one: model, then every item with its layers and materials,
    /// then the resolution function.
    pub(crate) fn attach_calculator(&mut self, model: &ModelId, name: &str) -> ReflResult<()> {
        let calculator = self.factory.create(name)?;
        let mut binding = CalculatorBinding::new(name, model.clone(), calculator);
        binding.describe_model(self)?;
        binding.synchronize(self)?;
        let resolution = &self.model(model)?.resolution;
        binding.calculator.set_resolution_function(resolution);
        debug!(model = %model, calculator = name, "calculator bound");
        self.calculators.insert(model.clone(), binding);
        Ok(())
    }

    pub(crate) fn detach_calculator(&mut self, model: &ModelId) -> Option<CalculatorBinding> {
        self.calculators.remove(model)
    }

    pub fn calculator_binding(&self, model: &ModelId) -> Option<&CalculatorBinding> {
        self.calculators.get(model)
    }

    /// Re-synchronizes every attached calculator after a structural change.
    pub(crate) fn sync_calculators(&mut self) {
        let models: Vec<ModelId> = self.calculators.keys().cloned().collect();
        for model in models {
            let Some(mut binding) = self.calculators.remove(&model) else {
                continue;
            };
            if let Err(error) = binding.synchronize(self) {
                debug!(model = %model, error = %error, "calculator synchronization skipped");
            }
            self.calculators.insert(model, binding);
        }
    }

    pub(crate) fn push_resolution(&mut self, model: &ModelId) {
        let Some(resolution) = self.models.get(model).map(|model| &model.resolution) else {
            return;
        };
        if let Some(binding) = self.calculators.get_mut(model) {
            binding.calculator.set_resolution_function(resolution);
            debug!(model = %model, "resolution pushed to calculator");
        }
    }
}
