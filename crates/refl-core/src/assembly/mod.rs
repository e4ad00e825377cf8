//! Assemblies: ordered groups of layers placed in a sample as one item.

mod multilayer;
mod surfactant;

pub use multilayer::{
    DEFAULT_MULTILAYER_NAME, DEFAULT_REPEATING_NAME, DEFAULT_REPETITIONS, MAX_REPETITIONS,
};
pub use surfactant::{DEFAULT_SURFACTANT_NAME, Surfactant, SurfactantRole};

pub(crate) use multilayer::{check_repetitions, repetitions_spec};

use crate::collection::Collection;
use crate::domain::{AssemblyId, CollectionId, EntityKind, LayerId, ParameterId, ReflError, ReflResult, SampleId};
use crate::serialization::{AssemblyRecord, Importer, append_duplicate_suffix};
use crate::session::Session;
use serde_json::Value;
use tracing::debug;

pub const DEFAULT_LAYER_COLLECTION_NAME: &str = "EasyLayerCollection";

#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    pub(crate) id: AssemblyId,
    pub(crate) name: String,
    pub(crate) layers_id: CollectionId,
    pub(crate) layers: Collection<LayerId>,
    pub(crate) kind: AssemblyKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssemblyKind {
    Multilayer,
    RepeatingMultilayer { repetitions: ParameterId },
    /// Tail layer first, head layer second.
    SurfactantLayer(Surfactant),
}

/// What a sample needs to know about any assembly variant.
pub trait AssemblyShape {
    fn layers(&self) -> &Collection<LayerId>;

    fn variant_name(&self) -> &'static str;

    /// Layer facing the incoming beam.
    fn front_layer(&self) -> Option<&LayerId> {
        self.layers().first()
    }

    fn back_layer(&self) -> Option<&LayerId> {
        self.layers().last()
    }
}

impl AssemblyShape for Assembly {
    fn layers(&self) -> &Collection<LayerId> {
        &self.layers
    }

    fn variant_name(&self) -> &'static str {
        self.entity_kind().as_str()
    }
}

impl Assembly {
    pub fn id(&self) -> &AssemblyId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layers_id(&self) -> &CollectionId {
        &self.layers_id
    }

    pub fn kind(&self) -> &AssemblyKind {
        &self.kind
    }

    pub fn entity_kind(&self) -> EntityKind {
        match self.kind {
            AssemblyKind::Multilayer => EntityKind::Multilayer,
            AssemblyKind::RepeatingMultilayer { .. } => EntityKind::RepeatingMultilayer,
            AssemblyKind::SurfactantLayer(_) => EntityKind::SurfactantLayer,
        }
    }

    pub fn repetitions(&self) -> Option<&ParameterId> {
        match &self.kind {
            AssemblyKind::RepeatingMultilayer { repetitions } => Some(repetitions),
            _ => None,
        }
    }

    pub fn as_surfactant(&self) -> Option<&Surfactant> {
        match &self.kind {
            AssemblyKind::SurfactantLayer(surfactant) => Some(surfactant),
            _ => None,
        }
    }
}

pub(crate) struct AssemblyParts {
    pub id: String,
    pub name: String,
    pub layers_id: String,
    pub layers_name: String,
    pub populate_if_none: bool,
    pub layers: Vec<LayerId>,
    pub kind: AssemblyKind,
}

impl Session {
    /// Registers the assembly and its layer collection; the caller has
    /// already claimed both identifiers and linked any owned parameters.
    pub(crate) fn assemble_assembly(&mut self, parts: AssemblyParts) -> AssemblyId {
        self.registry.link(&parts.id, &parts.layers_id);
        for layer in &parts.layers {
            self.registry.link(&parts.layers_id, layer.as_str());
        }
        let id = AssemblyId::new(parts.id);
        debug!(assembly = %id, layers = parts.layers.len(), "assembly created");
        self.assemblies.insert(
            id.clone(),
            Assembly {
                id: id.clone(),
                name: parts.name,
                layers_id: CollectionId::new(parts.layers_id),
                layers: Collection::with_items(parts.layers_name, parts.populate_if_none, parts.layers),
                kind: parts.kind,
            },
        );
        id
    }

    pub fn rename_assembly(&mut self, id: &AssemblyId, name: &str) -> ReflResult<()> {
        self.assembly_mut(id)?.name = name.to_string();
        Ok(())
    }

    /// Samples that currently hold `id`.
    pub(crate) fn parent_samples(&self, id: &AssemblyId) -> Vec<SampleId> {
        let mut samples: Vec<SampleId> = self
            .registry
            .parents_of(id.as_str())
            .iter()
            .filter(|parent| self.registry.kind_of(parent) == Some(EntityKind::Sample))
            .map(|parent| SampleId::new(parent.as_str()))
            .collect();
        samples.sort();
        samples.dedup();
        samples
    }

    fn editable_assembly(&self, id: &AssemblyId) -> ReflResult<&Assembly> {
        let assembly = self.assembly(id)?;
        if assembly.as_surfactant().is_some() {
            return Err(ReflError::validation(
                "VALIDATION.SURFACTANT_STRUCTURE",
                format!("surfactant layer '{}' always holds exactly a tail and a head layer", id),
            ));
        }
        Ok(assembly)
    }

    /// Runs a layer-level edit of `id` inside the boundary protocol of every
    /// sample holding it, then refreshes attached calculators.
    fn edit_layers<T>(
        &mut self,
        id: &AssemblyId,
        edit: impl FnOnce(&mut Self) -> ReflResult<T>,
    ) -> ReflResult<T> {
        let samples = self.parent_samples(id);
        let result = self.restructure(&samples, edit)?;
        self.sync_calculators();
        Ok(result)
    }

    pub fn add_layer_to_assembly(&mut self, id: &AssemblyId, layer: &LayerId) -> ReflResult<()> {
        let index = self.editable_assembly(id)?.layers.len();
        self.insert_layer_in_assembly(id, index, layer)
    }

    pub fn insert_layer_in_assembly(
        &mut self,
        id: &AssemblyId,
        index: usize,
        layer: &LayerId,
    ) -> ReflResult<()> {
        let len = self.editable_assembly(id)?.layers.len();
        self.layer(layer)?;
        if index > len {
            return Err(ReflError::index_out_of_range(index, len + 1, "layer collection"));
        }
        self.edit_layers(id, |session| {
            let assembly = session.assembly_mut(id)?;
            assembly.layers.insert(index, layer.clone())?;
            let collection = assembly.layers_id.clone();
            session.registry.link(collection.as_str(), layer.as_str());
            debug!(assembly = %id, layer = %layer, index, "layer inserted");
            Ok(())
        })
    }

    /// Creates a default layer and appends it.
    pub fn add_default_layer_to_assembly(&mut self, id: &AssemblyId) -> ReflResult<LayerId> {
        self.editable_assembly(id)?;
        let layer = self.create_default_layer()?;
        self.add_layer_to_assembly(id, &layer)?;
        Ok(layer)
    }

    /// Removes the layer at `index`; it is released unless something else
    /// still holds it.
    pub fn remove_layer_from_assembly(&mut self, id: &AssemblyId, index: usize) -> ReflResult<LayerId> {
        self.editable_assembly(id)?.layers.check_index(index)?;
        let removed = self.edit_layers(id, |session| {
            let assembly = session.assembly_mut(id)?;
            let layer = assembly.layers.remove(index)?;
            let collection = assembly.layers_id.clone();
            session.registry.unlink(collection.as_str(), layer.as_str());
            debug!(assembly = %id, layer = %layer, index, "layer removed");
            Ok(layer)
        })?;
        self.release_layer(&removed);
        Ok(removed)
    }

    pub fn move_layer_up(&mut self, id: &AssemblyId, index: usize) -> ReflResult<()> {
        self.move_layer(id, index, true)
    }

    pub fn move_layer_down(&mut self, id: &AssemblyId, index: usize) -> ReflResult<()> {
        self.move_layer(id, index, false)
    }

    fn move_layer(&mut self, id: &AssemblyId, index: usize, up: bool) -> ReflResult<()> {
        let assembly = self.editable_assembly(id)?;
        assembly.layers.check_index(index)?;
        let boundary_no_op = if up {
            index == 0
        } else {
            index + 1 == assembly.layers.len()
        };
        if boundary_no_op {
            return Ok(());
        }
        self.edit_layers(id, |session| {
            let layers = &mut session.assembly_mut(id)?.layers;
            if up {
                layers.move_up(index)?;
            } else {
                layers.move_down(index)?;
            }
            debug!(assembly = %id, index, up, "layer moved");
            Ok(())
        })
    }

    /// Appends a deep copy of the layer at `index`.
    pub fn duplicate_layer_in_assembly(&mut self, id: &AssemblyId, index: usize) -> ReflResult<LayerId> {
        let layer = self.editable_assembly(id)?.layers.get(index)?.clone();
        let copy = self.duplicate_layer(&layer)?;
        self.add_layer_to_assembly(id, &copy)?;
        Ok(copy)
    }

    pub fn assembly_as_dict(&self, id: &AssemblyId) -> ReflResult<Value> {
        Ok(serde_json::to_value(self.assembly_record(id)?)?)
    }

    pub fn assembly_from_dict(&mut self, value: &Value) -> ReflResult<AssemblyId> {
        let record: AssemblyRecord = serde_json::from_value(value.clone())?;
        Importer::new(self).run(
            |importer| importer.validate_assembly(&record),
            |importer| importer.import_assembly(&record),
        )
    }

    /// Standalone deep copy with fresh identifiers; the assembly and every
    /// layer name get the duplicate suffix.
    pub fn duplicate_assembly(&mut self, id: &AssemblyId) -> ReflResult<AssemblyId> {
        let original = self.assembly_record(id)?;
        let mut record = self.duplicate_record(&original)?;
        append_duplicate_suffix(record.name_mut());
        for layer in &mut record.layers_mut().data {
            append_duplicate_suffix(layer.name_mut());
        }
        Importer::new(self).run(
            |importer| importer.validate_assembly(&record),
            |importer| importer.import_assembly(&record),
        )
    }

    /// Drops an assembly nothing holds any more, with its layer collection
    /// and every layer no other collection holds.
    pub(crate) fn release_assembly(&mut self, id: &AssemblyId) -> bool {
        if self.registry.has_parents(id.as_str()) {
            return false;
        }
        let Some(assembly) = self.assemblies.remove(id) else {
            return false;
        };
        if let Some(repetitions) = assembly.repetitions() {
            self.drop_parameter(repetitions);
        }
        self.deregister(id.as_str());
        self.deregister(assembly.layers_id.as_str());
        let mut layers: Vec<&LayerId> = assembly.layers.iter().collect();
        layers.dedup();
        for layer in layers {
            self.release_layer(layer);
        }
        debug!(assembly = %id, "assembly released");
        true
    }
}
