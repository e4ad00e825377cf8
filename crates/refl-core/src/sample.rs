//! Samples: the ordered stack of assemblies between superphase and
//! subphase.
//!
//! The first layer of the first assembly is the superphase and the last
//! layer of the last assembly the subphase. Neither has a physical
//! thickness, and the superphase has no interface above it, so those
//! parameters are disabled. Every structural change releases the current
//! boundary, applies the change and recomputes the boundary from scratch.

use crate::assembly::AssemblyShape;
use crate::collection::{Collection, initial_items};
use crate::domain::{AssemblyId, EntityKind, LayerId, ReflError, ReflResult, SampleId};
use crate::serialization::{Importer, SampleRecord, append_duplicate_suffix};
use crate::session::Session;
use serde_json::Value;
use tracing::debug;

pub const DEFAULT_SAMPLE_NAME: &str = "EasySample";

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub(crate) id: SampleId,
    pub(crate) assemblies: Collection<AssemblyId>,
    pub(crate) superphase: Option<LayerId>,
    pub(crate) subphase: Option<LayerId>,
}

impl Sample {
    pub fn id(&self) -> &SampleId {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.assemblies.name()
    }

    pub fn assemblies(&self) -> &Collection<AssemblyId> {
        &self.assemblies
    }

    /// Layer whose thickness and roughness are currently disabled.
    pub fn superphase(&self) -> Option<&LayerId> {
        self.superphase.as_ref()
    }

    /// Layer whose thickness is currently disabled.
    pub fn subphase(&self) -> Option<&LayerId> {
        self.subphase.as_ref()
    }
}

impl Session {
    pub fn create_sample(&mut self, name: &str, assemblies: &[AssemblyId]) -> ReflResult<SampleId> {
        self.build_sample(name, assemblies, false)
    }

    /// Two default multilayers.
    pub fn create_default_sample(&mut self) -> ReflResult<SampleId> {
        self.build_sample(DEFAULT_SAMPLE_NAME, &[], true)
    }

    pub(crate) fn build_sample(
        &mut self,
        name: &str,
        assemblies: &[AssemblyId],
        populate_if_none: bool,
    ) -> ReflResult<SampleId> {
        for assembly in assemblies {
            self.assembly(assembly)?;
        }
        let assemblies = initial_items(assemblies, populate_if_none, || {
            Ok(vec![self.create_default_multilayer()?, self.create_default_multilayer()?])
        })?;
        let id = self.mint(EntityKind::Sample);
        Ok(self.assemble_sample(id, name.to_string(), populate_if_none, assemblies))
    }

    pub(crate) fn assemble_sample(
        &mut self,
        id: String,
        name: String,
        populate_if_none: bool,
        assemblies: Vec<AssemblyId>,
    ) -> SampleId {
        for assembly in &assemblies {
            self.registry.link(&id, assembly.as_str());
        }
        let id = SampleId::new(id);
        self.samples.insert(
            id.clone(),
            Sample {
                id: id.clone(),
                assemblies: Collection::with_items(name, populate_if_none, assemblies),
                superphase: None,
                subphase: None,
            },
        );
        self.apply_boundary(&id);
        debug!(sample = %id, "sample created");
        id
    }

    pub fn rename_sample(&mut self, id: &SampleId, name: &str) -> ReflResult<()> {
        self.sample_mut(id)?.assemblies.set_name(name);
        Ok(())
    }

    pub fn superphase(&self, id: &SampleId) -> ReflResult<Option<&LayerId>> {
        Ok(self.sample(id)?.superphase())
    }

    pub fn subphase(&self, id: &SampleId) -> ReflResult<Option<&LayerId>> {
        Ok(self.sample(id)?.subphase())
    }

    pub fn sample_add_assembly(&mut self, id: &SampleId, assembly: &AssemblyId) -> ReflResult<()> {
        let index = self.sample(id)?.assemblies.len();
        self.sample_insert_assembly(id, index, assembly)
    }

    pub fn sample_insert_assembly(
        &mut self,
        id: &SampleId,
        index: usize,
        assembly: &AssemblyId,
    ) -> ReflResult<()> {
        let len = self.sample(id)?.assemblies.len();
        self.assembly(assembly)?;
        if index > len {
            return Err(ReflError::index_out_of_range(index, len + 1, "sample"));
        }
        self.restructure(&[id.clone()], |session| {
            session.sample_mut(id)?.assemblies.insert(index, assembly.clone())?;
            session.registry.link(id.as_str(), assembly.as_str());
            debug!(sample = %id, assembly = %assembly, index, "assembly inserted");
            Ok(())
        })?;
        self.sync_calculators();
        Ok(())
    }

    /// Removes the assembly at `index` and releases it unless another sample
    /// still holds it.
    pub fn sample_remove_assembly(&mut self, id: &SampleId, index: usize) -> ReflResult<AssemblyId> {
        self.sample(id)?.assemblies.check_index(index)?;
        let removed = self.restructure(&[id.clone()], |session| {
            let assembly = session.sample_mut(id)?.assemblies.remove(index)?;
            session.registry.unlink(id.as_str(), assembly.as_str());
            debug!(sample = %id, assembly = %assembly, index, "assembly removed");
            Ok(assembly)
        })?;
        self.sync_calculators();
        self.release_assembly(&removed);
        Ok(removed)
    }

    pub fn sample_move_assembly_up(&mut self, id: &SampleId, index: usize) -> ReflResult<()> {
        self.sample_move_assembly(id, index, true)
    }

    pub fn sample_move_assembly_down(&mut self, id: &SampleId, index: usize) -> ReflResult<()> {
        self.sample_move_assembly(id, index, false)
    }

    fn sample_move_assembly(&mut self, id: &SampleId, index: usize, up: bool) -> ReflResult<()> {
        let assemblies = &self.sample(id)?.assemblies;
        assemblies.check_index(index)?;
        let boundary_no_op = if up {
            index == 0
        } else {
            index + 1 == assemblies.len()
        };
        if boundary_no_op {
            return Ok(());
        }
        self.restructure(&[id.clone()], |session| {
            let assemblies = &mut session.sample_mut(id)?.assemblies;
            if up {
                assemblies.move_up(index)?;
            } else {
                assemblies.move_down(index)?;
            }
            debug!(sample = %id, index, up, "assembly moved");
            Ok(())
        })?;
        self.sync_calculators();
        Ok(())
    }

    /// Appends a deep copy of the assembly at `index`.
    pub fn sample_duplicate_assembly(&mut self, id: &SampleId, index: usize) -> ReflResult<AssemblyId> {
        let assembly = self.sample(id)?.assemblies.get(index)?.clone();
        let copy = self.duplicate_assembly(&assembly)?;
        self.sample_add_assembly(id, &copy)?;
        Ok(copy)
    }

    pub fn sample_as_dict(&self, id: &SampleId) -> ReflResult<Value> {
        Ok(serde_json::to_value(self.sample_record(id)?)?)
    }

    pub fn sample_from_dict(&mut self, value: &Value) -> ReflResult<SampleId> {
        let record: SampleRecord = serde_json::from_value(value.clone())?;
        Importer::new(self).run(
            |importer| importer.validate_sample(&record),
            |importer| importer.import_sample(&record),
        )
    }

    pub fn duplicate_sample(&mut self, id: &SampleId) -> ReflResult<SampleId> {
        let original = self.sample_record(id)?;
        let mut record = self.duplicate_record(&original)?;
        append_duplicate_suffix(&mut record.name);
        Importer::new(self).run(
            |importer| importer.validate_sample(&record),
            |importer| importer.import_sample(&record),
        )
    }

    /// Releases the boundary of `samples`, runs `mutate` and recomputes the
    /// boundary, even when `mutate` fails.
    pub(crate) fn restructure<T>(
        &mut self,
        samples: &[SampleId],
        mutate: impl FnOnce(&mut Self) -> ReflResult<T>,
    ) -> ReflResult<T> {
        for sample in samples {
            self.release_boundary(sample);
        }
        let result = mutate(self);
        for sample in samples {
            self.apply_boundary(sample);
        }
        let others: Vec<SampleId> = self
            .samples
            .keys()
            .filter(|sample| !samples.contains(sample))
            .cloned()
            .collect();
        for sample in &others {
            self.disable_recorded_boundary(sample);
        }
        result
    }

    fn release_boundary(&mut self, id: &SampleId) {
        let Some(sample) = self.samples.get_mut(id) else {
            return;
        };
        let (superphase, subphase) = (sample.superphase.take(), sample.subphase.take());
        if let Some(layer) = superphase.and_then(|layer| self.layers.get(&layer)) {
            let _ = self.parameters.set_enabled(&layer.thickness, true);
            let _ = self.parameters.set_enabled(&layer.roughness, true);
        }
        if let Some(layer) = subphase.and_then(|layer| self.layers.get(&layer)) {
            let _ = self.parameters.set_enabled(&layer.thickness, true);
        }
    }

    fn apply_boundary(&mut self, id: &SampleId) {
        let Some(sample) = self.samples.get(id) else {
            return;
        };
        let front = sample
            .assemblies
            .first()
            .and_then(|assembly| self.assemblies.get(assembly))
            .and_then(|assembly| assembly.front_layer())
            .cloned();
        let back = sample
            .assemblies
            .last()
            .and_then(|assembly| self.assemblies.get(assembly))
            .and_then(|assembly| assembly.back_layer())
            .cloned();
        if let Some(sample) = self.samples.get_mut(id) {
            sample.superphase = front;
            sample.subphase = back;
        }
        self.disable_recorded_boundary(id);
        debug!(sample = %id, "sample boundary recomputed");
    }

    fn disable_recorded_boundary(&mut self, id: &SampleId) {
        let Some(sample) = self.samples.get(id) else {
            return;
        };
        if let Some(layer) = sample.superphase.as_ref().and_then(|layer| self.layers.get(layer)) {
            let _ = self.parameters.set_enabled(&layer.thickness, false);
            let _ = self.parameters.set_enabled(&layer.roughness, false);
        }
        if let Some(layer) = sample.subphase.as_ref().and_then(|layer| self.layers.get(layer)) {
            let _ = self.parameters.set_enabled(&layer.thickness, false);
        }
    }

    /// Drops a sample nothing holds any more, releasing its boundary and
    /// every assembly only it held.
    pub(crate) fn release_sample(&mut self, id: &SampleId) -> bool {
        if self.registry.has_parents(id.as_str()) || !self.samples.contains_key(id) {
            return false;
        }
        self.release_boundary(id);
        let Some(sample) = self.samples.remove(id) else {
            return false;
        };
        self.deregister(id.as_str());
        for assembly in sample.assemblies.iter() {
            self.release_assembly(assembly);
        }
        debug!(sample = %id, "sample released");
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{LayerId, ReflErrorCategory, SampleId};
    use crate::session::Session;

    fn enabled(session: &Session, layer: &LayerId) -> (bool, bool) {
        let layer = session.layer(layer).unwrap();
        (
            session.parameter(layer.thickness()).unwrap().enabled(),
            session.parameter(layer.roughness()).unwrap().enabled(),
        )
    }

    fn all_layers(session: &Session, sample: &SampleId) -> Vec<LayerId> {
        session
            .sample(sample)
            .unwrap()
            .assemblies()
            .iter()
            .flat_map(|assembly| session.assembly(assembly).unwrap().layers.items().to_vec())
            .collect()
    }

    /// Only the recorded boundary layers are disabled, and exactly as
    /// prescribed.
    fn assert_boundary(session: &Session, sample: &SampleId) {
        let layers = all_layers(session, sample);
        let superphase = layers.first().cloned();
        let subphase = layers.last().cloned();
        assert_eq!(session.superphase(sample).unwrap().cloned(), superphase);
        assert_eq!(session.subphase(sample).unwrap().cloned(), subphase);
        for layer in &layers {
            let (thickness, roughness) = enabled(session, layer);
            let is_super = Some(layer) == superphase.as_ref();
            let is_sub = Some(layer) == subphase.as_ref();
            assert_eq!(thickness, !(is_super || is_sub), "thickness of {}", layer);
            assert_eq!(roughness, !is_super, "roughness of {}", layer);
        }
    }

    #[test]
    fn default_sample_disables_the_boundary() {
        let mut session = Session::new();
        let sample = session.create_default_sample().unwrap();
        assert_eq!(session.sample(&sample).unwrap().name(), "EasySample");
        assert_eq!(session.sample(&sample).unwrap().assemblies().len(), 2);
        assert_boundary(&session, &sample);

        let superphase = session.superphase(&sample).unwrap().unwrap().clone();
        let error = session.set_layer_thickness(&superphase, 5.0).unwrap_err();
        assert_eq!(error.category(), ReflErrorCategory::Immutability);
    }

    #[test]
    fn structural_edits_recompute_the_boundary() {
        let mut session = Session::new();
        let sample = session.create_default_sample().unwrap();
        let surfactant = session.create_default_surfactant_layer().unwrap();

        session.sample_add_assembly(&sample, &surfactant).unwrap();
        assert_boundary(&session, &sample);

        session.sample_move_assembly_up(&sample, 2).unwrap();
        assert_boundary(&session, &sample);
        session.sample_move_assembly_up(&sample, 1).unwrap();
        assert_boundary(&session, &sample);
        session.sample_move_assembly_up(&sample, 0).unwrap();
        assert_boundary(&session, &sample);

        session.sample_remove_assembly(&sample, 0).unwrap();
        assert_boundary(&session, &sample);
        assert!(session.assembly(&surfactant).is_err());

        let first = session.sample(&sample).unwrap().assemblies().items()[0].clone();
        session.add_default_layer_to_assembly(&first).unwrap();
        let extra = session.create_default_layer().unwrap();
        session.insert_layer_in_assembly(&first, 0, &extra).unwrap();
        assert_boundary(&session, &sample);
        session.move_layer_down(&first, 0).unwrap();
        assert_boundary(&session, &sample);
        session.remove_layer_from_assembly(&first, 0).unwrap();
        assert_boundary(&session, &sample);

        session.sample_duplicate_assembly(&sample, 1).unwrap();
        assert_boundary(&session, &sample);
        assert_eq!(session.sample(&sample).unwrap().assemblies().len(), 3);
    }

    #[test]
    fn boundary_no_op_moves_change_nothing() {
        let mut session = Session::new();
        let sample = session.create_default_sample().unwrap();
        let before = session.sample(&sample).unwrap().clone();
        session.sample_move_assembly_up(&sample, 0).unwrap();
        session.sample_move_assembly_down(&sample, 1).unwrap();
        assert_eq!(session.sample(&sample).unwrap(), &before);
        assert!(session.sample_move_assembly_up(&sample, 2).is_err());
    }

    #[test]
    fn removed_boundary_layers_are_enabled_again() {
        let mut session = Session::new();
        let sample = session.create_default_sample().unwrap();
        let surfactant = session.create_default_surfactant_layer().unwrap();
        session.sample_add_assembly(&sample, &surfactant).unwrap();
        let old_subphase = session.subphase(&sample).unwrap().unwrap().clone();

        let other = session.create_default_multilayer().unwrap();
        session.sample_add_assembly(&sample, &other).unwrap();
        assert_eq!(enabled(&session, &old_subphase), (true, true));
        assert_boundary(&session, &sample);
    }
}
