//! Two-pass reconstruction of records into a session.
//!
//! `validate_*` walks a record without touching the session's entities and
//! rejects anything the build pass could trip over. `import_*` then builds
//! bottom-up. Records sharing a `unique_name` inside one document become one
//! shared entity.

use super::{
    AssemblyRecord, LayerRecord, MaterialCollectionRecord, MaterialRecord, ModelCollectionRecord,
    ModelRecord, ParameterRecord, SampleRecord,
};
use crate::assembly::{AssemblyKind, AssemblyParts, Surfactant, check_repetitions, repetitions_spec};
use crate::domain::{
    AssemblyId, CollectionId, EntityKind, LayerId, MaterialId, ModelId, ReflError, ReflResult,
    SampleId,
};
use crate::layer::{AreaPerMoleculeParts, area_per_molecule_spec, roughness_spec, thickness_spec};
use crate::material::{
    DensityParts, MixtureParts, MixtureRole, check_finite, check_fraction, density_spec,
    fraction_spec, isld_spec, molecular_weight_spec, scattering_length_specs, sld_spec,
};
use crate::model::{Model, background_spec, scale_spec};
use crate::parameter::check_bounds;
use crate::session::{ParamSource, Session};
use num_complex::Complex64;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

pub(crate) struct Importer<'s> {
    session: &'s mut Session,
    declared: BTreeMap<String, EntityKind>,
    open_materials: Vec<String>,
    materials: BTreeMap<String, MaterialId>,
    layers: BTreeMap<String, LayerId>,
    assemblies: BTreeMap<String, AssemblyId>,
    samples: BTreeMap<String, SampleId>,
    models: BTreeMap<String, ModelId>,
}

impl<'s> Importer<'s> {
    pub(crate) fn new(session: &'s mut Session) -> Self {
        Self {
            session,
            declared: BTreeMap::new(),
            open_materials: Vec::new(),
            materials: BTreeMap::new(),
            layers: BTreeMap::new(),
            assemblies: BTreeMap::new(),
            samples: BTreeMap::new(),
            models: BTreeMap::new(),
        }
    }

    /// Validates, then builds. Identifiers the document declares are reserved
    /// while building so anonymous records never mint one of them, and a
    /// failed build leaves the session as it was.
    pub(crate) fn run<T>(
        mut self,
        validate: impl FnOnce(&mut Self) -> ReflResult<()>,
        build: impl FnOnce(&mut Self) -> ReflResult<T>,
    ) -> ReflResult<T> {
        validate(&mut self)?;
        let known: BTreeSet<String> = self
            .session
            .registry
            .ids()
            .map(|(id, _)| id.to_string())
            .collect();
        self.session.registry.reserve(self.declared.keys().cloned());
        let result = build(&mut self);
        self.session.registry.release_reservations();
        match result {
            Ok(value) => {
                self.session.flush();
                Ok(value)
            }
            Err(error) => {
                self.session.discard_unknown(&known);
                Err(error)
            }
        }
    }

    /// Returns `false` when the identifier was already declared earlier in
    /// the document, in which case the record refers to that entity.
    fn declare(&mut self, unique_name: Option<&str>, kind: EntityKind) -> ReflResult<bool> {
        let Some(id) = unique_name else {
            return Ok(true);
        };
        if let Some(declared) = self.declared.get(id) {
            if !declared.same_family(kind) {
                return Err(kind_mismatch(id, *declared, kind));
            }
            return Ok(false);
        }
        if self.session.registry.contains(id) {
            return Err(ReflError::validation(
                "VALIDATION.IDENTIFIER_COLLISION",
                format!("identifier '{}' is already registered in this session", id),
            ));
        }
        if let Some(prefixed) = EntityKind::from_prefix(id) {
            if !prefixed.same_family(kind) {
                return Err(kind_mismatch(id, prefixed, kind));
            }
        }
        self.declared.insert(id.to_string(), kind);
        Ok(true)
    }

    /// Internal materials of a molecular film belong to that film alone.
    fn declare_owned(&mut self, unique_name: Option<&str>, kind: EntityKind) -> ReflResult<()> {
        if self.declare(unique_name, kind)? {
            return Ok(());
        }
        Err(ReflError::validation(
            "VALIDATION.IDENTIFIER_COLLISION",
            format!(
                "identifier '{}' belongs to a molecular film and cannot be shared",
                unique_name.unwrap_or_default()
            ),
        ))
    }

    pub(crate) fn validate_material(&mut self, record: &MaterialRecord) -> ReflResult<()> {
        if let Some(id) = record.unique_name() {
            if self.open_materials.iter().any(|open| open == id) {
                return Err(ReflError::validation(
                    "VALIDATION.MATERIAL_CYCLE",
                    format!("material '{}' contains itself", id),
                ));
            }
        }
        if !self.declare(record.unique_name(), material_kind(record))? {
            return Ok(());
        }
        if let Some(id) = record.unique_name() {
            self.open_materials.push(id.to_string());
        }
        let result = self.validate_material_fields(record);
        if record.unique_name().is_some() {
            self.open_materials.pop();
        }
        result
    }

    fn validate_material_fields(&mut self, record: &MaterialRecord) -> ReflResult<()> {
        match record {
            MaterialRecord::Material { sld, isld, .. } => check_values(&[sld, isld]),
            MaterialRecord::MaterialMixture {
                material_a,
                material_b,
                fraction,
                sld,
                isld,
                ..
            } => {
                check_values(&[fraction, sld, isld])?;
                check_fraction(fraction.value)?;
                self.validate_material(material_a)?;
                self.validate_material(material_b)
            }
            MaterialRecord::MaterialSolvated {
                material,
                solvent,
                solvent_fraction,
                sld,
                isld,
                ..
            } => {
                check_values(&[solvent_fraction, sld, isld])?;
                check_fraction(solvent_fraction.value)?;
                self.validate_material(material)?;
                self.validate_material(solvent)
            }
            MaterialRecord::MaterialDensity {
                chemical_structure,
                density,
                scattering_length_real,
                scattering_length_imag,
                molecular_weight,
                sld,
                isld,
                ..
            } => {
                check_values(&[
                    density,
                    scattering_length_real,
                    scattering_length_imag,
                    molecular_weight,
                    sld,
                    isld,
                ])?;
                self.session.formula_properties(chemical_structure)?;
                Ok(())
            }
        }
    }

    pub(crate) fn import_material(&mut self, record: &MaterialRecord) -> ReflResult<MaterialId> {
        if let Some(existing) = record.unique_name().and_then(|id| self.materials.get(id)) {
            return Ok(existing.clone());
        }
        let id = match record {
            MaterialRecord::Material {
                name,
                unique_name,
                sld,
                isld,
            } => {
                let id = self.session.claim(EntityKind::Material, unique_name.as_deref())?;
                self.session.assemble_material(
                    id,
                    name.clone(),
                    ParamSource::Restored(sld, sld_spec(0.0)),
                    ParamSource::Restored(isld, isld_spec(0.0)),
                )?
            }
            MaterialRecord::MaterialMixture {
                name,
                unique_name,
                material_a,
                material_b,
                fraction,
                sld,
                isld,
            } => self.import_blend(
                MixtureRole::Mixture,
                (name, unique_name.as_deref()),
                (material_a, material_b),
                fraction,
                (sld, isld),
            )?,
            MaterialRecord::MaterialSolvated {
                name,
                unique_name,
                material,
                solvent,
                solvent_fraction,
                sld,
                isld,
            } => self.import_blend(
                MixtureRole::Solvated,
                (name, unique_name.as_deref()),
                (material, solvent),
                solvent_fraction,
                (sld, isld),
            )?,
            MaterialRecord::MaterialDensity {
                name,
                unique_name,
                chemical_structure,
                density,
                scattering_length_real,
                scattering_length_imag,
                molecular_weight,
                sld,
                isld,
            } => {
                let (real, imag) = scattering_length_specs(Complex64::new(0.0, 0.0));
                let id = self
                    .session
                    .claim(EntityKind::MaterialDensity, unique_name.as_deref())?;
                self.session.assemble_density(DensityParts {
                    id,
                    name: name.clone(),
                    chemical_structure: chemical_structure.clone(),
                    density: ParamSource::Restored(density, density_spec(0.0)),
                    scattering_length_real: ParamSource::Restored(scattering_length_real, real),
                    scattering_length_imag: ParamSource::Restored(scattering_length_imag, imag),
                    molecular_weight: ParamSource::Restored(molecular_weight, molecular_weight_spec(0.0)),
                    sld: ParamSource::Restored(sld, sld_spec(0.0)),
                    isld: ParamSource::Restored(isld, isld_spec(0.0)),
                })?
            }
        };
        self.remember_material(record.unique_name(), &id);
        Ok(id)
    }

    fn import_blend(
        &mut self,
        role: MixtureRole,
        (name, unique_name): (&String, Option<&str>),
        (material_a, material_b): (&MaterialRecord, &MaterialRecord),
        fraction: &ParameterRecord,
        (sld, isld): (&ParameterRecord, &ParameterRecord),
    ) -> ReflResult<MaterialId> {
        let material_a = self.import_material(material_a)?;
        let material_b = self.import_material(material_b)?;
        let id = self.session.claim(role.entity_kind(), unique_name)?;
        self.session.assemble_mixture(MixtureParts {
            id,
            name: Some(name.clone()),
            material_a,
            material_b,
            role,
            fraction: ParamSource::Restored(fraction, fraction_spec(role, 0.0)),
            sld: ParamSource::Restored(sld, sld_spec(0.0)),
            isld: ParamSource::Restored(isld, isld_spec(0.0)),
        })
    }

    fn remember_material(&mut self, unique_name: Option<&str>, id: &MaterialId) {
        if let Some(unique_name) = unique_name {
            self.materials.insert(unique_name.to_string(), id.clone());
        }
    }

    pub(crate) fn validate_layer(&mut self, record: &LayerRecord) -> ReflResult<()> {
        let kind = match record {
            LayerRecord::Layer { .. } => EntityKind::Layer,
            LayerRecord::LayerAreaPerMolecule { .. } => EntityKind::LayerAreaPerMolecule,
        };
        if !self.declare(record.unique_name(), kind)? {
            return Ok(());
        }
        match record {
            LayerRecord::Layer {
                material,
                thickness,
                roughness,
                ..
            } => {
                check_values(&[thickness, roughness])?;
                self.validate_material(material)
            }
            LayerRecord::LayerAreaPerMolecule {
                molecular_formula,
                thickness,
                roughness,
                area_per_molecule,
                scattering_length_real,
                scattering_length_imag,
                material,
                ..
            } => {
                check_values(&[
                    thickness,
                    roughness,
                    area_per_molecule,
                    scattering_length_real,
                    scattering_length_imag,
                ])?;
                self.session.formula_properties(molecular_formula)?;
                let (solvated, molecule, solvent, solvent_fraction) = film_parts(material)?;
                check_values(&[solvent_fraction])?;
                check_fraction(solvent_fraction.value)?;
                self.declare_owned(solvated, EntityKind::MaterialSolvated)?;
                let MaterialRecord::Material { unique_name, sld, isld, .. } = molecule else {
                    return Err(film_material_error());
                };
                check_values(&[sld, isld])?;
                self.declare_owned(unique_name.as_deref(), EntityKind::Material)?;
                self.validate_material(solvent)
            }
        }
    }

    pub(crate) fn import_layer(&mut self, record: &LayerRecord) -> ReflResult<LayerId> {
        if let Some(existing) = record.unique_name().and_then(|id| self.layers.get(id)) {
            return Ok(existing.clone());
        }
        let id = match record {
            LayerRecord::Layer {
                name,
                unique_name,
                material,
                thickness,
                roughness,
            } => {
                let material = self.import_material(material)?;
                let (thickness, roughness) = (released(thickness), released(roughness));
                let id = self.session.claim(EntityKind::Layer, unique_name.as_deref())?;
                self.session.assemble_layer(
                    id,
                    name.clone(),
                    material,
                    ParamSource::Restored(&thickness, thickness_spec(0.0)),
                    ParamSource::Restored(&roughness, roughness_spec(0.0)),
                )?
            }
            LayerRecord::LayerAreaPerMolecule {
                name,
                unique_name,
                molecular_formula,
                thickness,
                roughness,
                area_per_molecule,
                scattering_length_real,
                scattering_length_imag,
                material,
            } => {
                let (solvated_unique_name, molecule, solvent, solvent_fraction) = film_parts(material)?;
                let MaterialRecord::Material {
                    unique_name: molecule_unique_name,
                    sld: molecule_sld,
                    isld: molecule_isld,
                    ..
                } = molecule
                else {
                    return Err(film_material_error());
                };
                let MaterialRecord::MaterialSolvated {
                    name: solvated_name,
                    sld: solvated_sld,
                    isld: solvated_isld,
                    ..
                } = material
                else {
                    return Err(film_material_error());
                };
                let solvent = self.import_material(solvent)?;
                let (thickness, roughness) = (released(thickness), released(roughness));
                let (real, imag) = scattering_length_specs(Complex64::new(0.0, 0.0));
                let id = self
                    .session
                    .claim(EntityKind::LayerAreaPerMolecule, unique_name.as_deref())?;
                let molecule_id = self
                    .session
                    .claim(EntityKind::Material, molecule_unique_name.as_deref())?;
                let solvated_id = self
                    .session
                    .claim(EntityKind::MaterialSolvated, solvated_unique_name)?;
                let layer = self.session.assemble_area_per_molecule_layer(AreaPerMoleculeParts {
                    id,
                    name: name.clone(),
                    molecular_formula: molecular_formula.clone(),
                    thickness: ParamSource::Restored(&thickness, thickness_spec(0.0)),
                    roughness: ParamSource::Restored(&roughness, roughness_spec(0.0)),
                    area_per_molecule: ParamSource::Restored(
                        area_per_molecule,
                        area_per_molecule_spec(0.0),
                    ),
                    scattering_length_real: ParamSource::Restored(scattering_length_real, real),
                    scattering_length_imag: ParamSource::Restored(scattering_length_imag, imag),
                    molecule_id,
                    molecule_sld: ParamSource::Restored(molecule_sld, sld_spec(0.0)),
                    molecule_isld: ParamSource::Restored(molecule_isld, isld_spec(0.0)),
                    solvated_id,
                    solvated_name: Some(solvated_name.clone()),
                    solvent,
                    solvent_fraction: ParamSource::Restored(
                        solvent_fraction,
                        fraction_spec(MixtureRole::Solvated, 0.0),
                    ),
                    solvated_sld: ParamSource::Restored(solvated_sld, sld_spec(0.0)),
                    solvated_isld: ParamSource::Restored(solvated_isld, isld_spec(0.0)),
                })?;
                let (solvated, molecule) = {
                    let stored = self.session.layer(&layer)?;
                    let molecule = stored.as_area_per_molecule().map(|film| film.molecule.clone());
                    (stored.material.clone(), molecule)
                };
                self.remember_material(solvated_unique_name, &solvated);
                if let Some(molecule) = molecule {
                    self.remember_material(molecule_unique_name.as_deref(), &molecule);
                }
                layer
            }
        };
        if let Some(unique_name) = record.unique_name() {
            self.layers.insert(unique_name.to_string(), id.clone());
        }
        Ok(id)
    }

    pub(crate) fn validate_assembly(&mut self, record: &AssemblyRecord) -> ReflResult<()> {
        let kind = match record {
            AssemblyRecord::Multilayer { .. } => EntityKind::Multilayer,
            AssemblyRecord::RepeatingMultilayer { .. } => EntityKind::RepeatingMultilayer,
            AssemblyRecord::SurfactantLayer { .. } => EntityKind::SurfactantLayer,
        };
        if !self.declare(record.unique_name(), kind)? {
            return Ok(());
        }
        let layers = record.layers();
        self.declare_owned(layers.unique_name.as_deref(), EntityKind::LayerCollection)?;
        match record {
            AssemblyRecord::Multilayer { .. } => {}
            AssemblyRecord::RepeatingMultilayer { repetitions, .. } => {
                check_values(&[repetitions])?;
                check_repetitions(repetitions.value)?;
            }
            AssemblyRecord::SurfactantLayer { .. } => {
                let [tail, head] = layers.data.as_slice() else {
                    return Err(ReflError::structural_mismatch(
                        "STRUCTURE.SURFACTANT_LAYERS",
                        format!(
                            "a surfactant layer holds a tail and a head layer, got {} layer(s)",
                            layers.data.len()
                        ),
                    ));
                };
                let films = [tail, head]
                    .iter()
                    .all(|layer| matches!(layer, LayerRecord::LayerAreaPerMolecule { .. }));
                let same = tail.unique_name().is_some() && tail.unique_name() == head.unique_name();
                if !films || same {
                    return Err(ReflError::validation(
                        "VALIDATION.SURFACTANT_STRUCTURE",
                        "tail and head must be two different area-per-molecule layers",
                    ));
                }
            }
        }
        for layer in &layers.data {
            self.validate_layer(layer)?;
        }
        Ok(())
    }

    pub(crate) fn import_assembly(&mut self, record: &AssemblyRecord) -> ReflResult<AssemblyId> {
        if let Some(existing) = record.unique_name().and_then(|id| self.assemblies.get(id)) {
            return Ok(existing.clone());
        }
        let collection = record.layers();
        let layers = collection
            .data
            .iter()
            .map(|layer| self.import_layer(layer))
            .collect::<ReflResult<Vec<_>>>()?;

        let (kind, flags) = match record {
            AssemblyRecord::Multilayer { .. } => (EntityKind::Multilayer, None),
            AssemblyRecord::RepeatingMultilayer { .. } => (EntityKind::RepeatingMultilayer, None),
            AssemblyRecord::SurfactantLayer {
                constrain_area_per_molecule,
                conformal_roughness,
                ..
            } => (
                EntityKind::SurfactantLayer,
                Some((*constrain_area_per_molecule, *conformal_roughness)),
            ),
        };
        let id = self.session.claim(kind, record.unique_name())?;
        let layers_id = self
            .session
            .claim(EntityKind::LayerCollection, collection.unique_name.as_deref())?;
        let kind = match record {
            AssemblyRecord::Multilayer { .. } => AssemblyKind::Multilayer,
            AssemblyRecord::RepeatingMultilayer { repetitions, .. } => {
                let repetitions = self
                    .session
                    .restore_parameter(&id, repetitions, repetitions_spec(1.0))?;
                AssemblyKind::RepeatingMultilayer { repetitions }
            }
            AssemblyRecord::SurfactantLayer { .. } => AssemblyKind::SurfactantLayer(Surfactant::default()),
        };
        let id = self.session.assemble_assembly(AssemblyParts {
            id,
            name: record.name().to_string(),
            layers_id,
            layers_name: collection.name.clone(),
            populate_if_none: collection.populate_if_none,
            layers,
            kind,
        });
        let built = self.session.assembly(&id)?.layers.len();
        check_count("layer collection", built, collection.data.len())?;
        if let Some((constrain_area_per_molecule, conformal_roughness)) = flags {
            self.session
                .set_constrain_area_per_molecule(&id, constrain_area_per_molecule)?;
            self.session.set_conformal_roughness(&id, conformal_roughness)?;
        }
        if let Some(unique_name) = record.unique_name() {
            self.assemblies.insert(unique_name.to_string(), id.clone());
        }
        Ok(id)
    }

    pub(crate) fn validate_sample(&mut self, record: &SampleRecord) -> ReflResult<()> {
        if !self.declare(record.unique_name.as_deref(), EntityKind::Sample)? {
            return Ok(());
        }
        for assembly in &record.data {
            self.validate_assembly(assembly)?;
        }
        Ok(())
    }

    pub(crate) fn import_sample(&mut self, record: &SampleRecord) -> ReflResult<SampleId> {
        if let Some(existing) = record.unique_name.as_deref().and_then(|id| self.samples.get(id)) {
            return Ok(existing.clone());
        }
        let assemblies = record
            .data
            .iter()
            .map(|assembly| self.import_assembly(assembly))
            .collect::<ReflResult<Vec<_>>>()?;
        let id = self
            .session
            .claim(EntityKind::Sample, record.unique_name.as_deref())?;
        let id = self
            .session
            .assemble_sample(id, record.name.clone(), record.populate_if_none, assemblies);
        check_count("sample", self.session.sample(&id)?.assemblies.len(), record.data.len())?;
        if let Some(unique_name) = &record.unique_name {
            self.samples.insert(unique_name.clone(), id.clone());
        }
        Ok(id)
    }

    pub(crate) fn validate_model(&mut self, record: &ModelRecord) -> ReflResult<()> {
        if !self.declare(record.unique_name.as_deref(), EntityKind::Model)? {
            return Ok(());
        }
        check_values(&[&record.scale, &record.background])?;
        record.resolution_function.validate()?;
        if let Some(interface) = &record.interface {
            self.session.factory.ensure_known(interface)?;
        }
        self.validate_sample(&record.sample)
    }

    /// Base fields first, then the resolution function, then the calculator
    /// interface, which needs both to describe the model.
    pub(crate) fn import_model(&mut self, record: &ModelRecord) -> ReflResult<ModelId> {
        if let Some(existing) = record.unique_name.as_deref().and_then(|id| self.models.get(id)) {
            return Ok(existing.clone());
        }
        let sample = self.import_sample(&record.sample)?;
        let id = self
            .session
            .claim(EntityKind::Model, record.unique_name.as_deref())?;
        let scale = self
            .session
            .restore_parameter(&id, &record.scale, scale_spec(0.0))?;
        let background = self
            .session
            .restore_parameter(&id, &record.background, background_spec(0.0))?;
        let id = self.session.assemble_model(Model {
            id: ModelId::new(id),
            name: record.name.clone(),
            sample,
            scale,
            background,
            resolution: record.resolution_function.clone(),
            interface: None,
        });
        if let Some(interface) = &record.interface {
            self.session.set_interface(&id, Some(interface))?;
        }
        if let Some(unique_name) = &record.unique_name {
            self.models.insert(unique_name.clone(), id.clone());
        }
        debug!(model = %id, "model restored");
        Ok(id)
    }

    pub(crate) fn validate_material_collection(
        &mut self,
        record: &MaterialCollectionRecord,
    ) -> ReflResult<()> {
        self.declare_owned(record.unique_name.as_deref(), EntityKind::MaterialCollection)?;
        for material in &record.data {
            self.validate_material(material)?;
        }
        Ok(())
    }

    pub(crate) fn import_material_collection(
        &mut self,
        record: &MaterialCollectionRecord,
    ) -> ReflResult<CollectionId> {
        let materials = record
            .data
            .iter()
            .map(|material| self.import_material(material))
            .collect::<ReflResult<Vec<_>>>()?;
        let id = self
            .session
            .claim(EntityKind::MaterialCollection, record.unique_name.as_deref())?;
        let id = self.session.assemble_material_collection(
            id,
            record.name.clone(),
            record.populate_if_none,
            materials,
        );
        let built = self.session.material_collection(&id)?.len();
        check_count("material collection", built, record.data.len())?;
        Ok(id)
    }

    pub(crate) fn validate_model_collection(&mut self, record: &ModelCollectionRecord) -> ReflResult<()> {
        self.declare_owned(record.unique_name.as_deref(), EntityKind::ModelCollection)?;
        for model in &record.data {
            self.validate_model(model)?;
        }
        Ok(())
    }

    pub(crate) fn import_model_collection(
        &mut self,
        record: &ModelCollectionRecord,
    ) -> ReflResult<CollectionId> {
        let models = record
            .data
            .iter()
            .map(|model| self.import_model(model))
            .collect::<ReflResult<Vec<_>>>()?;
        let id = self
            .session
            .claim(EntityKind::ModelCollection, record.unique_name.as_deref())?;
        let id = self
            .session
            .assemble_model_collection(id, record.name.clone(), record.populate_if_none, models);
        let built = self.session.model_collection(&id)?.len();
        check_count("model collection", built, record.data.len())?;
        Ok(id)
    }
}

fn material_kind(record: &MaterialRecord) -> EntityKind {
    match record {
        MaterialRecord::Material { .. } => EntityKind::Material,
        MaterialRecord::MaterialMixture { .. } => EntityKind::MaterialMixture,
        MaterialRecord::MaterialSolvated { .. } => EntityKind::MaterialSolvated,
        MaterialRecord::MaterialDensity { .. } => EntityKind::MaterialDensity,
    }
}

/// Splits the solvated material of a molecular film into its identifier,
/// molecule, solvent and solvent fraction.
fn film_parts(
    material: &MaterialRecord,
) -> ReflResult<(Option<&str>, &MaterialRecord, &MaterialRecord, &ParameterRecord)> {
    match material {
        MaterialRecord::MaterialSolvated {
            unique_name,
            material,
            solvent,
            solvent_fraction,
            ..
        } => Ok((unique_name.as_deref(), material, solvent, solvent_fraction)),
        _ => Err(film_material_error()),
    }
}

fn film_material_error() -> ReflError {
    ReflError::validation(
        "VALIDATION.AREA_PER_MOLECULE_MATERIAL",
        "an area-per-molecule layer needs a solvated material whose molecule is a plain material",
    )
}

/// Boundary enablement is recomputed by the owning sample, so restored layer
/// extents always start enabled.
fn released(record: &ParameterRecord) -> ParameterRecord {
    ParameterRecord {
        enabled: true,
        ..record.clone()
    }
}

fn check_values(records: &[&ParameterRecord]) -> ReflResult<()> {
    for record in records {
        check_finite(&record.name, record.value)?;
        check_bounds(&record.name, record.min, record.max)?;
    }
    Ok(())
}

/// Collections are stored as recorded, flag included, but an import never
/// seeds them; the stored length must match the record.
fn check_count(container: &str, built: usize, recorded: usize) -> ReflResult<()> {
    if built == recorded {
        Ok(())
    } else {
        Err(ReflError::structural_mismatch(
            "STRUCTURE.ELEMENT_COUNT",
            format!(
                "{} rebuilt {} element(s) but the dictionary lists {}",
                container, built, recorded
            ),
        ))
    }
}

fn kind_mismatch(id: &str, found: EntityKind, expected: EntityKind) -> ReflError {
    ReflError::validation(
        "VALIDATION.IDENTIFIER_KIND",
        format!("identifier '{}' names a {} where a {} is expected", id, found, expected),
    )
}
