//! Layers: a material reference plus thickness and roughness, and the
//! molecular-film variant described by formula and area per molecule.

use crate::common::constants::{AREA_UNIT, LENGTH_UNIT};
use crate::domain::{EntityKind, LayerId, MaterialId, ParameterId, ReflError, ReflResult};
use crate::material::{
    DEFAULT_SOLVENT_FRACTION, MixtureParts, MixtureRole, check_fraction, fraction_spec, isld_spec,
    scattering_length_specs, sld_spec,
};
use crate::material::check_finite;
use crate::parameter::{ParameterSpec, Relation};
use crate::serialization::{Importer, LayerRecord, append_duplicate_suffix};
use crate::session::{ParamSource, Session};
use serde_json::Value;
use tracing::debug;

pub const DEFAULT_LAYER_NAME: &str = "EasyLayer";
pub const DEFAULT_THICKNESS: f64 = 10.0;
pub const DEFAULT_ROUGHNESS: f64 = 3.3;
pub const DEFAULT_AREA_PER_MOLECULE_NAME: &str = "EasyLayerAreaPerMolecule";
pub const DEFAULT_MOLECULAR_FORMULA: &str = "C10H18NO8P";
pub const DEFAULT_AREA_PER_MOLECULE: f64 = 48.2;

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub(crate) id: LayerId,
    pub(crate) name: String,
    pub(crate) material: MaterialId,
    pub(crate) thickness: ParameterId,
    pub(crate) roughness: ParameterId,
    pub(crate) kind: LayerKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    Plain,
    AreaPerMolecule(AreaPerMolecule),
}

/// Molecular film. The layer material is an internal solvated material
/// whose molecule SLD is `b / (thickness * area_per_molecule)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaPerMolecule {
    pub(crate) molecular_formula: String,
    pub(crate) area_per_molecule: ParameterId,
    pub(crate) scattering_length_real: ParameterId,
    pub(crate) scattering_length_imag: ParameterId,
    pub(crate) molecule: MaterialId,
}

impl AreaPerMolecule {
    pub fn molecular_formula(&self) -> &str {
        &self.molecular_formula
    }

    pub fn area_per_molecule(&self) -> &ParameterId {
        &self.area_per_molecule
    }

    pub fn scattering_length_real(&self) -> &ParameterId {
        &self.scattering_length_real
    }

    pub fn scattering_length_imag(&self) -> &ParameterId {
        &self.scattering_length_imag
    }

    pub fn molecule(&self) -> &MaterialId {
        &self.molecule
    }
}

impl Layer {
    pub fn id(&self) -> &LayerId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn material(&self) -> &MaterialId {
        &self.material
    }

    pub fn thickness(&self) -> &ParameterId {
        &self.thickness
    }

    pub fn roughness(&self) -> &ParameterId {
        &self.roughness
    }

    pub fn kind(&self) -> &LayerKind {
        &self.kind
    }

    pub fn entity_kind(&self) -> EntityKind {
        match self.kind {
            LayerKind::Plain => EntityKind::Layer,
            LayerKind::AreaPerMolecule(_) => EntityKind::LayerAreaPerMolecule,
        }
    }

    pub fn as_area_per_molecule(&self) -> Option<&AreaPerMolecule> {
        match &self.kind {
            LayerKind::AreaPerMolecule(film) => Some(film),
            LayerKind::Plain => None,
        }
    }

    /// Parameters owned by the layer itself.
    pub fn parameters(&self) -> Vec<&ParameterId> {
        let mut parameters = vec![&self.thickness, &self.roughness];
        if let LayerKind::AreaPerMolecule(film) = &self.kind {
            parameters.extend([
                &film.area_per_molecule,
                &film.scattering_length_real,
                &film.scattering_length_imag,
            ]);
        }
        parameters
    }
}

/// Construction values for an area-per-molecule layer.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaPerMoleculeSpec {
    pub name: String,
    pub molecular_formula: String,
    pub thickness: f64,
    pub roughness: f64,
    pub area_per_molecule: f64,
    pub solvent_fraction: f64,
}

impl AreaPerMoleculeSpec {
    pub fn new(molecular_formula: impl Into<String>) -> Self {
        Self {
            name: DEFAULT_AREA_PER_MOLECULE_NAME.to_string(),
            molecular_formula: molecular_formula.into(),
            thickness: DEFAULT_THICKNESS,
            roughness: DEFAULT_ROUGHNESS,
            area_per_molecule: DEFAULT_AREA_PER_MOLECULE,
            solvent_fraction: DEFAULT_SOLVENT_FRACTION,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn thickness(mut self, thickness: f64) -> Self {
        self.thickness = thickness;
        self
    }

    pub fn roughness(mut self, roughness: f64) -> Self {
        self.roughness = roughness;
        self
    }

    pub fn area_per_molecule(mut self, area_per_molecule: f64) -> Self {
        self.area_per_molecule = area_per_molecule;
        self
    }

    pub fn solvent_fraction(mut self, solvent_fraction: f64) -> Self {
        self.solvent_fraction = solvent_fraction;
        self
    }
}

pub(crate) fn thickness_spec(value: f64) -> ParameterSpec {
    ParameterSpec::new("thickness", value)
        .unit(LENGTH_UNIT)
        .bounds(0.0, f64::INFINITY)
}

pub(crate) fn roughness_spec(value: f64) -> ParameterSpec {
    ParameterSpec::new("roughness", value)
        .unit(LENGTH_UNIT)
        .bounds(0.0, f64::INFINITY)
}

pub(crate) fn area_per_molecule_spec(value: f64) -> ParameterSpec {
    ParameterSpec::new("area_per_molecule", value)
        .unit(AREA_UNIT)
        .bounds(0.0, f64::INFINITY)
}

pub(crate) struct AreaPerMoleculeParts<'a> {
    pub id: String,
    pub name: String,
    pub molecular_formula: String,
    pub thickness: ParamSource<'a>,
    pub roughness: ParamSource<'a>,
    pub area_per_molecule: ParamSource<'a>,
    pub scattering_length_real: ParamSource<'a>,
    pub scattering_length_imag: ParamSource<'a>,
    pub molecule_id: String,
    pub molecule_sld: ParamSource<'a>,
    pub molecule_isld: ParamSource<'a>,
    pub solvated_id: String,
    pub solvated_name: Option<String>,
    pub solvent: MaterialId,
    pub solvent_fraction: ParamSource<'a>,
    pub solvated_sld: ParamSource<'a>,
    pub solvated_isld: ParamSource<'a>,
}

impl Session {
    pub fn create_layer(
        &mut self,
        name: &str,
        material: &MaterialId,
        thickness: f64,
        roughness: f64,
    ) -> ReflResult<LayerId> {
        self.material(material)?;
        check_finite("thickness", thickness)?;
        check_finite("roughness", roughness)?;
        let id = self.mint(EntityKind::Layer);
        self.assemble_layer(
            id,
            name.to_string(),
            material.clone(),
            ParamSource::Fresh(thickness_spec(thickness)),
            ParamSource::Fresh(roughness_spec(roughness)),
        )
    }

    /// Default layer over a fresh default material.
    pub fn create_default_layer(&mut self) -> ReflResult<LayerId> {
        let material = self.create_default_material()?;
        self.create_layer(DEFAULT_LAYER_NAME, &material, DEFAULT_THICKNESS, DEFAULT_ROUGHNESS)
    }

    pub(crate) fn assemble_layer(
        &mut self,
        id: String,
        name: String,
        material: MaterialId,
        thickness: ParamSource<'_>,
        roughness: ParamSource<'_>,
    ) -> ReflResult<LayerId> {
        let thickness = self.parameter_from(&id, thickness)?;
        let roughness = self.parameter_from(&id, roughness)?;
        self.registry.link(&id, material.as_str());
        let id = LayerId::new(id);
        debug!(layer = %id, material = %material, "layer created");
        self.layers.insert(
            id.clone(),
            Layer {
                id: id.clone(),
                name,
                material,
                thickness,
                roughness,
                kind: LayerKind::Plain,
            },
        );
        Ok(id)
    }

    pub fn create_layer_area_per_molecule(
        &mut self,
        spec: &AreaPerMoleculeSpec,
        solvent: &MaterialId,
    ) -> ReflResult<LayerId> {
        self.material(solvent)?;
        for (label, value) in [
            ("thickness", spec.thickness),
            ("roughness", spec.roughness),
            ("area_per_molecule", spec.area_per_molecule),
        ] {
            check_finite(label, value)?;
        }
        check_fraction(spec.solvent_fraction)?;
        let (length, _) = self.formula_properties(&spec.molecular_formula)?;
        let (real, imag) = scattering_length_specs(length);

        let id = self.mint(EntityKind::LayerAreaPerMolecule);
        let molecule_id = self.mint(EntityKind::Material);
        let solvated_id = self.mint(EntityKind::MaterialSolvated);
        self.assemble_area_per_molecule_layer(AreaPerMoleculeParts {
            id,
            name: spec.name.clone(),
            molecular_formula: spec.molecular_formula.clone(),
            thickness: ParamSource::Fresh(thickness_spec(spec.thickness)),
            roughness: ParamSource::Fresh(roughness_spec(spec.roughness)),
            area_per_molecule: ParamSource::Fresh(area_per_molecule_spec(spec.area_per_molecule)),
            scattering_length_real: ParamSource::Fresh(real),
            scattering_length_imag: ParamSource::Fresh(imag),
            molecule_id,
            molecule_sld: ParamSource::Fresh(sld_spec(0.0)),
            molecule_isld: ParamSource::Fresh(isld_spec(0.0)),
            solvated_id,
            solvated_name: None,
            solvent: solvent.clone(),
            solvent_fraction: ParamSource::Fresh(fraction_spec(
                MixtureRole::Solvated,
                spec.solvent_fraction,
            )),
            solvated_sld: ParamSource::Fresh(sld_spec(0.0)),
            solvated_isld: ParamSource::Fresh(isld_spec(0.0)),
        })
    }

    /// Default phospholipid head group in D2O.
    pub fn create_default_layer_area_per_molecule(&mut self) -> ReflResult<LayerId> {
        let solvent = self.create_material("D2O", 6.36, 0.0)?;
        self.create_layer_area_per_molecule(&AreaPerMoleculeSpec::new(DEFAULT_MOLECULAR_FORMULA), &solvent)
    }

    pub(crate) fn assemble_area_per_molecule_layer(
        &mut self,
        parts: AreaPerMoleculeParts<'_>,
    ) -> ReflResult<LayerId> {
        let thickness = self.parameter_from(&parts.id, parts.thickness)?;
        let roughness = self.parameter_from(&parts.id, parts.roughness)?;
        let area = self.parameter_from(&parts.id, parts.area_per_molecule)?;
        let real = self.parameter_from(&parts.id, parts.scattering_length_real)?;
        let imag = self.parameter_from(&parts.id, parts.scattering_length_imag)?;

        let molecule = self.assemble_material(
            parts.molecule_id,
            parts.molecular_formula.clone(),
            parts.molecule_sld,
            parts.molecule_isld,
        )?;
        let (molecule_sld, molecule_isld) = {
            let material = self.material(&molecule)?;
            (material.sld.clone(), material.isld.clone())
        };
        self.parameters.bind_constraint(
            &molecule_sld,
            &[real.clone(), thickness.clone(), area.clone()],
            Relation::MoleculeSld,
        )?;
        self.parameters.bind_constraint(
            &molecule_isld,
            &[imag.clone(), thickness.clone(), area.clone()],
            Relation::MoleculeSld,
        )?;

        let solvated = self.assemble_mixture(MixtureParts {
            id: parts.solvated_id,
            name: parts.solvated_name,
            material_a: molecule.clone(),
            material_b: parts.solvent,
            role: MixtureRole::Solvated,
            fraction: parts.solvent_fraction,
            sld: parts.solvated_sld,
            isld: parts.solvated_isld,
        })?;
        self.registry.link(&parts.id, solvated.as_str());

        let id = LayerId::new(parts.id);
        debug!(layer = %id, formula = parts.molecular_formula.as_str(), "area per molecule layer created");
        self.layers.insert(
            id.clone(),
            Layer {
                id: id.clone(),
                name: parts.name,
                material: solvated,
                thickness,
                roughness,
                kind: LayerKind::AreaPerMolecule(AreaPerMolecule {
                    molecular_formula: parts.molecular_formula,
                    area_per_molecule: area,
                    scattering_length_real: real,
                    scattering_length_imag: imag,
                    molecule,
                }),
            },
        );
        Ok(id)
    }

    pub fn area_per_molecule_layer(&self, id: &LayerId) -> ReflResult<&AreaPerMolecule> {
        self.layer(id)?.as_area_per_molecule().ok_or_else(|| {
            ReflError::validation(
                "VALIDATION.NOT_AREA_PER_MOLECULE",
                format!("layer '{}' is not an area-per-molecule layer", id),
            )
        })
    }

    pub fn rename_layer(&mut self, id: &LayerId, name: &str) -> ReflResult<()> {
        self.layer_mut(id)?.name = name.to_string();
        Ok(())
    }

    pub fn set_layer_thickness(&mut self, id: &LayerId, thickness: f64) -> ReflResult<()> {
        let parameter = self.layer(id)?.thickness.clone();
        self.set_parameter_value(&parameter, thickness)
    }

    pub fn set_layer_roughness(&mut self, id: &LayerId, roughness: f64) -> ReflResult<()> {
        let parameter = self.layer(id)?.roughness.clone();
        self.set_parameter_value(&parameter, roughness)
    }

    /// Swaps the layer's material. Area-per-molecule layers own their
    /// material and refuse.
    pub fn assign_material(&mut self, id: &LayerId, material: &MaterialId) -> ReflResult<()> {
        let layer = self.layer(id)?;
        if layer.as_area_per_molecule().is_some() {
            return Err(ReflError::validation(
                "VALIDATION.AREA_PER_MOLECULE_MATERIAL",
                format!(
                    "layer '{}' derives its material from its molecular formula; change the formula or solvent instead",
                    id
                ),
            ));
        }
        let previous = layer.material.clone();
        self.material(material)?;

        self.registry.unlink(id.as_str(), previous.as_str());
        self.registry.link(id.as_str(), material.as_str());
        self.layer_mut(id)?.material = material.clone();
        debug!(layer = %id, previous = %previous, material = %material, "material assigned");
        self.sync_calculators();
        Ok(())
    }

    pub fn set_molecular_formula(&mut self, id: &LayerId, formula: &str) -> ReflResult<()> {
        let film = self.area_per_molecule_layer(id)?.clone();
        let (length, _) = self.formula_properties(formula)?;
        self.parameters
            .assign_value(&film.scattering_length_real, length.re)?;
        self.parameters
            .assign_value(&film.scattering_length_imag, length.im)?;
        if let LayerKind::AreaPerMolecule(stored) = &mut self.layer_mut(id)?.kind {
            stored.molecular_formula = formula.to_string();
        }
        self.material_mut(&film.molecule)?.name = formula.to_string();
        self.refresh_dependent_names(&film.molecule);
        self.flush();
        Ok(())
    }

    pub fn set_area_per_molecule(&mut self, id: &LayerId, area: f64) -> ReflResult<()> {
        let parameter = self.area_per_molecule_layer(id)?.area_per_molecule.clone();
        self.set_parameter_value(&parameter, area)
    }

    pub fn set_layer_solvent(&mut self, id: &LayerId, solvent: &MaterialId) -> ReflResult<()> {
        self.area_per_molecule_layer(id)?;
        let solvated = self.layer(id)?.material.clone();
        self.set_mixture_material_b(&solvated, solvent)
    }

    pub fn set_layer_solvent_fraction(&mut self, id: &LayerId, fraction: f64) -> ReflResult<()> {
        self.area_per_molecule_layer(id)?;
        let solvated = self.layer(id)?.material.clone();
        self.set_mixture_fraction(&solvated, fraction)
    }

    /// Solvent material of an area-per-molecule layer.
    pub fn layer_solvent(&self, id: &LayerId) -> ReflResult<&MaterialId> {
        self.area_per_molecule_layer(id)?;
        let solvated = &self.layer(id)?.material;
        Ok(&self.mixture(solvated)?.material_b)
    }

    pub fn layer_as_dict(&self, id: &LayerId) -> ReflResult<Value> {
        Ok(serde_json::to_value(self.layer_record(id)?)?)
    }

    pub fn layer_from_dict(&mut self, value: &Value) -> ReflResult<LayerId> {
        let record: LayerRecord = serde_json::from_value(value.clone())?;
        Importer::new(self).run(
            |importer| importer.validate_layer(&record),
            |importer| importer.import_layer(&record),
        )
    }

    pub fn duplicate_layer(&mut self, id: &LayerId) -> ReflResult<LayerId> {
        let original = self.layer_record(id)?;
        let mut record = self.duplicate_record(&original)?;
        append_duplicate_suffix(record.name_mut());
        Importer::new(self).run(
            |importer| importer.validate_layer(&record),
            |importer| importer.import_layer(&record),
        )
    }

    /// Drops a layer nothing contains any more, together with its parameters
    /// and, for molecular films, the internal materials. Shared materials are
    /// only unlinked.
    pub(crate) fn release_layer(&mut self, id: &LayerId) -> bool {
        if self.registry.has_parents(id.as_str()) {
            return false;
        }
        let Some(layer) = self.layers.remove(id) else {
            return false;
        };
        for parameter in layer.parameters() {
            self.drop_parameter(parameter);
        }
        self.deregister(id.as_str());
        if let LayerKind::AreaPerMolecule(film) = &layer.kind {
            self.release_material(&layer.material);
            self.release_material(&film.molecule);
        }
        debug!(layer = %id, "layer released");
        true
    }
}
