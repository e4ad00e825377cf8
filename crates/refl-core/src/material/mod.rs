//! Material family: plain materials, two-component blends and
//! density-derived materials.

mod density;
mod mixture;

pub use density::{DEFAULT_CHEMICAL_STRUCTURE, DEFAULT_DENSITY, DEFAULT_DENSITY_NAME, Density};
pub use mixture::{DEFAULT_MIXTURE_FRACTION, DEFAULT_SOLVENT_FRACTION, Mixture, MixtureRole};

pub(crate) use density::{
    DensityParts, density_spec, molecular_weight_spec, scattering_length_specs,
};
pub(crate) use mixture::{MixtureParts, check_fraction, fraction_spec, mixture_name};

use crate::common::constants::SLD_UNIT;
use crate::domain::{EntityKind, MaterialId, ParameterId, ReflError, ReflResult};
use crate::parameter::ParameterSpec;
use crate::serialization::{Importer, MaterialRecord, append_duplicate_suffix};
use crate::session::{ParamSource, Session};
use num_complex::Complex64;
use serde_json::Value;
use tracing::debug;

pub const DEFAULT_MATERIAL_NAME: &str = "EasyMaterial";
pub const DEFAULT_SLD: f64 = 4.186;
pub const DEFAULT_ISLD: f64 = 0.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub(crate) id: MaterialId,
    pub(crate) name: String,
    pub(crate) sld: ParameterId,
    pub(crate) isld: ParameterId,
    pub(crate) kind: MaterialKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MaterialKind {
    Plain,
    Mixture(Mixture),
    Density(Density),
}

impl Material {
    pub fn id(&self) -> &MaterialId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Real SLD in 1e-6 Å^-2.
    pub fn sld(&self) -> &ParameterId {
        &self.sld
    }

    /// Imaginary SLD in 1e-6 Å^-2.
    pub fn isld(&self) -> &ParameterId {
        &self.isld
    }

    pub fn kind(&self) -> &MaterialKind {
        &self.kind
    }

    pub fn entity_kind(&self) -> EntityKind {
        match &self.kind {
            MaterialKind::Plain => EntityKind::Material,
            MaterialKind::Mixture(mixture) => mixture.role.entity_kind(),
            MaterialKind::Density(_) => EntityKind::MaterialDensity,
        }
    }

    pub fn as_mixture(&self) -> Option<&Mixture> {
        match &self.kind {
            MaterialKind::Mixture(mixture) => Some(mixture),
            _ => None,
        }
    }

    pub fn as_density(&self) -> Option<&Density> {
        match &self.kind {
            MaterialKind::Density(density) => Some(density),
            _ => None,
        }
    }

    /// Every parameter the material owns, outputs first.
    pub fn parameters(&self) -> Vec<&ParameterId> {
        let mut parameters = vec![&self.sld, &self.isld];
        match &self.kind {
            MaterialKind::Plain => {}
            MaterialKind::Mixture(mixture) => parameters.push(&mixture.fraction),
            MaterialKind::Density(density) => parameters.extend([
                &density.density,
                &density.scattering_length_real,
                &density.scattering_length_imag,
                &density.molecular_weight,
            ]),
        }
        parameters
    }
}

pub(crate) fn sld_spec(value: f64) -> ParameterSpec {
    ParameterSpec::new("sld", value)
        .unit(SLD_UNIT)
        .description("Real part of the scattering length density (1e-6)")
}

pub(crate) fn isld_spec(value: f64) -> ParameterSpec {
    ParameterSpec::new("isld", value)
        .unit(SLD_UNIT)
        .description("Imaginary part of the scattering length density (1e-6)")
}

pub(crate) fn check_finite(label: &str, value: f64) -> ReflResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ReflError::validation(
            "VALIDATION.NON_FINITE",
            format!("{} must be finite, got {}", label, value),
        ))
    }
}

impl Session {
    pub fn create_material(&mut self, name: &str, sld: f64, isld: f64) -> ReflResult<MaterialId> {
        check_finite("sld", sld)?;
        check_finite("isld", isld)?;
        let id = self.mint(EntityKind::Material);
        self.assemble_material(
            id,
            name.to_string(),
            ParamSource::Fresh(sld_spec(sld)),
            ParamSource::Fresh(isld_spec(isld)),
        )
    }

    pub fn create_default_material(&mut self) -> ReflResult<MaterialId> {
        self.create_material(DEFAULT_MATERIAL_NAME, DEFAULT_SLD, DEFAULT_ISLD)
    }

    pub(crate) fn assemble_material(
        &mut self,
        id: String,
        name: String,
        sld: ParamSource<'_>,
        isld: ParamSource<'_>,
    ) -> ReflResult<MaterialId> {
        let sld = self.parameter_from(&id, sld)?;
        let isld = self.parameter_from(&id, isld)?;
        let id = MaterialId::new(id);
        debug!(material = %id, name = name.as_str(), "material created");
        self.materials.insert(
            id.clone(),
            Material {
                id: id.clone(),
                name,
                sld,
                isld,
                kind: MaterialKind::Plain,
            },
        );
        Ok(id)
    }

    pub fn rename_material(&mut self, id: &MaterialId, name: &str) -> ReflResult<()> {
        let material = self.material_mut(id)?;
        material.name = name.to_string();
        if let MaterialKind::Mixture(mixture) = &mut material.kind {
            mixture.auto_name = false;
        }
        self.refresh_dependent_names(id);
        Ok(())
    }

    pub fn set_material_sld(&mut self, id: &MaterialId, value: f64) -> ReflResult<()> {
        let sld = self.material(id)?.sld.clone();
        self.set_parameter_value(&sld, value)
    }

    pub fn set_material_isld(&mut self, id: &MaterialId, value: f64) -> ReflResult<()> {
        let isld = self.material(id)?.isld.clone();
        self.set_parameter_value(&isld, value)
    }

    /// `sld + i * isld`
    pub fn complex_sld(&self, id: &MaterialId) -> ReflResult<Complex64> {
        let material = self.material(id)?;
        Ok(Complex64::new(
            self.value(&material.sld)?,
            self.value(&material.isld)?,
        ))
    }

    /// Deletes a material nothing else references.
    pub fn delete_material(&mut self, id: &MaterialId) -> ReflResult<()> {
        self.material(id)?;
        if self.registry.has_parents(id.as_str()) {
            return Err(ReflError::validation(
                "VALIDATION.MATERIAL_IN_USE",
                format!(
                    "material '{}' is still referenced by {}",
                    id,
                    self.registry.parents_of(id.as_str()).join(", ")
                ),
            ));
        }
        self.release_material(id);
        Ok(())
    }

    pub fn material_as_dict(&self, id: &MaterialId) -> ReflResult<Value> {
        Ok(serde_json::to_value(self.material_record(id)?)?)
    }

    pub fn material_from_dict(&mut self, value: &Value) -> ReflResult<MaterialId> {
        let record: MaterialRecord = serde_json::from_value(value.clone())?;
        Importer::new(self).run(
            |importer| importer.validate_material(&record),
            |importer| importer.import_material(&record),
        )
    }

    pub fn duplicate_material(&mut self, id: &MaterialId) -> ReflResult<MaterialId> {
        let original = self.material_record(id)?;
        let mut record = self.duplicate_record(&original)?;
        append_duplicate_suffix(record.name_mut());
        Importer::new(self).run(
            |importer| importer.validate_material(&record),
            |importer| importer.import_material(&record),
        )
    }

    /// Removes the material with its parameters and edges, regardless of
    /// references. Constituents of a blend are left alone.
    pub(crate) fn release_material(&mut self, id: &MaterialId) {
        let Some(material) = self.materials.remove(id) else {
            return;
        };
        for parameter in material.parameters() {
            self.drop_parameter(parameter);
        }
        self.deregister(id.as_str());
        debug!(material = %id, "material released");
    }

    /// Recomputes generated blend names that depend on `id`, transitively.
    pub(crate) fn refresh_dependent_names(&mut self, id: &MaterialId) {
        let parents: Vec<MaterialId> = self
            .registry
            .parents_of(id.as_str())
            .iter()
            .filter(|parent| {
                self.registry
                    .kind_of(parent)
                    .is_some_and(EntityKind::is_material)
            })
            .map(|parent| MaterialId::new(parent.as_str()))
            .collect();
        for parent in parents {
            self.refresh_mixture_name(&parent);
        }
    }

    fn refresh_mixture_name(&mut self, id: &MaterialId) {
        let Some(mixture) = self.materials.get(id).and_then(Material::as_mixture) else {
            return;
        };
        if !mixture.auto_name {
            return;
        }
        let (Some(a), Some(b)) = (
            self.materials.get(&mixture.material_a),
            self.materials.get(&mixture.material_b),
        ) else {
            return;
        };
        let name = mixture_name(&a.name, &b.name);
        if let Some(material) = self.materials.get_mut(id) {
            material.name = name;
        }
        self.refresh_dependent_names(id);
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{EntityKind, ReflErrorCategory};
    use crate::session::Session;

    #[test]
    fn default_material_uses_documented_values() {
        let mut session = Session::new();
        let id = session.create_default_material().unwrap();
        let material = session.material(&id).unwrap();
        assert_eq!(material.name(), "EasyMaterial");
        assert_eq!(session.value(material.sld()).unwrap(), 4.186);
        assert_eq!(session.value(material.isld()).unwrap(), 0.0);
        assert_eq!(material.entity_kind(), EntityKind::Material);
        assert!(id.as_str().starts_with("Material_"));
    }

    #[test]
    fn complex_sld_combines_both_parts() {
        let mut session = Session::new();
        let boron = session.create_material("Boron", 6.908, -0.278).unwrap();
        let sld = session.complex_sld(&boron).unwrap();
        assert_eq!(sld.re, 6.908);
        assert_eq!(sld.im, -0.278);
    }

    #[test]
    fn non_finite_values_are_rejected_before_registration() {
        let mut session = Session::new();
        let error = session
            .create_material("bad", f64::NAN, 0.0)
            .expect_err("nan sld");
        assert_eq!(error.category(), ReflErrorCategory::Validation);
        assert!(session.registry().is_empty());
    }

    #[test]
    fn referenced_materials_cannot_be_deleted() {
        let mut session = Session::new();
        let a = session.create_material("a", 1.0, 0.0).unwrap();
        let b = session.create_material("b", 2.0, 0.0).unwrap();
        let mixture = session.create_mixture(&a, &b, 0.5, None).unwrap();
        let error = session.delete_material(&a).expect_err("a is a constituent");
        assert_eq!(error.code(), "VALIDATION.MATERIAL_IN_USE");

        session.delete_material(&mixture).unwrap();
        session.delete_material(&a).unwrap();
        assert!(session.material(&a).is_err());
        assert!(session.material(&b).is_ok());
    }

    #[test]
    fn duplicate_material_mints_fresh_ids_and_suffixes_the_name() {
        let mut session = Session::new();
        let original = session.create_material("Boron", 6.908, -0.278).unwrap();
        let copy = session.duplicate_material(&original).unwrap();
        assert_ne!(copy, original);
        let duplicate = session.material(&copy).unwrap();
        assert_eq!(duplicate.name(), "Boron duplicate");
        assert_ne!(duplicate.sld(), session.material(&original).unwrap().sld());
        assert_eq!(session.value(duplicate.isld()).unwrap(), -0.278);
    }
}
