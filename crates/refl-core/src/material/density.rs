use super::{Material, MaterialKind, check_finite};
use crate::common::constants::{DENSITY_UNIT, LENGTH_UNIT, MASS_UNIT};
use crate::common::formula::ChemicalFormula;
use crate::domain::{EntityKind, MaterialId, ParameterId, ReflError, ReflResult};
use crate::parameter::{ParameterSpec, Relation};
use crate::session::{ParamSource, Session};
use num_complex::Complex64;
use tracing::debug;

pub const DEFAULT_CHEMICAL_STRUCTURE: &str = "Si";
pub const DEFAULT_DENSITY: f64 = 2.33;
pub const DEFAULT_DENSITY_NAME: &str = "EasyMaterialDensity";

/// Material whose SLD follows from a chemical formula and a mass density.
#[derive(Debug, Clone, PartialEq)]
pub struct Density {
    pub(crate) chemical_structure: String,
    pub(crate) density: ParameterId,
    pub(crate) scattering_length_real: ParameterId,
    pub(crate) scattering_length_imag: ParameterId,
    pub(crate) molecular_weight: ParameterId,
}

impl Density {
    pub fn chemical_structure(&self) -> &str {
        &self.chemical_structure
    }

    pub fn density(&self) -> &ParameterId {
        &self.density
    }

    pub fn scattering_length_real(&self) -> &ParameterId {
        &self.scattering_length_real
    }

    pub fn scattering_length_imag(&self) -> &ParameterId {
        &self.scattering_length_imag
    }

    pub fn molecular_weight(&self) -> &ParameterId {
        &self.molecular_weight
    }
}

pub(crate) fn density_spec(value: f64) -> ParameterSpec {
    ParameterSpec::new("density", value)
        .unit(DENSITY_UNIT)
        .bounds(0.0, f64::INFINITY)
}

pub(crate) fn scattering_length_specs(length: Complex64) -> (ParameterSpec, ParameterSpec) {
    (
        ParameterSpec::new("scattering_length_real", length.re)
            .unit(LENGTH_UNIT)
            .fixed(true),
        ParameterSpec::new("scattering_length_imag", length.im)
            .unit(LENGTH_UNIT)
            .fixed(true),
    )
}

pub(crate) fn molecular_weight_spec(value: f64) -> ParameterSpec {
    ParameterSpec::new("molecular_weight", value)
        .unit(MASS_UNIT)
        .fixed(true)
}

pub(crate) struct DensityParts<'a> {
    pub id: String,
    pub name: String,
    pub chemical_structure: String,
    pub density: ParamSource<'a>,
    pub scattering_length_real: ParamSource<'a>,
    pub scattering_length_imag: ParamSource<'a>,
    pub molecular_weight: ParamSource<'a>,
    pub sld: ParamSource<'a>,
    pub isld: ParamSource<'a>,
}

impl Session {
    /// Scattering length (Å) and molecular weight (g/mol) of a formula.
    pub fn formula_properties(&self, formula: &str) -> ReflResult<(Complex64, f64)> {
        let parsed = ChemicalFormula::parse(formula)?;
        let length = parsed.scattering_length(self.element_data())?;
        let weight = parsed.molecular_weight(self.element_data())?;
        Ok((length, weight))
    }

    pub fn create_material_density(
        &mut self,
        chemical_structure: &str,
        density: f64,
        name: Option<&str>,
    ) -> ReflResult<MaterialId> {
        check_density(density)?;
        let (length, weight) = self.formula_properties(chemical_structure)?;
        let (real, imag) = scattering_length_specs(length);

        let id = self.mint(EntityKind::MaterialDensity);
        self.assemble_density(DensityParts {
            id,
            name: name.unwrap_or(DEFAULT_DENSITY_NAME).to_string(),
            chemical_structure: chemical_structure.to_string(),
            density: ParamSource::Fresh(density_spec(density)),
            scattering_length_real: ParamSource::Fresh(real),
            scattering_length_imag: ParamSource::Fresh(imag),
            molecular_weight: ParamSource::Fresh(molecular_weight_spec(weight)),
            sld: ParamSource::Fresh(super::sld_spec(0.0)),
            isld: ParamSource::Fresh(super::isld_spec(0.0)),
        })
    }

    pub fn create_default_material_density(&mut self) -> ReflResult<MaterialId> {
        self.create_material_density(DEFAULT_CHEMICAL_STRUCTURE, DEFAULT_DENSITY, None)
    }

    pub(crate) fn assemble_density(&mut self, parts: DensityParts<'_>) -> ReflResult<MaterialId> {
        let density = self.parameter_from(&parts.id, parts.density)?;
        let real = self.parameter_from(&parts.id, parts.scattering_length_real)?;
        let imag = self.parameter_from(&parts.id, parts.scattering_length_imag)?;
        let weight = self.parameter_from(&parts.id, parts.molecular_weight)?;
        let sld = self.parameter_from(&parts.id, parts.sld)?;
        let isld = self.parameter_from(&parts.id, parts.isld)?;

        self.parameters.bind_constraint(
            &sld,
            &[real.clone(), weight.clone(), density.clone()],
            Relation::DensitySld,
        )?;
        self.parameters.bind_constraint(
            &isld,
            &[imag.clone(), weight.clone(), density.clone()],
            Relation::DensitySld,
        )?;

        let id = MaterialId::new(parts.id);
        debug!(material = %id, formula = parts.chemical_structure.as_str(), "density material created");
        self.materials.insert(
            id.clone(),
            Material {
                id: id.clone(),
                name: parts.name,
                sld,
                isld,
                kind: MaterialKind::Density(Density {
                    chemical_structure: parts.chemical_structure,
                    density,
                    scattering_length_real: real,
                    scattering_length_imag: imag,
                    molecular_weight: weight,
                }),
            },
        );
        Ok(id)
    }

    pub fn density_material(&self, id: &MaterialId) -> ReflResult<&Density> {
        self.material(id)?.as_density().ok_or_else(|| {
            ReflError::validation(
                "VALIDATION.NOT_A_DENSITY_MATERIAL",
                format!("material '{}' is not defined by density", id),
            )
        })
    }

    /// Re-parses the formula and refreshes the constraint inputs.
    pub fn set_chemical_structure(&mut self, id: &MaterialId, formula: &str) -> ReflResult<()> {
        let density = self.density_material(id)?.clone();
        let (length, weight) = self.formula_properties(formula)?;

        self.parameters
            .assign_value(&density.scattering_length_real, length.re)?;
        self.parameters
            .assign_value(&density.scattering_length_imag, length.im)?;
        self.parameters
            .assign_value(&density.molecular_weight, weight)?;
        if let MaterialKind::Density(stored) = &mut self.material_mut(id)?.kind {
            stored.chemical_structure = formula.to_string();
        }
        debug!(material = %id, formula, "chemical structure changed");
        self.flush();
        Ok(())
    }

    pub fn set_density(&mut self, id: &MaterialId, density: f64) -> ReflResult<()> {
        check_density(density)?;
        let parameter = self.density_material(id)?.density.clone();
        self.set_parameter_value(&parameter, density)
    }
}

fn check_density(density: f64) -> ReflResult<()> {
    check_finite("density", density)?;
    if density < 0.0 {
        return Err(ReflError::validation(
            "VALIDATION.DENSITY",
            format!("density must be non-negative, got {}", density),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::domain::{EntityKind, ReflErrorCategory};
    use crate::session::Session;

    #[test]
    fn silicon_density_gives_the_reference_sld() {
        let mut session = Session::new();
        let silicon = session.create_default_material_density().unwrap();
        let material = session.material(&silicon).unwrap();
        assert_eq!(material.entity_kind(), EntityKind::MaterialDensity);
        let sld = session.value(material.sld()).unwrap();
        assert!((sld - 2.073).abs() < 1.0e-2, "silicon sld was {}", sld);
        assert_eq!(session.value(material.isld()).unwrap(), 0.0);
    }

    #[test]
    fn density_changes_scale_the_sld() {
        let mut session = Session::new();
        let silicon = session.create_material_density("Si", 2.33, None).unwrap();
        let before = session.complex_sld(&silicon).unwrap().re;
        session.set_density(&silicon, 4.66).unwrap();
        let after = session.complex_sld(&silicon).unwrap().re;
        assert!((after - 2.0 * before).abs() < 1.0e-9);
        assert!(session.set_density(&silicon, -1.0).is_err());
    }

    #[test]
    fn changing_the_formula_rebuilds_the_derived_sld() {
        let mut session = Session::new();
        let material = session.create_material_density("H2O", 1.0, None).unwrap();
        let water = session.complex_sld(&material).unwrap().re;
        assert!(water < 0.0);

        session.set_chemical_structure(&material, "D2O").unwrap();
        let heavy = session.complex_sld(&material).unwrap().re;
        assert!(heavy > 5.0, "heavy water sld was {}", heavy);
        assert_eq!(
            session.density_material(&material).unwrap().chemical_structure(),
            "D2O"
        );
    }

    #[test]
    fn absorbing_formulas_carry_an_imaginary_sld() {
        let mut session = Session::new();
        let boron = session.create_material_density("B4C", 2.52, None).unwrap();
        assert!(session.complex_sld(&boron).unwrap().im < 0.0);
    }

    #[test]
    fn unparsable_formulas_are_lookup_errors_and_leave_state_alone() {
        let mut session = Session::new();
        let error = session
            .create_material_density("Qq2", 1.0, None)
            .unwrap_err();
        assert_eq!(error.category(), ReflErrorCategory::Lookup);
        assert!(session.registry().is_empty());

        let silicon = session.create_default_material_density().unwrap();
        let before = session.complex_sld(&silicon).unwrap();
        assert!(session.set_chemical_structure(&silicon, "si(").is_err());
        assert_eq!(session.complex_sld(&silicon).unwrap(), before);
        assert_eq!(session.density_material(&silicon).unwrap().chemical_structure(), "Si");
    }
}
