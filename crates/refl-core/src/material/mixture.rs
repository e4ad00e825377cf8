use super::{Material, MaterialKind, check_finite, isld_spec, sld_spec};
use crate::common::constants::DIMENSIONLESS;
use crate::domain::{EntityKind, MaterialId, ParameterId, ReflError, ReflResult};
use crate::parameter::{ParameterSpec, Relation};
use crate::session::{ParamSource, Session};
use tracing::debug;

pub const DEFAULT_MIXTURE_FRACTION: f64 = 0.5;
pub const DEFAULT_SOLVENT_FRACTION: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixtureRole {
    /// `material_a` blended into `material_b` by `fraction`.
    Mixture,
    /// `material_a` is the molecule, `material_b` the solvent and the
    /// fraction is the solvent fraction.
    Solvated,
}

impl MixtureRole {
    pub const fn entity_kind(self) -> EntityKind {
        match self {
            Self::Mixture => EntityKind::MaterialMixture,
            Self::Solvated => EntityKind::MaterialSolvated,
        }
    }

    pub(crate) const fn fraction_name(self) -> &'static str {
        match self {
            Self::Mixture => "fraction",
            Self::Solvated => "solvent_fraction",
        }
    }
}

/// Linear blend `x = x_a * (1 - f) + x_b * f` of two shared constituents.
#[derive(Debug, Clone, PartialEq)]
pub struct Mixture {
    pub(crate) material_a: MaterialId,
    pub(crate) material_b: MaterialId,
    pub(crate) fraction: ParameterId,
    pub(crate) role: MixtureRole,
    pub(crate) auto_name: bool,
}

impl Mixture {
    pub fn material_a(&self) -> &MaterialId {
        &self.material_a
    }

    pub fn material_b(&self) -> &MaterialId {
        &self.material_b
    }

    pub fn fraction(&self) -> &ParameterId {
        &self.fraction
    }

    pub fn role(&self) -> MixtureRole {
        self.role
    }

    /// Whether the display name is generated from the constituents.
    pub fn auto_name(&self) -> bool {
        self.auto_name
    }
}

pub(crate) fn mixture_name(material_a: &str, material_b: &str) -> String {
    format!("{} in {}", material_a, material_b)
}

pub(crate) fn fraction_spec(role: MixtureRole, value: f64) -> ParameterSpec {
    ParameterSpec::new(role.fraction_name(), value)
        .unit(DIMENSIONLESS)
        .bounds(0.0, 1.0)
        .enforce_bounds()
}

pub(crate) fn check_fraction(value: f64) -> ReflResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ReflError::validation(
            "VALIDATION.FRACTION",
            format!("fraction must lie within [0, 1], got {}", value),
        ))
    }
}

pub(crate) struct MixtureParts<'a> {
    pub id: String,
    pub name: Option<String>,
    pub material_a: MaterialId,
    pub material_b: MaterialId,
    pub role: MixtureRole,
    pub fraction: ParamSource<'a>,
    pub sld: ParamSource<'a>,
    pub isld: ParamSource<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    A,
    B,
}

impl Session {
    pub fn create_mixture(
        &mut self,
        material_a: &MaterialId,
        material_b: &MaterialId,
        fraction: f64,
        name: Option<&str>,
    ) -> ReflResult<MaterialId> {
        self.create_blend(MixtureRole::Mixture, material_a, material_b, fraction, name)
    }

    pub fn create_solvated_material(
        &mut self,
        material: &MaterialId,
        solvent: &MaterialId,
        solvent_fraction: f64,
        name: Option<&str>,
    ) -> ReflResult<MaterialId> {
        self.create_blend(MixtureRole::Solvated, material, solvent, solvent_fraction, name)
    }

    /// Two default materials at the default fraction.
    pub fn create_default_mixture(&mut self) -> ReflResult<MaterialId> {
        let material_a = self.create_default_material()?;
        let material_b = self.create_default_material()?;
        self.create_mixture(&material_a, &material_b, DEFAULT_MIXTURE_FRACTION, None)
    }

    fn create_blend(
        &mut self,
        role: MixtureRole,
        material_a: &MaterialId,
        material_b: &MaterialId,
        fraction: f64,
        name: Option<&str>,
    ) -> ReflResult<MaterialId> {
        check_fraction(fraction)?;
        let a = self.complex_sld(material_a)?;
        let b = self.complex_sld(material_b)?;
        let blended = a * (1.0 - fraction) + b * fraction;

        let id = self.mint(role.entity_kind());
        self.assemble_mixture(MixtureParts {
            id,
            name: name.map(str::to_string),
            material_a: material_a.clone(),
            material_b: material_b.clone(),
            role,
            fraction: ParamSource::Fresh(fraction_spec(role, fraction)),
            sld: ParamSource::Fresh(sld_spec(blended.re)),
            isld: ParamSource::Fresh(isld_spec(blended.im)),
        })
    }

    pub(crate) fn assemble_mixture(&mut self, parts: MixtureParts<'_>) -> ReflResult<MaterialId> {
        let generated = mixture_name(
            &self.material(&parts.material_a)?.name,
            &self.material(&parts.material_b)?.name,
        );
        let auto_name = parts.name.as_deref().is_none_or(|name| name == generated);
        let name = parts.name.unwrap_or(generated);

        let fraction = self.parameter_from(&parts.id, parts.fraction)?;
        let sld = self.parameter_from(&parts.id, parts.sld)?;
        let isld = self.parameter_from(&parts.id, parts.isld)?;
        self.registry.link(&parts.id, parts.material_a.as_str());
        self.registry.link(&parts.id, parts.material_b.as_str());

        let id = MaterialId::new(parts.id);
        self.materials.insert(
            id.clone(),
            Material {
                id: id.clone(),
                name,
                sld,
                isld,
                kind: MaterialKind::Mixture(Mixture {
                    material_a: parts.material_a,
                    material_b: parts.material_b,
                    fraction,
                    role: parts.role,
                    auto_name,
                }),
            },
        );
        self.bind_blend(&id)?;
        debug!(material = %id, role = ?parts.role, "mixture created");
        Ok(id)
    }

    pub fn mixture(&self, id: &MaterialId) -> ReflResult<&Mixture> {
        self.material(id)?.as_mixture().ok_or_else(|| {
            ReflError::validation(
                "VALIDATION.NOT_A_MIXTURE",
                format!("material '{}' is not a mixture", id),
            )
        })
    }

    pub fn set_mixture_fraction(&mut self, id: &MaterialId, fraction: f64) -> ReflResult<()> {
        check_finite("fraction", fraction)?;
        check_fraction(fraction)?;
        let parameter = self.mixture(id)?.fraction.clone();
        self.set_parameter_value(&parameter, fraction)
    }

    pub fn set_mixture_material_a(&mut self, id: &MaterialId, material: &MaterialId) -> ReflResult<()> {
        self.replace_constituent(id, material, Slot::A)
    }

    pub fn set_mixture_material_b(&mut self, id: &MaterialId, material: &MaterialId) -> ReflResult<()> {
        self.replace_constituent(id, material, Slot::B)
    }

    fn replace_constituent(&mut self, id: &MaterialId, material: &MaterialId, slot: Slot) -> ReflResult<()> {
        let mixture = self.mixture(id)?.clone();
        self.material(material)?;
        if material == id || !self.registry.find_path(material.as_str(), id.as_str()).is_empty() {
            return Err(ReflError::validation(
                "VALIDATION.MATERIAL_CYCLE",
                format!("material '{}' already contains mixture '{}'", material, id),
            ));
        }

        let (sld, isld) = {
            let current = self.material(id)?;
            (current.sld.clone(), current.isld.clone())
        };
        self.parameters.unbind(&sld);
        self.parameters.unbind(&isld);

        let previous = match slot {
            Slot::A => &mixture.material_a,
            Slot::B => &mixture.material_b,
        };
        self.registry.unlink(id.as_str(), previous.as_str());
        self.registry.link(id.as_str(), material.as_str());
        if let MaterialKind::Mixture(stored) = &mut self.material_mut(id)?.kind {
            match slot {
                Slot::A => stored.material_a = material.clone(),
                Slot::B => stored.material_b = material.clone(),
            }
        }
        self.bind_blend(id)?;
        self.refresh_mixture_name(id);
        debug!(mixture = %id, previous = %previous, replacement = %material, "mixture constituent replaced");
        self.flush();
        Ok(())
    }

    fn bind_blend(&mut self, id: &MaterialId) -> ReflResult<()> {
        let material = self.material(id)?;
        let mixture = self.mixture(id)?;
        let a = self.material(&mixture.material_a)?;
        let b = self.material(&mixture.material_b)?;
        let sld_inputs = [a.sld.clone(), b.sld.clone(), mixture.fraction.clone()];
        let isld_inputs = [a.isld.clone(), b.isld.clone(), mixture.fraction.clone()];
        let (sld, isld) = (material.sld.clone(), material.isld.clone());
        self.parameters
            .bind_constraint(&sld, &sld_inputs, Relation::LinearBlend)?;
        self.parameters
            .bind_constraint(&isld, &isld_inputs, Relation::LinearBlend)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MixtureRole;
    use crate::domain::{EntityKind, ReflErrorCategory};
    use crate::session::Session;

    fn close(left: f64, right: f64) -> bool {
        (left - right).abs() < 1.0e-12
    }

    #[test]
    fn mixture_sld_is_the_linear_blend() {
        let mut session = Session::new();
        let a = session.create_material("a", 1.0, 0.0).unwrap();
        let b = session.create_material("b", 2.0, 0.0).unwrap();
        let mixture = session.create_mixture(&a, &b, 0.1, None).unwrap();
        let material = session.material(&mixture).unwrap();
        assert!(close(session.value(material.sld()).unwrap(), 1.1));
        assert_eq!(material.name(), "a in b");
        assert_eq!(material.entity_kind(), EntityKind::MaterialMixture);
    }

    #[test]
    fn constituent_writes_propagate_and_outputs_are_read_only() {
        let mut session = Session::new();
        let a = session.create_material("a", 1.0, 0.5).unwrap();
        let b = session.create_material("b", 3.0, 0.0).unwrap();
        let mixture = session.create_mixture(&a, &b, 0.5, None).unwrap();
        session.set_material_sld(&b, 5.0).unwrap();
        session.set_material_isld(&a, 1.0).unwrap();
        assert!(close(session.complex_sld(&mixture).unwrap().re, 3.0));
        assert!(close(session.complex_sld(&mixture).unwrap().im, 0.5));

        let error = session.set_material_sld(&mixture, 0.0).unwrap_err();
        assert_eq!(error.category(), ReflErrorCategory::Immutability);
    }

    #[test]
    fn fraction_bounds_include_the_end_points() {
        let mut session = Session::new();
        let mixture = session.create_default_mixture().unwrap();
        assert!(session.set_mixture_fraction(&mixture, 0.0).is_ok());
        assert!(session.set_mixture_fraction(&mixture, 1.0).is_ok());
        for bad in [-0.01, 1.01] {
            let error = session.set_mixture_fraction(&mixture, bad).unwrap_err();
            assert_eq!(error.category(), ReflErrorCategory::Validation);
        }
        let fraction = session.mixture(&mixture).unwrap().fraction().clone();
        assert_eq!(session.value(&fraction).unwrap(), 1.0);

        let a = session.create_default_material().unwrap();
        let b = session.create_default_material().unwrap();
        assert!(session.create_mixture(&a, &b, 1.5, None).is_err());
    }

    #[test]
    fn replacing_a_constituent_rebinds_and_renames() {
        let mut session = Session::new();
        let si = session.create_material("Si", 2.07, 0.0).unwrap();
        let d2o = session.create_material("D2O", 6.36, 0.0).unwrap();
        let h2o = session.create_material("H2O", -0.56, 0.0).unwrap();
        let mixture = session.create_mixture(&si, &d2o, 0.5, None).unwrap();

        session.set_mixture_material_b(&mixture, &h2o).unwrap();
        assert_eq!(session.material(&mixture).unwrap().name(), "Si in H2O");
        assert!(close(
            session.complex_sld(&mixture).unwrap().re,
            (2.07 - 0.56) / 2.0
        ));

        session.set_material_sld(&d2o, 0.0).unwrap();
        assert!(close(
            session.complex_sld(&mixture).unwrap().re,
            (2.07 - 0.56) / 2.0
        ));
        assert!(session.registry().children_of(mixture.as_str()).iter().all(|child| child != d2o.as_str()));

        session.rename_material(&si, "Silicon").unwrap();
        assert_eq!(session.material(&mixture).unwrap().name(), "Silicon in H2O");
    }

    #[test]
    fn explicit_names_are_not_regenerated() {
        let mut session = Session::new();
        let a = session.create_material("a", 1.0, 0.0).unwrap();
        let b = session.create_material("b", 2.0, 0.0).unwrap();
        let mixture = session.create_mixture(&a, &b, 0.5, Some("blend")).unwrap();
        session.rename_material(&a, "alpha").unwrap();
        assert_eq!(session.material(&mixture).unwrap().name(), "blend");
    }

    #[test]
    fn a_mixture_cannot_contain_itself() {
        let mut session = Session::new();
        let inner = session.create_default_mixture().unwrap();
        let other = session.create_default_material().unwrap();
        let outer = session.create_mixture(&inner, &other, 0.5, None).unwrap();
        let error = session.set_mixture_material_a(&inner, &outer).unwrap_err();
        assert_eq!(error.code(), "VALIDATION.MATERIAL_CYCLE");
        let error = session.set_mixture_material_b(&outer, &outer).unwrap_err();
        assert_eq!(error.code(), "VALIDATION.MATERIAL_CYCLE");
    }

    #[test]
    fn solvated_materials_use_the_solvent_fraction() {
        let mut session = Session::new();
        let lipid = session.create_material("lipid", 1.0, 0.0).unwrap();
        let d2o = session.create_material("D2O", 6.36, 0.0).unwrap();
        let solvated = session
            .create_solvated_material(&lipid, &d2o, 0.2, None)
            .unwrap();
        let mixture = session.mixture(&solvated).unwrap();
        assert_eq!(mixture.role(), MixtureRole::Solvated);
        assert_eq!(session.parameter(mixture.fraction()).unwrap().name(), "solvent_fraction");
        assert!(close(session.complex_sld(&solvated).unwrap().re, 0.8 + 6.36 * 0.2));
    }
}
