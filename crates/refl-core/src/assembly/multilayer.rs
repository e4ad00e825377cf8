use super::{AssemblyKind, AssemblyParts, DEFAULT_LAYER_COLLECTION_NAME};
use crate::collection::initial_items;
use crate::common::constants::DIMENSIONLESS;
use crate::domain::{AssemblyId, EntityKind, LayerId, ReflError, ReflResult};
use crate::parameter::ParameterSpec;
use crate::session::Session;

pub const DEFAULT_MULTILAYER_NAME: &str = "EasyMultilayer";
pub const DEFAULT_REPEATING_NAME: &str = "EasyRepeatingMultilayer";
pub const DEFAULT_REPETITIONS: f64 = 1.0;
pub const MAX_REPETITIONS: f64 = 9999.0;

pub(crate) fn repetitions_spec(value: f64) -> ParameterSpec {
    ParameterSpec::new("repetitions", value)
        .unit(DIMENSIONLESS)
        .bounds(1.0, MAX_REPETITIONS)
        .fixed(true)
        .enforce_bounds()
        .whole_number()
}

/// Repetition counts are whole numbers in `[1, 9999]`.
pub(crate) fn check_repetitions(value: f64) -> ReflResult<()> {
    if value.is_finite() && value.fract() == 0.0 && (1.0..=MAX_REPETITIONS).contains(&value) {
        Ok(())
    } else {
        Err(ReflError::validation(
            "VALIDATION.REPETITIONS",
            format!("repetitions must be a whole number in [1, 9999], got {}", value),
        ))
    }
}

impl Session {
    pub fn create_multilayer(&mut self, name: &str, layers: &[LayerId]) -> ReflResult<AssemblyId> {
        self.build_multilayer(name, layers, false)
    }

    /// Multilayer seeded with two default layers.
    pub fn create_default_multilayer(&mut self) -> ReflResult<AssemblyId> {
        self.build_multilayer(DEFAULT_MULTILAYER_NAME, &[], true)
    }

    pub(crate) fn build_multilayer(
        &mut self,
        name: &str,
        layers: &[LayerId],
        populate_if_none: bool,
    ) -> ReflResult<AssemblyId> {
        for layer in layers {
            self.layer(layer)?;
        }
        let layers = self.initial_layers(layers, populate_if_none)?;
        let id = self.mint(EntityKind::Multilayer);
        let layers_id = self.mint(EntityKind::LayerCollection);
        Ok(self.assemble_assembly(AssemblyParts {
            id,
            name: name.to_string(),
            layers_id,
            layers_name: DEFAULT_LAYER_COLLECTION_NAME.to_string(),
            populate_if_none,
            layers,
            kind: AssemblyKind::Multilayer,
        }))
    }

    pub fn create_repeating_multilayer(
        &mut self,
        name: &str,
        layers: &[LayerId],
        repetitions: f64,
    ) -> ReflResult<AssemblyId> {
        self.build_repeating_multilayer(name, layers, repetitions, false)
    }

    pub fn create_default_repeating_multilayer(&mut self) -> ReflResult<AssemblyId> {
        self.build_repeating_multilayer(DEFAULT_REPEATING_NAME, &[], DEFAULT_REPETITIONS, true)
    }

    pub(crate) fn build_repeating_multilayer(
        &mut self,
        name: &str,
        layers: &[LayerId],
        repetitions: f64,
        populate_if_none: bool,
    ) -> ReflResult<AssemblyId> {
        check_repetitions(repetitions)?;
        for layer in layers {
            self.layer(layer)?;
        }
        let layers = self.initial_layers(layers, populate_if_none)?;
        let id = self.mint(EntityKind::RepeatingMultilayer);
        let layers_id = self.mint(EntityKind::LayerCollection);
        let repetitions = self.add_parameter(&id, repetitions_spec(repetitions))?;
        Ok(self.assemble_assembly(AssemblyParts {
            id,
            name: name.to_string(),
            layers_id,
            layers_name: DEFAULT_LAYER_COLLECTION_NAME.to_string(),
            populate_if_none,
            layers,
            kind: AssemblyKind::RepeatingMultilayer { repetitions },
        }))
    }

    fn initial_layers(&mut self, layers: &[LayerId], populate_if_none: bool) -> ReflResult<Vec<LayerId>> {
        initial_items(layers, populate_if_none, || {
            Ok(vec![self.create_default_layer()?, self.create_default_layer()?])
        })
    }

    pub fn set_repetitions(&mut self, id: &AssemblyId, repetitions: f64) -> ReflResult<()> {
        check_repetitions(repetitions)?;
        let parameter = self
            .assembly(id)?
            .repetitions()
            .cloned()
            .ok_or_else(|| {
                ReflError::validation(
                    "VALIDATION.NOT_REPEATING",
                    format!("assembly '{}' does not repeat", id),
                )
            })?;
        self.set_parameter_value(&parameter, repetitions)
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::ReflErrorCategory;
    use crate::session::Session;

    #[test]
    fn repetitions_are_fixed_and_enforced() {
        let mut session = Session::new();
        let id = session.create_default_repeating_multilayer().unwrap();
        let parameter = session.assembly(&id).unwrap().repetitions().unwrap().clone();
        assert_eq!(session.value(&parameter).unwrap(), 1.0);
        assert!(session.parameter(&parameter).unwrap().fixed());

        session.set_repetitions(&id, 10.0).unwrap();
        assert_eq!(session.value(&parameter).unwrap(), 10.0);
        for bad in [0.0, 10_000.0, 2.5, f64::NAN] {
            let error = session.set_repetitions(&id, bad).unwrap_err();
            assert_eq!(error.category(), ReflErrorCategory::Validation);
        }
        let error = session.set_parameter_value(&parameter, 0.0).unwrap_err();
        assert_eq!(error.code(), "VALIDATION.OUT_OF_BOUNDS");
        let error = session.set_parameter_value(&parameter, 2.5).unwrap_err();
        assert_eq!(error.code(), "VALIDATION.WHOLE_NUMBER");
        assert_eq!(session.value(&parameter).unwrap(), 10.0);
        session.set_parameter_value(&parameter, 3.0).unwrap();
        assert_eq!(session.value(&parameter).unwrap(), 3.0);
    }

    #[test]
    fn only_empty_flagged_stacks_are_seeded() {
        let mut session = Session::new();
        let default = session.create_default_multilayer().unwrap();
        let layers = &session.assembly(&default).unwrap().layers;
        assert!(layers.populate_if_none());
        assert_eq!(layers.len(), 2);

        let empty = session.create_multilayer("empty", &[]).unwrap();
        assert!(session.assembly(&empty).unwrap().layers.is_empty());

        let layer = session.create_default_layer().unwrap();
        let given = session
            .build_repeating_multilayer("given", &[layer.clone()], 4.0, true)
            .unwrap();
        assert_eq!(session.assembly(&given).unwrap().layers.items(), &[layer]);
        assert!(session.assembly(&given).unwrap().layers.populate_if_none());
    }

    #[test]
    fn plain_multilayers_have_no_repetitions() {
        let mut session = Session::new();
        let id = session.create_default_multilayer().unwrap();
        assert!(session.assembly(&id).unwrap().repetitions().is_none());
        assert_eq!(
            session.set_repetitions(&id, 2.0).unwrap_err().code(),
            "VALIDATION.NOT_REPEATING"
        );
    }

    #[test]
    fn unknown_layers_are_rejected_before_registration() {
        let mut session = Session::new();
        let stray = session.create_default_layer().unwrap();
        assert!(session.release_layer(&stray));
        let count = session.registry().len();
        assert!(session.create_multilayer("stack", &[stray]).is_err());
        assert_eq!(session.registry().len(), count);
    }
}
