//! Narrow contract towards external physics calculators.
//!
//! The core never computes reflectivity itself. It describes the structure to
//! a [`Calculator`] through create/update/assign calls keyed by entity
//! identifiers, translating parameter roles into backend field names through
//! a static [`FieldTable`].

mod binding;

pub use binding::{BindingTarget, BoundEntity, CalculatorBinding};

use crate::domain::{ReflError, ReflResult};
use crate::model::ResolutionFunction;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};

/// Parameter role understood by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BindingKey {
    Sld,
    Isld,
    Thickness,
    Roughness,
    Repetitions,
    Scale,
    Background,
}

impl BindingKey {
    pub const ALL: [BindingKey; 7] = [
        Self::Sld,
        Self::Isld,
        Self::Thickness,
        Self::Roughness,
        Self::Repetitions,
        Self::Scale,
        Self::Background,
    ];
}

/// Static role-to-field translation for one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldTable {
    pub backend: &'static str,
    pub sld: &'static str,
    pub isld: &'static str,
    pub thickness: &'static str,
    pub roughness: &'static str,
    pub repetitions: &'static str,
    pub scale: &'static str,
    pub background: &'static str,
}

impl FieldTable {
    pub const fn field(&self, key: BindingKey) -> &'static str {
        match key {
            BindingKey::Sld => self.sld,
            BindingKey::Isld => self.isld,
            BindingKey::Thickness => self.thickness,
            BindingKey::Roughness => self.roughness,
            BindingKey::Repetitions => self.repetitions,
            BindingKey::Scale => self.scale,
            BindingKey::Background => self.background,
        }
    }
}

pub const REFNX_FIELDS: FieldTable = FieldTable {
    backend: "refnx",
    sld: "real",
    isld: "imag",
    thickness: "thick",
    roughness: "rough",
    repetitions: "repeats",
    scale: "scale",
    background: "bkg",
};

pub const REFL1D_FIELDS: FieldTable = FieldTable {
    backend: "refl1d",
    sld: "rho",
    isld: "irho",
    thickness: "thickness",
    roughness: "interface",
    repetitions: "repeat",
    scale: "scale",
    background: "bkg",
};

pub type FieldValues<'a> = &'a [(&'static str, f64)];

/// Backend adapter. Notification methods are infallible; only the compute
/// entry points and value reads report errors.
pub trait Calculator: Debug {
    fn name(&self) -> &str;

    fn field_table(&self) -> &'static FieldTable;

    fn create_material(&mut self, id: &str);
    fn update_material(&mut self, id: &str, values: FieldValues<'_>);
    fn get_material_value(&self, id: &str, field: &str) -> ReflResult<f64>;

    fn create_layer(&mut self, id: &str);
    fn update_layer(&mut self, id: &str, values: FieldValues<'_>);
    fn assign_material_to_layer(&mut self, material_id: &str, layer_id: &str);

    fn create_item(&mut self, id: &str);
    fn add_layer_to_item(&mut self, layer_id: &str, item_id: &str);
    fn remove_layer_from_item(&mut self, layer_id: &str, item_id: &str);
    fn update_item(&mut self, id: &str, values: FieldValues<'_>);

    fn create_model(&mut self, id: &str);
    fn add_item_to_model(&mut self, item_id: &str, model_id: &str);
    fn remove_item_from_model(&mut self, item_id: &str, model_id: &str);
    fn update_model(&mut self, id: &str, values: FieldValues<'_>);

    fn set_resolution_function(&mut self, resolution: &ResolutionFunction);

    fn fit_func(&mut self, q: &[f64], model_id: &str) -> ReflResult<Vec<f64>>;
    fn sld_profile(&mut self, model_id: &str) -> ReflResult<(Vec<f64>, Vec<f64>)>;
}

pub type CalculatorConstructor = Box<dyn Fn() -> Box<dyn Calculator> + Send + Sync>;

/// Name-to-constructor lookup used when a model switches interface.
#[derive(Default)]
pub struct CalculatorFactory {
    constructors: BTreeMap<String, CalculatorConstructor>,
}

impl CalculatorFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        constructor: impl Fn() -> Box<dyn Calculator> + Send + Sync + 'static,
    ) {
        self.constructors.insert(name.into(), Box::new(constructor));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    pub fn create(&self, name: &str) -> ReflResult<Box<dyn Calculator>> {
        let constructor = self.constructors.get(name).ok_or_else(|| unknown_calculator(name))?;
        Ok(constructor())
    }

    pub(crate) fn ensure_known(&self, name: &str) -> ReflResult<()> {
        if self.contains(name) {
            Ok(())
        } else {
            Err(unknown_calculator(name))
        }
    }
}

impl Debug for CalculatorFactory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalculatorFactory")
            .field("names", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn unknown_calculator(name: &str) -> ReflError {
    ReflError::lookup(
        "LOOKUP.CALCULATOR",
        format!("no calculator named '{}' is available", name),
    )
}

#[cfg(test)]
mod tests {
    use super::{BindingKey, CalculatorFactory, REFL1D_FIELDS, REFNX_FIELDS};
    use crate::domain::ReflErrorCategory;

    #[test]
    fn field_tables_translate_every_key() {
        let refnx: Vec<&str> = BindingKey::ALL.iter().map(|key| REFNX_FIELDS.field(*key)).collect();
        assert_eq!(refnx, ["real", "imag", "thick", "rough", "repeats", "scale", "bkg"]);

        let refl1d: Vec<&str> = BindingKey::ALL
            .iter()
            .map(|key| REFL1D_FIELDS.field(*key))
            .collect();
        assert_eq!(
            refl1d,
            ["rho", "irho", "thickness", "interface", "repeat", "scale", "bkg"]
        );
    }

    #[test]
    fn unknown_calculator_names_are_lookup_errors() {
        let factory = CalculatorFactory::new();
        let error = factory.create("refnx").expect_err("nothing registered");
        assert_eq!(error.category(), ReflErrorCategory::Lookup);
        assert_eq!(error.code(), "LOOKUP.CALCULATOR");
        assert_eq!(factory.names().count(), 0);
    }
}
