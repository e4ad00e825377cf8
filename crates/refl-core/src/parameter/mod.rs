mod store;

pub use store::{Constraint, ConstraintFn, ConstraintId, ParameterStore, Relation};
pub(crate) use store::check_bounds;

use crate::common::constants::DIMENSIONLESS;
use crate::domain::ParameterId;

/// A named, unit-bearing scalar with bounds and fit metadata.
///
/// `free` is the complement of `fixed`. A parameter is fit-able only when it
/// is free, enabled and not the output of a constraint; see
/// [`ParameterStore::is_fittable`].
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub(crate) id: ParameterId,
    pub(crate) name: String,
    pub(crate) value: f64,
    pub(crate) unit: String,
    pub(crate) min: f64,
    pub(crate) max: f64,
    pub(crate) fixed: bool,
    pub(crate) enabled: bool,
    pub(crate) description: String,
    pub(crate) url: String,
    pub(crate) enforce_bounds: bool,
    pub(crate) whole_number: bool,
}

impl Parameter {
    pub(crate) fn from_spec(id: ParameterId, spec: ParameterSpec) -> Self {
        Self {
            id,
            name: spec.name,
            value: spec.value,
            unit: spec.unit,
            min: spec.min,
            max: spec.max,
            fixed: spec.fixed,
            enabled: spec.enabled,
            description: spec.description,
            url: spec.url,
            enforce_bounds: spec.enforce_bounds,
            whole_number: spec.whole_number,
        }
    }

    pub fn id(&self) -> &ParameterId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn fixed(&self) -> bool {
        self.fixed
    }

    pub fn free(&self) -> bool {
        !self.fixed
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn enforces_bounds(&self) -> bool {
        self.enforce_bounds
    }

    pub fn whole_number(&self) -> bool {
        self.whole_number
    }

    pub fn in_bounds(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Field-by-field snapshot without the identifier.
    pub fn spec(&self) -> ParameterSpec {
        ParameterSpec {
            name: self.name.clone(),
            value: self.value,
            unit: self.unit.clone(),
            min: self.min,
            max: self.max,
            fixed: self.fixed,
            enabled: self.enabled,
            description: self.description.clone(),
            url: self.url.clone(),
            enforce_bounds: self.enforce_bounds,
            whole_number: self.whole_number,
        }
    }
}

/// Construction recipe for a [`Parameter`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub min: f64,
    pub max: f64,
    pub fixed: bool,
    pub enabled: bool,
    pub description: String,
    pub url: String,
    pub enforce_bounds: bool,
    /// Only integral values are accepted; counts such as repetitions.
    pub whole_number: bool,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            unit: DIMENSIONLESS.to_string(),
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
            fixed: false,
            enabled: true,
            description: String::new(),
            url: String::new(),
            enforce_bounds: false,
            whole_number: false,
        }
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn bounds(mut self, min: f64, max: f64) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn fixed(mut self, fixed: bool) -> Self {
        self.fixed = fixed;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn enforce_bounds(mut self) -> Self {
        self.enforce_bounds = true;
        self
    }

    pub fn whole_number(mut self) -> Self {
        self.whole_number = true;
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{Parameter, ParameterSpec};
    use crate::domain::ParameterId;

    #[test]
    fn spec_defaults_are_unbounded_free_and_enabled() {
        let spec = ParameterSpec::new("thickness", 10.0);
        assert_eq!(spec.min, f64::NEG_INFINITY);
        assert_eq!(spec.max, f64::INFINITY);
        assert!(!spec.fixed);
        assert!(spec.enabled);
        assert!(!spec.enforce_bounds);
    }

    #[test]
    fn free_is_the_complement_of_fixed() {
        let parameter = Parameter::from_spec(
            ParameterId::new("Parameter_0"),
            ParameterSpec::new("scale", 1.0).fixed(true),
        );
        assert!(parameter.fixed());
        assert!(!parameter.free());
    }

    #[test]
    fn spec_snapshot_round_trips_fields() {
        let spec = ParameterSpec::new("fraction", 0.3)
            .unit("dimensionless")
            .bounds(0.0, 1.0)
            .description("volume fraction")
            .url("https://example.org/fraction")
            .enforce_bounds();
        let parameter = Parameter::from_spec(ParameterId::new("Parameter_1"), spec.clone());
        assert_eq!(parameter.spec(), spec);
        assert!(parameter.in_bounds(1.0));
        assert!(!parameter.in_bounds(1.0001));
    }
}
