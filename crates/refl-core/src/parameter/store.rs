use super::{Parameter, ParameterSpec};
use crate::common::config::BoundsPolicy;
use crate::common::constants::{MOLECULE_SLD_SCALE, SLD_DENSITY_FACTOR};
use crate::domain::{ParameterId, ReflError, ReflResult};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tracing::trace;

pub type ConstraintFn = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// Pure recomputation rule attached to a constraint edge.
#[derive(Clone)]
pub enum Relation {
    /// `out = in[0]`
    Identity,
    /// `out = factor * in[0]`
    Scaled(f64),
    /// `out = in[0] * (1 - in[2]) + in[1] * in[2]`
    LinearBlend,
    /// `out = 0.602214076e6 * in[2] * in[0] / in[1]` (b, M, density)
    DensitySld,
    /// `out = in[0] / (in[1] * in[2]) * 1e6` (b, thickness, area per molecule)
    MoleculeSld,
    Custom {
        label: String,
        function: ConstraintFn,
    },
}

impl Relation {
    pub fn custom(
        label: impl Into<String>,
        function: impl Fn(&[f64]) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self::Custom {
            label: label.into(),
            function: Arc::new(function),
        }
    }

    pub fn arity(&self) -> Option<usize> {
        match self {
            Self::Identity | Self::Scaled(_) => Some(1),
            Self::LinearBlend | Self::DensitySld | Self::MoleculeSld => Some(3),
            Self::Custom { .. } => None,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Identity => "identity",
            Self::Scaled(_) => "scaled",
            Self::LinearBlend => "linear_blend",
            Self::DensitySld => "density_sld",
            Self::MoleculeSld => "molecule_sld",
            Self::Custom { label, .. } => label,
        }
    }

    pub fn evaluate(&self, inputs: &[f64]) -> f64 {
        match self {
            Self::Identity => inputs[0],
            Self::Scaled(factor) => factor * inputs[0],
            Self::LinearBlend => inputs[0] * (1.0 - inputs[2]) + inputs[1] * inputs[2],
            Self::DensitySld => {
                if inputs[1] == 0.0 {
                    0.0
                } else {
                    SLD_DENSITY_FACTOR * inputs[2] * inputs[0] / inputs[1]
                }
            }
            Self::MoleculeSld => {
                let volume = inputs[1] * inputs[2];
                if volume == 0.0 {
                    0.0
                } else {
                    inputs[0] / volume * MOLECULE_SLD_SCALE
                }
            }
            Self::Custom { function, .. } => function(inputs),
        }
    }
}

impl Debug for Relation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scaled(factor) => write!(f, "Scaled({})", factor),
            other => f.write_str(other.label()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId(u64);

/// Directed edge set `inputs -> output`.
#[derive(Debug, Clone)]
pub struct Constraint {
    id: ConstraintId,
    output: ParameterId,
    inputs: Vec<ParameterId>,
    relation: Relation,
}

impl Constraint {
    pub fn id(&self) -> ConstraintId {
        self.id
    }

    pub fn output(&self) -> &ParameterId {
        &self.output
    }

    pub fn inputs(&self) -> &[ParameterId] {
        &self.inputs
    }

    pub fn relation(&self) -> &Relation {
        &self.relation
    }
}

/// Parameter arena plus the functional-constraint dependency graph.
///
/// Propagation is eager and depth first: a write returns only after every
/// transitively dependent output has been recomputed. Cycles are rejected at
/// bind time.
#[derive(Debug, Clone, Default)]
pub struct ParameterStore {
    parameters: BTreeMap<ParameterId, Parameter>,
    constraints: BTreeMap<ConstraintId, Constraint>,
    dependents: BTreeMap<ParameterId, BTreeSet<ConstraintId>>,
    bound_outputs: BTreeMap<ParameterId, ConstraintId>,
    next_constraint: u64,
    policy: BoundsPolicy,
    journal: Vec<ParameterId>,
}

impl ParameterStore {
    pub fn new(policy: BoundsPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> BoundsPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn contains(&self, id: &ParameterId) -> bool {
        self.parameters.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.values()
    }

    pub fn get(&self, id: &ParameterId) -> ReflResult<&Parameter> {
        self.parameters.get(id).ok_or_else(|| unknown_parameter(id))
    }

    pub fn value(&self, id: &ParameterId) -> ReflResult<f64> {
        self.get(id).map(Parameter::value)
    }

    pub(crate) fn insert(&mut self, id: ParameterId, spec: ParameterSpec) -> ReflResult<()> {
        check_bounds(&spec.name, spec.min, spec.max)?;
        if self.parameters.contains_key(&id) {
            return Err(ReflError::internal(
                "SYS.PARAMETER_COLLISION",
                format!("parameter '{}' is already stored", id),
            ));
        }
        self.parameters
            .insert(id.clone(), Parameter::from_spec(id, spec));
        Ok(())
    }

    /// External write. Fails for constrained or disabled parameters and for
    /// values the bounds policy rejects.
    pub fn set_value(&mut self, id: &ParameterId, value: f64) -> ReflResult<()> {
        let parameter = self.get(id)?;
        if self.bound_outputs.contains_key(id) {
            return Err(ReflError::immutability(
                "IMMUTABLE.CONSTRAINED",
                format!(
                    "parameter '{}' ({}) is the output of a constraint and cannot be set directly",
                    parameter.name, id
                ),
            ));
        }
        if !parameter.enabled {
            return Err(ReflError::immutability(
                "IMMUTABLE.DISABLED",
                format!("parameter '{}' ({}) is disabled", parameter.name, id),
            ));
        }
        self.check_value(parameter, value)?;
        self.assign_value(id, value)
    }

    /// Internal write used by owners of derived inputs; skips the enabled and
    /// constrained checks but still propagates.
    pub(crate) fn assign_value(&mut self, id: &ParameterId, value: f64) -> ReflResult<()> {
        let parameter = self
            .parameters
            .get_mut(id)
            .ok_or_else(|| unknown_parameter(id))?;
        parameter.value = value;
        trace!(parameter = %id, value, "parameter written");
        self.journal.push(id.clone());
        self.propagate(id);
        Ok(())
    }

    pub fn set_fixed(&mut self, id: &ParameterId, fixed: bool) -> ReflResult<()> {
        self.get_mut(id)?.fixed = fixed;
        Ok(())
    }

    pub fn set_enabled(&mut self, id: &ParameterId, enabled: bool) -> ReflResult<()> {
        self.get_mut(id)?.enabled = enabled;
        Ok(())
    }

    pub fn set_bounds(&mut self, id: &ParameterId, min: f64, max: f64) -> ReflResult<()> {
        check_bounds(id.as_str(), min, max)?;
        let parameter = self.get_mut(id)?;
        parameter.min = min;
        parameter.max = max;
        Ok(())
    }

    pub fn set_name(&mut self, id: &ParameterId, name: impl Into<String>) -> ReflResult<()> {
        self.get_mut(id)?.name = name.into();
        Ok(())
    }

    pub fn set_description(
        &mut self,
        id: &ParameterId,
        description: impl Into<String>,
    ) -> ReflResult<()> {
        self.get_mut(id)?.description = description.into();
        Ok(())
    }

    pub fn set_url(&mut self, id: &ParameterId, url: impl Into<String>) -> ReflResult<()> {
        self.get_mut(id)?.url = url.into();
        Ok(())
    }

    pub fn is_constrained(&self, id: &ParameterId) -> bool {
        self.bound_outputs.contains_key(id)
    }

    pub fn is_fittable(&self, id: &ParameterId) -> bool {
        self.parameters
            .get(id)
            .is_some_and(|parameter| parameter.free() && parameter.enabled)
            && !self.is_constrained(id)
    }

    pub fn constraint_of(&self, output: &ParameterId) -> Option<&Constraint> {
        self.bound_outputs
            .get(output)
            .and_then(|constraint_id| self.constraints.get(constraint_id))
    }

    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.values()
    }

    /// Registers `inputs -> output` and recomputes `output` immediately.
    pub fn bind_constraint(
        &mut self,
        output: &ParameterId,
        inputs: &[ParameterId],
        relation: Relation,
    ) -> ReflResult<ConstraintId> {
        self.get(output)?;
        for input in inputs {
            self.get(input)?;
        }
        if inputs.is_empty() || relation.arity().is_some_and(|arity| arity != inputs.len()) {
            return Err(ReflError::validation(
                "VALIDATION.CONSTRAINT_ARITY",
                format!(
                    "relation '{}' cannot be bound to {} input(s)",
                    relation.label(),
                    inputs.len()
                ),
            ));
        }
        if self.bound_outputs.contains_key(output) {
            return Err(ReflError::validation(
                "VALIDATION.ALREADY_CONSTRAINED",
                format!("parameter '{}' is already constrained", output),
            ));
        }
        if self.would_cycle(output, inputs) {
            return Err(ReflError::validation(
                "VALIDATION.CONSTRAINT_CYCLE",
                format!(
                    "constraining '{}' on its own dependents would create a cycle",
                    output
                ),
            ));
        }

        let id = ConstraintId(self.next_constraint);
        self.next_constraint += 1;
        for input in inputs {
            self.dependents.entry(input.clone()).or_default().insert(id);
        }
        self.bound_outputs.insert(output.clone(), id);
        self.constraints.insert(
            id,
            Constraint {
                id,
                output: output.clone(),
                inputs: inputs.to_vec(),
                relation,
            },
        );
        self.recompute(id);
        Ok(id)
    }

    /// Makes `output` independent again; it keeps its last computed value.
    pub fn unbind(&mut self, output: &ParameterId) -> bool {
        let Some(constraint_id) = self.bound_outputs.remove(output) else {
            return false;
        };
        self.drop_constraint(constraint_id);
        true
    }

    /// Removes a parameter together with every constraint touching it.
    pub(crate) fn remove(&mut self, id: &ParameterId) -> Option<Parameter> {
        self.unbind(id);
        if let Some(constraint_ids) = self.dependents.remove(id) {
            for constraint_id in constraint_ids {
                if let Some(constraint) = self.constraints.get(&constraint_id) {
                    let output = constraint.output.clone();
                    self.bound_outputs.remove(&output);
                }
                self.drop_constraint(constraint_id);
            }
        }
        self.parameters.remove(id)
    }

    /// Identifiers written since the last drain, first occurrence order.
    pub fn drain_changes(&mut self) -> Vec<ParameterId> {
        let mut seen = BTreeSet::new();
        self.journal
            .drain(..)
            .filter(|id| seen.insert(id.clone()))
            .collect()
    }

    pub(crate) fn clear(&mut self) {
        let policy = self.policy;
        *self = Self::new(policy);
    }

    fn get_mut(&mut self, id: &ParameterId) -> ReflResult<&mut Parameter> {
        self.parameters
            .get_mut(id)
            .ok_or_else(|| unknown_parameter(id))
    }

    fn check_value(&self, parameter: &Parameter, value: f64) -> ReflResult<()> {
        if !value.is_finite() {
            return Err(ReflError::validation(
                "VALIDATION.NON_FINITE",
                format!("parameter '{}' cannot take value {}", parameter.name, value),
            ));
        }
        if parameter.whole_number && value.fract() != 0.0 {
            return Err(ReflError::validation(
                "VALIDATION.WHOLE_NUMBER",
                format!("parameter '{}' takes whole numbers, got {}", parameter.name, value),
            ));
        }
        let enforce = parameter.enforce_bounds || self.policy == BoundsPolicy::Strict;
        if enforce && !parameter.in_bounds(value) {
            return Err(ReflError::validation(
                "VALIDATION.OUT_OF_BOUNDS",
                format!(
                    "value {} for parameter '{}' is outside [{}, {}]",
                    value, parameter.name, parameter.min, parameter.max
                ),
            ));
        }
        Ok(())
    }

    fn would_cycle(&self, output: &ParameterId, inputs: &[ParameterId]) -> bool {
        if inputs.contains(output) {
            return true;
        }
        let mut visited = BTreeSet::new();
        let mut stack = vec![output.clone()];
        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            let Some(constraint_ids) = self.dependents.get(&current) else {
                continue;
            };
            for constraint_id in constraint_ids {
                let downstream = &self.constraints[constraint_id].output;
                if inputs.contains(downstream) {
                    return true;
                }
                stack.push(downstream.clone());
            }
        }
        false
    }

    fn drop_constraint(&mut self, constraint_id: ConstraintId) {
        let Some(constraint) = self.constraints.remove(&constraint_id) else {
            return;
        };
        for input in &constraint.inputs {
            if let Some(set) = self.dependents.get_mut(input) {
                set.remove(&constraint_id);
                if set.is_empty() {
                    self.dependents.remove(input);
                }
            }
        }
    }

    fn recompute(&mut self, constraint_id: ConstraintId) {
        let Some(constraint) = self.constraints.get(&constraint_id) else {
            return;
        };
        let inputs: Option<Vec<f64>> = constraint
            .inputs
            .iter()
            .map(|input| self.parameters.get(input).map(Parameter::value))
            .collect();
        let Some(inputs) = inputs else {
            return;
        };
        let value = constraint.relation.evaluate(&inputs);
        let output = constraint.output.clone();
        if let Some(parameter) = self.parameters.get_mut(&output) {
            parameter.value = value;
        }
        trace!(parameter = %output, value, relation = constraint.relation.label(), "constraint recomputed");
        self.journal.push(output.clone());
        self.propagate(&output);
    }

    fn propagate(&mut self, from: &ParameterId) {
        let Some(constraint_ids) = self.dependents.get(from).cloned() else {
            return;
        };
        for constraint_id in constraint_ids {
            self.recompute(constraint_id);
        }
    }
}

fn unknown_parameter(id: &ParameterId) -> ReflError {
    ReflError::lookup(
        "LOOKUP.PARAMETER",
        format!("parameter '{}' is not registered", id),
    )
}

/// Bounds are ordered and never NaN; either side may be infinite.
pub(crate) fn check_bounds(parameter: &str, min: f64, max: f64) -> ReflResult<()> {
    if min.is_nan() || max.is_nan() || min > max {
        return Err(ReflError::validation(
            "VALIDATION.BOUNDS",
            format!("invalid bounds [{}, {}] for parameter '{}'", min, max, parameter),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ParameterStore, Relation};
    use crate::common::config::BoundsPolicy;
    use crate::domain::{ParameterId, ReflErrorCategory};
    use crate::parameter::ParameterSpec;

    fn store_with(values: &[(&str, f64)]) -> (ParameterStore, Vec<ParameterId>) {
        let mut store = ParameterStore::default();
        let ids = values
            .iter()
            .map(|(name, value)| {
                let id = ParameterId::new(format!("Parameter_{}", name));
                store
                    .insert(id.clone(), ParameterSpec::new(*name, *value))
                    .expect("fresh id");
                id
            })
            .collect();
        (store, ids)
    }

    #[test]
    fn blend_constraint_recomputes_eagerly_on_every_input_write() {
        let (mut store, ids) = store_with(&[("a", 1.0), ("b", 2.0), ("f", 0.1), ("out", 0.0)]);
        store
            .bind_constraint(&ids[3], &ids[0..3], Relation::LinearBlend)
            .expect("bind blend");
        assert!((store.value(&ids[3]).unwrap() - 1.1).abs() < 1.0e-12);

        store.set_value(&ids[1], 4.0).expect("write input b");
        assert!((store.value(&ids[3]).unwrap() - 1.3).abs() < 1.0e-12);

        store.set_value(&ids[2], 1.0).expect("write fraction");
        assert!((store.value(&ids[3]).unwrap() - 4.0).abs() < 1.0e-12);
    }

    #[test]
    fn constrained_outputs_reject_direct_writes() {
        let (mut store, ids) = store_with(&[("source", 3.0), ("mirror", 0.0)]);
        store
            .bind_constraint(&ids[1], &ids[0..1], Relation::Identity)
            .expect("bind identity");
        let error = store.set_value(&ids[1], 5.0).expect_err("constrained write");
        assert_eq!(error.category(), ReflErrorCategory::Immutability);
        assert_eq!(error.code(), "IMMUTABLE.CONSTRAINED");
        assert_eq!(store.value(&ids[1]).unwrap(), 3.0);
    }

    #[test]
    fn chains_propagate_transitively() {
        let (mut store, ids) = store_with(&[("x", 1.0), ("y", 0.0), ("z", 0.0)]);
        store
            .bind_constraint(&ids[1], &ids[0..1], Relation::Scaled(2.0))
            .expect("y = 2x");
        store
            .bind_constraint(&ids[2], &ids[1..2], Relation::Scaled(3.0))
            .expect("z = 3y");
        store.set_value(&ids[0], 5.0).expect("write x");
        assert_eq!(store.value(&ids[1]).unwrap(), 10.0);
        assert_eq!(store.value(&ids[2]).unwrap(), 30.0);
    }

    #[test]
    fn cycles_are_rejected_at_bind_time() {
        let (mut store, ids) = store_with(&[("x", 1.0), ("y", 0.0)]);
        store
            .bind_constraint(&ids[1], &ids[0..1], Relation::Identity)
            .expect("y = x");
        let error = store
            .bind_constraint(&ids[0], &ids[1..2], Relation::Identity)
            .expect_err("x = y closes a cycle");
        assert_eq!(error.code(), "VALIDATION.CONSTRAINT_CYCLE");

        let (mut store, ids) = store_with(&[("self", 1.0)]);
        let error = store
            .bind_constraint(&ids[0], &ids[0..1], Relation::Identity)
            .expect_err("self reference");
        assert_eq!(error.code(), "VALIDATION.CONSTRAINT_CYCLE");
    }

    #[test]
    fn arity_and_double_binding_are_validated() {
        let (mut store, ids) = store_with(&[("a", 1.0), ("b", 1.0), ("out", 0.0)]);
        let error = store
            .bind_constraint(&ids[2], &ids[0..2], Relation::LinearBlend)
            .expect_err("blend needs three inputs");
        assert_eq!(error.code(), "VALIDATION.CONSTRAINT_ARITY");

        store
            .bind_constraint(&ids[2], &ids[0..1], Relation::Identity)
            .expect("first binding");
        let error = store
            .bind_constraint(&ids[2], &ids[1..2], Relation::Identity)
            .expect_err("second binding");
        assert_eq!(error.code(), "VALIDATION.ALREADY_CONSTRAINED");
    }

    #[test]
    fn unbinding_keeps_the_last_value_and_allows_writes() {
        let (mut store, ids) = store_with(&[("x", 7.0), ("y", 0.0)]);
        store
            .bind_constraint(&ids[1], &ids[0..1], Relation::Identity)
            .expect("y = x");
        assert!(store.unbind(&ids[1]));
        assert!(!store.unbind(&ids[1]));
        assert_eq!(store.value(&ids[1]).unwrap(), 7.0);

        store.set_value(&ids[0], 1.0).expect("write x");
        assert_eq!(store.value(&ids[1]).unwrap(), 7.0);
        store.set_value(&ids[1], 2.0).expect("y is free again");
    }

    #[test]
    fn custom_relations_receive_inputs_in_order() {
        let (mut store, ids) = store_with(&[("a", 2.0), ("b", 5.0), ("out", 0.0)]);
        store
            .bind_constraint(
                &ids[2],
                &ids[0..2],
                Relation::custom("difference", |inputs| inputs[1] - inputs[0]),
            )
            .expect("custom binding");
        assert_eq!(store.value(&ids[2]).unwrap(), 3.0);
        assert_eq!(
            format!("{:?}", store.constraint_of(&ids[2]).unwrap().relation()),
            "difference"
        );
    }

    #[test]
    fn disabled_and_bounded_parameters_guard_writes() {
        let mut store = ParameterStore::default();
        let fraction = ParameterId::new("Parameter_fraction");
        store
            .insert(
                fraction.clone(),
                ParameterSpec::new("fraction", 0.5)
                    .bounds(0.0, 1.0)
                    .enforce_bounds(),
            )
            .unwrap();
        assert!(store.set_value(&fraction, 0.0).is_ok());
        assert!(store.set_value(&fraction, 1.0).is_ok());
        let error = store.set_value(&fraction, 1.5).expect_err("above max");
        assert_eq!(error.category(), ReflErrorCategory::Validation);
        assert!(store.set_value(&fraction, -0.1).is_err());
        assert!(store.set_value(&fraction, f64::NAN).is_err());

        store.set_enabled(&fraction, false).unwrap();
        let error = store.set_value(&fraction, 0.2).expect_err("disabled");
        assert_eq!(error.code(), "IMMUTABLE.DISABLED");
        assert!(!store.is_fittable(&fraction));
    }

    #[test]
    fn strict_policy_enforces_all_bounds() {
        let mut store = ParameterStore::new(BoundsPolicy::Strict);
        let thickness = ParameterId::new("Parameter_thickness");
        store
            .insert(
                thickness.clone(),
                ParameterSpec::new("thickness", 10.0).bounds(0.0, f64::INFINITY),
            )
            .unwrap();
        assert!(store.set_value(&thickness, -1.0).is_err());

        let mut advisory = ParameterStore::default();
        advisory
            .insert(
                thickness.clone(),
                ParameterSpec::new("thickness", 10.0).bounds(0.0, f64::INFINITY),
            )
            .unwrap();
        assert!(advisory.set_value(&thickness, -1.0).is_ok());
    }

    #[test]
    fn removing_an_input_frees_its_dependents() {
        let (mut store, ids) = store_with(&[("x", 4.0), ("y", 0.0)]);
        store
            .bind_constraint(&ids[1], &ids[0..1], Relation::Identity)
            .unwrap();
        store.remove(&ids[0]).expect("x removed");
        assert!(!store.is_constrained(&ids[1]));
        assert_eq!(store.value(&ids[1]).unwrap(), 4.0);
        assert_eq!(store.constraints().count(), 0);
    }

    #[test]
    fn change_journal_is_deduplicated_and_drained() {
        let (mut store, ids) = store_with(&[("x", 1.0), ("y", 0.0)]);
        store
            .bind_constraint(&ids[1], &ids[0..1], Relation::Identity)
            .unwrap();
        store.drain_changes();
        store.set_value(&ids[0], 2.0).unwrap();
        store.set_value(&ids[0], 3.0).unwrap();
        assert_eq!(store.drain_changes(), vec![ids[0].clone(), ids[1].clone()]);
        assert!(store.drain_changes().is_empty());
    }
}
