#![allow(dead_code)]

use refl_core::calculator::{Calculator, FieldTable, FieldValues, REFNX_FIELDS};
use refl_core::model::ResolutionFunction;
use refl_core::{ReflError, ReflResult, Session};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub const RECORDING: &str = "recording";

/// Calculator that writes every call it receives to a shared log and keeps
/// the last material values it was sent.
#[derive(Debug, Default)]
pub struct RecordingCalculator {
    log: Arc<Mutex<Vec<String>>>,
    materials: BTreeMap<String, BTreeMap<String, f64>>,
}

impl RecordingCalculator {
    fn record(&self, line: String) {
        self.log.lock().expect("log lock").push(line);
    }
}

fn render(values: FieldValues<'_>) -> String {
    values
        .iter()
        .map(|(field, value)| format!("{}={}", field, value))
        .collect::<Vec<_>>()
        .join(",")
}

impl Calculator for RecordingCalculator {
    fn name(&self) -> &str {
        RECORDING
    }

    fn field_table(&self) -> &'static FieldTable {
        &REFNX_FIELDS
    }

    fn create_material(&mut self, id: &str) {
        self.materials.entry(id.to_string()).or_default();
        self.record(format!("create_material {}", id));
    }

    fn update_material(&mut self, id: &str, values: FieldValues<'_>) {
        let stored = self.materials.entry(id.to_string()).or_default();
        for (field, value) in values {
            stored.insert(field.to_string(), *value);
        }
        self.record(format!("update_material {} {}", id, render(values)));
    }

    fn get_material_value(&self, id: &str, field: &str) -> ReflResult<f64> {
        self.materials
            .get(id)
            .and_then(|values| values.get(field))
            .copied()
            .ok_or_else(|| ReflError::lookup("LOOKUP.FIELD", format!("{}.{} was never sent", id, field)))
    }

    fn create_layer(&mut self, id: &str) {
        self.record(format!("create_layer {}", id));
    }

    fn update_layer(&mut self, id: &str, values: FieldValues<'_>) {
        self.record(format!("update_layer {} {}", id, render(values)));
    }

    fn assign_material_to_layer(&mut self, material_id: &str, layer_id: &str) {
        self.record(format!("assign_material_to_layer {} {}", material_id, layer_id));
    }

    fn create_item(&mut self, id: &str) {
        self.record(format!("create_item {}", id));
    }

    fn add_layer_to_item(&mut self, layer_id: &str, item_id: &str) {
        self.record(format!("add_layer_to_item {} {}", layer_id, item_id));
    }

    fn remove_layer_from_item(&mut self, layer_id: &str, item_id: &str) {
        self.record(format!("remove_layer_from_item {} {}", layer_id, item_id));
    }

    fn update_item(&mut self, id: &str, values: FieldValues<'_>) {
        self.record(format!("update_item {} {}", id, render(values)));
    }

    fn create_model(&mut self, id: &str) {
        self.record(format!("create_model {}", id));
    }

    fn add_item_to_model(&mut self, item_id: &str, model_id: &str) {
        self.record(format!("add_item_to_model {} {}", item_id, model_id));
    }

    fn remove_item_from_model(&mut self, item_id: &str, model_id: &str) {
        self.record(format!("remove_item_from_model {} {}", item_id, model_id));
    }

    fn update_model(&mut self, id: &str, values: FieldValues<'_>) {
        self.record(format!("update_model {} {}", id, render(values)));
    }

    fn set_resolution_function(&mut self, resolution: &ResolutionFunction) {
        let line = match resolution {
            ResolutionFunction::PercentageFwhm { constant } => format!("set_resolution_function percentage {}", constant),
            ResolutionFunction::LinearSpline { q_data_points, .. } => {
                format!("set_resolution_function spline {}", q_data_points.len())
            }
        };
        self.record(line);
    }

    fn fit_func(&mut self, q: &[f64], model_id: &str) -> ReflResult<Vec<f64>> {
        self.record(format!("fit_func {} {}", model_id, q.len()));
        Ok(vec![1.0; q.len()])
    }

    fn sld_profile(&mut self, model_id: &str) -> ReflResult<(Vec<f64>, Vec<f64>)> {
        self.record(format!("sld_profile {}", model_id));
        Ok((vec![0.0, 1.0], vec![0.0, 0.0]))
    }
}

/// Session with the recording calculator registered, plus the log it writes.
pub fn recording_session() -> (Session, Arc<Mutex<Vec<String>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut session = Session::new();
    let shared = Arc::clone(&log);
    session.register_calculator(RECORDING, move || {
        Box::new(RecordingCalculator {
            log: Arc::clone(&shared),
            materials: BTreeMap::new(),
        })
    });
    (session, log)
}

pub fn drain(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    std::mem::take(&mut *log.lock().expect("log lock"))
}

pub fn value_of(session: &Session, id: &refl_core::ParameterId) -> f64 {
    session.value(id).expect("parameter is registered")
}
