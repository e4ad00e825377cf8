//! Plain-dictionary form of the object graph.
//!
//! Entities are exported into typed serde records and rendered as
//! `serde_json::Value` maps. Import decodes and validates a whole document
//! before any entity is created, and undoes a build that fails part way, so
//! a rejected document leaves the session untouched.

mod export;
mod import;
pub mod io;
mod records;
mod remap;

pub use records::{
    AssemblyRecord, LayerRecord, MaterialCollectionRecord, MaterialRecord, ModelCollectionRecord,
    ModelRecord, SampleRecord,
};
pub use remap::DUPLICATE_SUFFIX;

pub(crate) use import::Importer;
pub(crate) use remap::append_duplicate_suffix;

use crate::parameter::{Parameter, ParameterSpec};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_name: Option<String>,
    pub value: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(with = "bound", default = "negative_infinity")]
    pub min: f64,
    #[serde(with = "bound", default = "positive_infinity")]
    pub max: f64,
    #[serde(default)]
    pub fixed: bool,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
}

impl ParameterRecord {
    pub(crate) fn from_parameter(parameter: &Parameter) -> Self {
        Self {
            name: parameter.name().to_string(),
            unique_name: Some(parameter.id().to_string()),
            value: parameter.value(),
            unit: parameter.unit().to_string(),
            min: parameter.min(),
            max: parameter.max(),
            fixed: parameter.fixed(),
            enabled: parameter.enabled(),
            description: parameter.description().to_string(),
            url: parameter.url().to_string(),
        }
    }

    /// Overlays the recorded fields on an owner-supplied template. The
    /// template keeps control of bound enforcement, of whole-number values
    /// and of the unit when the record carries none.
    pub(crate) fn apply_to(&self, template: ParameterSpec) -> ParameterSpec {
        ParameterSpec {
            name: self.name.clone(),
            value: self.value,
            unit: if self.unit.is_empty() {
                template.unit
            } else {
                self.unit.clone()
            },
            min: self.min,
            max: self.max,
            fixed: self.fixed,
            enabled: self.enabled,
            description: self.description.clone(),
            url: self.url.clone(),
            enforce_bounds: template.enforce_bounds,
            whole_number: template.whole_number,
        }
    }
}

/// `{name, unique_name, populate_if_none, data: [...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionRecord<T> {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_name: Option<String>,
    #[serde(default)]
    pub populate_if_none: bool,
    pub data: Vec<T>,
}

fn negative_infinity() -> f64 {
    f64::NEG_INFINITY
}

fn positive_infinity() -> f64 {
    f64::INFINITY
}

fn enabled_by_default() -> bool {
    true
}

/// JSON has no infinities; unbounded limits travel as `"inf"` / `"-inf"`.
/// The store never holds a NaN bound, so one is refused in both directions.
mod bound {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            Err(<S::Error as serde::ser::Error>::custom("parameter bounds cannot be NaN"))
        } else if *value > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawBound {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match RawBound::deserialize(deserializer)? {
            RawBound::Number(value) => Ok(value),
            RawBound::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "inf" | "+inf" | "infinity" | "+infinity" => Ok(f64::INFINITY),
                "-inf" | "-infinity" => Ok(f64::NEG_INFINITY),
                other => Err(D::Error::custom(format!("invalid parameter bound '{}'", other))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ParameterRecord;
    use crate::parameter::ParameterSpec;
    use serde_json::json;

    #[test]
    fn infinite_bounds_survive_json() {
        let record = ParameterRecord {
            name: "thickness".to_string(),
            unique_name: Some("Parameter_3".to_string()),
            value: 10.0,
            unit: "angstrom".to_string(),
            min: 0.0,
            max: f64::INFINITY,
            fixed: false,
            enabled: true,
            description: String::new(),
            url: String::new(),
        };
        let value = serde_json::to_value(&record).expect("record serializes");
        assert_eq!(value["max"], json!("inf"));
        assert_eq!(value["min"], json!(0.0));

        let text = serde_json::to_string(&record).expect("record renders");
        let decoded: ParameterRecord = serde_json::from_str(&text).expect("record decodes");
        assert_eq!(decoded, record);
    }

    #[test]
    fn sparse_records_fill_defaults() {
        let decoded: ParameterRecord =
            serde_json::from_value(json!({"name": "sld", "value": 2.07, "min": "-Infinity"}))
                .expect("sparse record");
        assert_eq!(decoded.min, f64::NEG_INFINITY);
        assert_eq!(decoded.max, f64::INFINITY);
        assert!(decoded.enabled);
        assert!(decoded.unique_name.is_none());
    }

    #[test]
    fn template_keeps_enforcement_and_fallback_unit() {
        let decoded: ParameterRecord =
            serde_json::from_value(json!({"name": "fraction", "value": 0.25, "min": 0, "max": 1}))
                .unwrap();
        let spec = decoded.apply_to(ParameterSpec::new("fraction", 0.5).unit("dimensionless").enforce_bounds());
        assert!(spec.enforce_bounds);
        assert_eq!(spec.unit, "dimensionless");
        assert_eq!(spec.value, 0.25);
    }

    #[test]
    fn malformed_bounds_are_rejected() {
        let decoded: Result<ParameterRecord, _> =
            serde_json::from_value(json!({"name": "sld", "value": 1.0, "max": "lots"}));
        assert!(decoded.is_err());
    }

    #[test]
    fn nan_bounds_are_refused_on_write_and_read() {
        let record = ParameterRecord {
            name: "sld".to_string(),
            unique_name: None,
            value: 1.0,
            unit: String::new(),
            min: f64::NAN,
            max: f64::INFINITY,
            fixed: false,
            enabled: true,
            description: String::new(),
            url: String::new(),
        };
        assert!(serde_json::to_value(&record).is_err());
        let decoded: Result<ParameterRecord, _> =
            serde_json::from_value(json!({"name": "sld", "value": 1.0, "min": "nan"}));
        assert!(decoded.is_err());
    }
}
