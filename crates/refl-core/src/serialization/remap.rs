use crate::domain::{EntityKind, ReflResult};
use crate::registry::IdentityRegistry;
use crate::session::Session;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

pub const DUPLICATE_SUFFIX: &str = " duplicate";

pub(crate) fn append_duplicate_suffix(name: &mut String) {
    name.push_str(DUPLICATE_SUFFIX);
}

/// Replaces every `unique_name` in `value` with a fresh identifier of the
/// same kind. Repeated identifiers map to the same replacement, so sharing
/// inside the document survives. Identifiers without a known prefix are
/// dropped and minted on import.
pub(crate) fn remap_identifiers(value: &mut Value, registry: &mut IdentityRegistry) {
    let mut mapping = BTreeMap::new();
    remap_value(value, registry, &mut mapping);
}

fn remap_value(
    value: &mut Value,
    registry: &mut IdentityRegistry,
    mapping: &mut BTreeMap<String, String>,
) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(old)) = map.get("unique_name") {
                let old = old.clone();
                match replacement(&old, registry, mapping) {
                    Some(new) => {
                        map.insert("unique_name".to_string(), Value::String(new));
                    }
                    None => {
                        map.remove("unique_name");
                    }
                }
            }
            for child in map.values_mut() {
                remap_value(child, registry, mapping);
            }
        }
        Value::Array(items) => {
            for item in items {
                remap_value(item, registry, mapping);
            }
        }
        _ => {}
    }
}

fn replacement(
    old: &str,
    registry: &mut IdentityRegistry,
    mapping: &mut BTreeMap<String, String>,
) -> Option<String> {
    if let Some(new) = mapping.get(old) {
        return Some(new.clone());
    }
    let kind = EntityKind::from_prefix(old)?;
    let new = registry.generate_unique_name(kind);
    mapping.insert(old.to_string(), new.clone());
    Some(new)
}

impl Session {
    /// Deep copy of a record with every identifier replaced.
    pub(crate) fn duplicate_record<T: Serialize + DeserializeOwned>(&mut self, record: &T) -> ReflResult<T> {
        let mut value = serde_json::to_value(record)?;
        remap_identifiers(&mut value, &mut self.registry);
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::{append_duplicate_suffix, remap_identifiers};
    use crate::registry::IdentityRegistry;
    use serde_json::json;

    #[test]
    fn repeated_identifiers_share_one_replacement() {
        let mut registry = IdentityRegistry::new();
        let mut value = json!({
            "unique_name": "Multilayer_3",
            "layers": {"data": [
                {"unique_name": "Layer_4", "material": {"unique_name": "Material_5"}},
                {"unique_name": "Layer_6", "material": {"unique_name": "Material_5"}}
            ]}
        });
        remap_identifiers(&mut value, &mut registry);

        let assembly = value["unique_name"].as_str().unwrap();
        assert!(assembly.starts_with("Multilayer_"));
        assert_ne!(assembly, "Multilayer_3");
        let first = &value["layers"]["data"][0]["material"]["unique_name"];
        let second = &value["layers"]["data"][1]["material"]["unique_name"];
        assert_eq!(first, second);
        assert_ne!(first, &json!("Material_5"));
        assert_ne!(
            value["layers"]["data"][0]["unique_name"],
            value["layers"]["data"][1]["unique_name"]
        );
    }

    #[test]
    fn unknown_prefixes_are_dropped() {
        let mut registry = IdentityRegistry::new();
        let mut value = json!({"unique_name": "my-own-id", "name": "kept"});
        remap_identifiers(&mut value, &mut registry);
        assert_eq!(value, json!({"name": "kept"}));
    }

    #[test]
    fn suffix_is_appended_once_per_call() {
        let mut name = "Si".to_string();
        append_duplicate_suffix(&mut name);
        assert_eq!(name, "Si duplicate");
    }
}
