use super::{CollectionRecord, ParameterRecord};
use crate::model::ResolutionFunction;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaterialRecord {
    Material {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unique_name: Option<String>,
        sld: ParameterRecord,
        isld: ParameterRecord,
    },
    MaterialMixture {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unique_name: Option<String>,
        material_a: Box<MaterialRecord>,
        material_b: Box<MaterialRecord>,
        fraction: ParameterRecord,
        sld: ParameterRecord,
        isld: ParameterRecord,
    },
    MaterialSolvated {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unique_name: Option<String>,
        material: Box<MaterialRecord>,
        solvent: Box<MaterialRecord>,
        solvent_fraction: ParameterRecord,
        sld: ParameterRecord,
        isld: ParameterRecord,
    },
    MaterialDensity {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unique_name: Option<String>,
        chemical_structure: String,
        density: ParameterRecord,
        scattering_length_real: ParameterRecord,
        scattering_length_imag: ParameterRecord,
        molecular_weight: ParameterRecord,
        sld: ParameterRecord,
        isld: ParameterRecord,
    },
}

impl MaterialRecord {
    pub fn name(&self) -> &str {
        match self {
            Self::Material { name, .. }
            | Self::MaterialMixture { name, .. }
            | Self::MaterialSolvated { name, .. }
            | Self::MaterialDensity { name, .. } => name,
        }
    }

    pub fn unique_name(&self) -> Option<&str> {
        match self {
            Self::Material { unique_name, .. }
            | Self::MaterialMixture { unique_name, .. }
            | Self::MaterialSolvated { unique_name, .. }
            | Self::MaterialDensity { unique_name, .. } => unique_name.as_deref(),
        }
    }

    pub(crate) fn name_mut(&mut self) -> &mut String {
        match self {
            Self::Material { name, .. }
            | Self::MaterialMixture { name, .. }
            | Self::MaterialSolvated { name, .. }
            | Self::MaterialDensity { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerRecord {
    Layer {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unique_name: Option<String>,
        material: MaterialRecord,
        thickness: ParameterRecord,
        roughness: ParameterRecord,
    },
    /// `material` is the internal solvated material: molecule in solvent.
    LayerAreaPerMolecule {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unique_name: Option<String>,
        molecular_formula: String,
        thickness: ParameterRecord,
        roughness: ParameterRecord,
        area_per_molecule: ParameterRecord,
        scattering_length_real: ParameterRecord,
        scattering_length_imag: ParameterRecord,
        material: MaterialRecord,
    },
}

impl LayerRecord {
    pub fn name(&self) -> &str {
        match self {
            Self::Layer { name, .. } | Self::LayerAreaPerMolecule { name, .. } => name,
        }
    }

    pub fn unique_name(&self) -> Option<&str> {
        match self {
            Self::Layer { unique_name, .. } | Self::LayerAreaPerMolecule { unique_name, .. } => {
                unique_name.as_deref()
            }
        }
    }

    pub(crate) fn name_mut(&mut self) -> &mut String {
        match self {
            Self::Layer { name, .. } | Self::LayerAreaPerMolecule { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssemblyRecord {
    Multilayer {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unique_name: Option<String>,
        layers: CollectionRecord<LayerRecord>,
    },
    RepeatingMultilayer {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unique_name: Option<String>,
        layers: CollectionRecord<LayerRecord>,
        repetitions: ParameterRecord,
    },
    /// `layers.data` holds the tail layer followed by the head layer.
    SurfactantLayer {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unique_name: Option<String>,
        layers: CollectionRecord<LayerRecord>,
        #[serde(default)]
        constrain_area_per_molecule: bool,
        #[serde(default)]
        conformal_roughness: bool,
    },
}

impl AssemblyRecord {
    pub fn name(&self) -> &str {
        match self {
            Self::Multilayer { name, .. }
            | Self::RepeatingMultilayer { name, .. }
            | Self::SurfactantLayer { name, .. } => name,
        }
    }

    pub fn unique_name(&self) -> Option<&str> {
        match self {
            Self::Multilayer { unique_name, .. }
            | Self::RepeatingMultilayer { unique_name, .. }
            | Self::SurfactantLayer { unique_name, .. } => unique_name.as_deref(),
        }
    }

    pub fn layers(&self) -> &CollectionRecord<LayerRecord> {
        match self {
            Self::Multilayer { layers, .. }
            | Self::RepeatingMultilayer { layers, .. }
            | Self::SurfactantLayer { layers, .. } => layers,
        }
    }

    pub(crate) fn name_mut(&mut self) -> &mut String {
        match self {
            Self::Multilayer { name, .. }
            | Self::RepeatingMultilayer { name, .. }
            | Self::SurfactantLayer { name, .. } => name,
        }
    }

    pub(crate) fn layers_mut(&mut self) -> &mut CollectionRecord<LayerRecord> {
        match self {
            Self::Multilayer { layers, .. }
            | Self::RepeatingMultilayer { layers, .. }
            | Self::SurfactantLayer { layers, .. } => layers,
        }
    }
}

pub type SampleRecord = CollectionRecord<AssemblyRecord>;
pub type MaterialCollectionRecord = CollectionRecord<MaterialRecord>;
pub type ModelCollectionRecord = CollectionRecord<ModelRecord>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_name: Option<String>,
    pub scale: ParameterRecord,
    pub background: ParameterRecord,
    pub sample: SampleRecord,
    pub resolution_function: ResolutionFunction,
    #[serde(default)]
    pub interface: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{AssemblyRecord, LayerRecord, MaterialRecord};
    use serde_json::json;

    fn parameter(name: &str, value: f64) -> serde_json::Value {
        json!({"name": name, "value": value})
    }

    #[test]
    fn material_records_are_tagged_by_kind() {
        let record: MaterialRecord = serde_json::from_value(json!({
            "kind": "material_mixture",
            "name": "Si in D2O",
            "material_a": {"kind": "material", "name": "Si", "sld": parameter("sld", 2.07), "isld": parameter("isld", 0.0)},
            "material_b": {"kind": "material", "name": "D2O", "sld": parameter("sld", 6.36), "isld": parameter("isld", 0.0)},
            "fraction": parameter("fraction", 0.5),
            "sld": parameter("sld", 4.215),
            "isld": parameter("isld", 0.0)
        }))
        .expect("mixture record decodes");
        assert_eq!(record.name(), "Si in D2O");
        assert!(record.unique_name().is_none());
        let MaterialRecord::MaterialMixture { material_b, .. } = &record else {
            panic!("expected a mixture record");
        };
        assert_eq!(material_b.name(), "D2O");
    }

    #[test]
    fn unknown_kinds_are_rejected() {
        let decoded: Result<LayerRecord, _> = serde_json::from_value(json!({
            "kind": "bilayer",
            "name": "nope"
        }));
        assert!(decoded.is_err());
    }

    #[test]
    fn surfactant_flags_default_to_off() {
        let record: AssemblyRecord = serde_json::from_value(json!({
            "kind": "surfactant_layer",
            "name": "lipid",
            "layers": {"name": "lipid layers", "data": []}
        }))
        .expect("surfactant record decodes");
        let AssemblyRecord::SurfactantLayer {
            constrain_area_per_molecule,
            conformal_roughness,
            ..
        } = record
        else {
            panic!("expected a surfactant record");
        };
        assert!(!constrain_area_per_molecule);
        assert!(!conformal_roughness);
    }
}
