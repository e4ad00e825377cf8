pub mod errors;

pub use errors::{ReflError, ReflErrorCategory, ReflResult};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Class of a registered entity. The prefix doubles as the stem of generated
/// identifiers (`Material_3`, `SurfactantLayer_12`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Parameter,
    Material,
    MaterialMixture,
    MaterialSolvated,
    MaterialDensity,
    Layer,
    LayerAreaPerMolecule,
    Multilayer,
    RepeatingMultilayer,
    SurfactantLayer,
    Sample,
    Model,
    LayerCollection,
    MaterialCollection,
    ModelCollection,
}

impl EntityKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parameter => "Parameter",
            Self::Material => "Material",
            Self::MaterialMixture => "MaterialMixture",
            Self::MaterialSolvated => "MaterialSolvated",
            Self::MaterialDensity => "MaterialDensity",
            Self::Layer => "Layer",
            Self::LayerAreaPerMolecule => "LayerAreaPerMolecule",
            Self::Multilayer => "Multilayer",
            Self::RepeatingMultilayer => "RepeatingMultilayer",
            Self::SurfactantLayer => "SurfactantLayer",
            Self::Sample => "Sample",
            Self::Model => "Model",
            Self::LayerCollection => "LayerCollection",
            Self::MaterialCollection => "MaterialCollection",
            Self::ModelCollection => "ModelCollection",
        }
    }

    pub const ALL: [EntityKind; 15] = [
        Self::Parameter,
        Self::Material,
        Self::MaterialMixture,
        Self::MaterialSolvated,
        Self::MaterialDensity,
        Self::Layer,
        Self::LayerAreaPerMolecule,
        Self::Multilayer,
        Self::RepeatingMultilayer,
        Self::SurfactantLayer,
        Self::Sample,
        Self::Model,
        Self::LayerCollection,
        Self::MaterialCollection,
        Self::ModelCollection,
    ];

    /// Kind encoded in a generated identifier such as `Layer_4`.
    pub fn from_prefix(id: &str) -> Option<EntityKind> {
        let (prefix, _) = id.rsplit_once('_')?;
        Self::ALL.into_iter().find(|kind| kind.as_str() == prefix)
    }

    pub const fn is_material(self) -> bool {
        matches!(
            self,
            Self::Material | Self::MaterialMixture | Self::MaterialSolvated | Self::MaterialDensity
        )
    }

    pub const fn is_layer(self) -> bool {
        matches!(self, Self::Layer | Self::LayerAreaPerMolecule)
    }

    pub const fn is_assembly(self) -> bool {
        matches!(
            self,
            Self::Multilayer | Self::RepeatingMultilayer | Self::SurfactantLayer
        )
    }

    pub const fn is_collection(self) -> bool {
        matches!(
            self,
            Self::LayerCollection | Self::MaterialCollection | Self::ModelCollection
        )
    }

    /// Entity families whose identifiers may be used interchangeably when
    /// checking a registered id against the kind a caller expects.
    pub const fn same_family(self, other: EntityKind) -> bool {
        (self.is_material() && other.is_material())
            || (self.is_layer() && other.is_layer())
            || (self.is_assembly() && other.is_assembly())
            || (self.is_collection() && other.is_collection())
            || (self as u8 == other as u8)
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub(crate) fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

entity_id!(ParameterId);
entity_id!(MaterialId);
entity_id!(LayerId);
entity_id!(
    /// Identifier of any assembly variant (multilayer, repeating multilayer,
    /// surfactant layer).
    AssemblyId
);
entity_id!(SampleId);
entity_id!(ModelId);
entity_id!(
    /// Identifier of a standalone material or model collection.
    CollectionId
);

#[cfg(test)]
mod tests {
    use super::{EntityKind, MaterialId};

    #[test]
    fn entity_kind_families_group_variants() {
        assert!(EntityKind::MaterialDensity.same_family(EntityKind::Material));
        assert!(EntityKind::SurfactantLayer.same_family(EntityKind::Multilayer));
        assert!(EntityKind::Sample.same_family(EntityKind::Sample));
        assert!(!EntityKind::Layer.same_family(EntityKind::Material));
        assert_eq!(EntityKind::LayerAreaPerMolecule.to_string(), "LayerAreaPerMolecule");
    }

    #[test]
    fn kinds_are_recovered_from_generated_identifiers() {
        assert_eq!(EntityKind::from_prefix("Material_3"), Some(EntityKind::Material));
        assert_eq!(
            EntityKind::from_prefix("MaterialSolvated_12"),
            Some(EntityKind::MaterialSolvated)
        );
        assert_eq!(EntityKind::from_prefix("Widget_1"), None);
        assert_eq!(EntityKind::from_prefix("Layer"), None);
    }

    #[test]
    fn typed_ids_serialize_as_plain_strings() {
        let id = MaterialId::new("Material_4");
        let value = serde_json::to_value(&id).expect("id should serialize");
        assert_eq!(value, serde_json::json!("Material_4"));
        assert_eq!(id.to_string(), "Material_4");
    }
}
