//! Composition and parameter resolution for layered reflectometry samples.
//!
//! A [`Session`] owns the object graph (materials, layers, assemblies,
//! samples and models), the parameters and their constraints, and the
//! identity registry that names every entity. Entities are addressed by
//! typed identifiers; every operation goes through the session.

pub mod assembly;
pub mod calculator;
pub mod collection;
pub mod common;
pub mod domain;
pub mod layer;
pub mod material;
pub mod model;
pub mod parameter;
pub mod registry;
pub mod sample;
pub mod serialization;
pub mod session;

pub use assembly::{Assembly, AssemblyKind, AssemblyShape, Surfactant, SurfactantRole};
pub use calculator::{BindingKey, Calculator, CalculatorBinding, CalculatorFactory, FieldTable};
pub use collection::Collection;
pub use common::{BoundsPolicy, ElementData, NeutronScatteringTable, SessionConfig};
pub use domain::{
    AssemblyId, CollectionId, EntityKind, LayerId, MaterialId, ModelId, ParameterId, ReflError,
    ReflErrorCategory, ReflResult, SampleId,
};
pub use layer::{AreaPerMoleculeSpec, Layer, LayerKind};
pub use material::{Material, MaterialKind, MixtureRole};
pub use model::{Model, ResolutionFunction};
pub use parameter::{Parameter, ParameterSpec, Relation};
pub use registry::IdentityRegistry;
pub use sample::Sample;
pub use session::Session;
