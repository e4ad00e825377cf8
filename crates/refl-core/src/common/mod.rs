pub mod config;
pub mod constants;
pub mod elements;
pub mod formula;

pub use config::{BoundsPolicy, SessionConfig};
pub use elements::{ElementData, NeutronScatteringTable};
pub use formula::{ChemicalFormula, FormulaError};
