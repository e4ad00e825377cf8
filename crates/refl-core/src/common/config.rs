//! Session-wide behaviour switches.

use serde::{Deserialize, Serialize};

/// How parameter bounds are treated on external writes.
///
/// `Advisory` keeps `min <= value <= max` as metadata only, except for
/// parameters created with enforced bounds (mixture fractions, repetition
/// counts). `Strict` rejects every out-of-range write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundsPolicy {
    #[default]
    Advisory,
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub bounds_policy: BoundsPolicy,
}

impl SessionConfig {
    pub fn strict() -> Self {
        Self {
            bounds_policy: BoundsPolicy::Strict,
        }
    }
}
