//! Regions represent the buses of the network, each with its own demand profile.
use crate::id::{define_id_getter, define_id_type};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

define_id_type! {RegionID}

/// A map of [`Region`]s, keyed by region ID
pub type RegionMap = IndexMap<RegionID, Region>;

/// Represents a region with an ID and an optional geographic label.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Region {
    /// A unique identifier for a region (e.g. "PRD").
    pub id: RegionID,
    /// A text description of the region (e.g. "Pearl River Delta").
    #[serde(default)]
    pub description: String,
}
define_id_getter! {Region, RegionID}
