//! Transmission links carry power between two regions.
use crate::id::{define_id_getter, define_id_type};
use crate::region::RegionID;
use crate::units::{Dimensionless, Power};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

define_id_type! {LinkID}

/// A map of [`TransmissionLink`]s, keyed by link ID
pub type LinkMap = IndexMap<LinkID, TransmissionLink>;

/// A transport-model link between two regions.
///
/// Positive flow runs from `from_region` to `to_region`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransmissionLink {
    /// Unique identifier for the link
    pub id: LinkID,
    /// The sending end for positive flow
    pub from_region: RegionID,
    /// The receiving end for positive flow
    pub to_region: RegionID,
    /// Maximum flow from `from_region` to `to_region`
    pub capacity: Power,
    /// Maximum flow in the opposite direction. Defaults to `capacity`.
    pub reverse_capacity: Option<Power>,
    /// Fraction of the sent flow lost before reaching the receiving region
    pub loss_factor: Dimensionless,
}
define_id_getter! {TransmissionLink, LinkID}

impl TransmissionLink {
    /// Maximum flow from `to_region` back to `from_region`
    pub fn reverse_limit(&self) -> Power {
        self.reverse_capacity.unwrap_or(self.capacity)
    }

    /// Whether any power is lost in transit
    pub fn is_lossless(&self) -> bool {
        self.loss_factor == Dimensionless(0.0)
    }

    /// Fraction of the sent flow which arrives
    pub fn delivery_factor(&self) -> Dimensionless {
        Dimensionless(1.0) - self.loss_factor
    }
}
