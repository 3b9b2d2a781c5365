//! Storage units shift energy between snapshots, subject to losses on the way in and out.
use crate::id::{define_id_getter, define_id_type};
use crate::region::RegionID;
use crate::units::{Dimensionless, Energy, MoneyPerEnergy, Power};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

define_id_type! {StorageID}

/// A map of [`StorageUnit`]s, keyed by storage ID
pub type StorageMap = IndexMap<StorageID, StorageUnit>;

/// A battery, pumped hydro plant or other store connected to a single region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageUnit {
    /// Unique identifier for the storage unit
    pub id: StorageID,
    /// The region the unit is connected to
    pub region_id: RegionID,
    /// Maximum charge and discharge rate
    pub power_capacity: Power,
    /// Size of the reservoir
    pub energy_capacity: Energy,
    /// Fraction of energy drawn from the grid which ends up stored
    pub efficiency_store: Dimensionless,
    /// Fraction of energy taken from the store which reaches the grid
    pub efficiency_dispatch: Dimensionless,
    /// State of charge before the first snapshot, as a fraction of energy capacity.
    ///
    /// Only used when storage is not cyclic.
    pub initial_soc: Dimensionless,
    /// Cost per unit of energy discharged
    pub marginal_cost: MoneyPerEnergy,
}
define_id_getter! {StorageUnit, StorageID}

impl StorageUnit {
    /// Product of the store and dispatch efficiencies
    pub fn round_trip_efficiency(&self) -> Dimensionless {
        self.efficiency_store * self.efficiency_dispatch
    }

    /// Energy stored before the first snapshot
    pub fn initial_energy(&self) -> Energy {
        self.energy_capacity * self.initial_soc
    }
}
