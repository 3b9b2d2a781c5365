//! Generators are the dispatchable and variable sources of power in the network.
use crate::id::{define_id_getter, define_id_type};
use crate::region::RegionID;
use crate::units::{Dimensionless, EmissionsPerEnergy, MoneyPerEnergy, Power};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::EnumIter;

define_id_type! {GeneratorID}

/// A map of [`Generator`]s, keyed by generator ID
pub type GeneratorMap = IndexMap<GeneratorID, Generator>;

/// The category of technology a generator belongs to
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    strum::Display,
    strum::EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Technology {
    /// Coal-fired thermal plant
    Coal,
    /// Gas-fired thermal plant
    Gas,
    /// Nuclear plant
    Nuclear,
    /// Conventional hydro
    Hydro,
    /// Solar PV
    Solar,
    /// Onshore and offshore wind
    Wind,
    /// Biomass-fired plant
    Biomass,
    /// Power imported over an external interconnector
    Import,
    /// Slack generator representing load that is shed
    UnservedLoad,
}

impl Technology {
    /// Whether output depends on the weather, so unused availability counts as curtailment
    pub fn is_variable_renewable(self) -> bool {
        matches!(self, Self::Solar | Self::Wind)
    }
}

/// A unit which produces power in a single region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    /// Unique identifier for the generator
    pub id: GeneratorID,
    /// The region the generator feeds into
    pub region_id: RegionID,
    /// Technology category
    pub technology: Technology,
    /// Installed capacity
    pub capacity: Power,
    /// Cost per unit of energy generated
    pub marginal_cost: MoneyPerEnergy,
    /// CO2 emitted per unit of energy generated
    pub emissions_factor: EmissionsPerEnergy,
    /// Fraction of capacity available at each snapshot
    pub availability: Vec<Dimensionless>,
}
define_id_getter! {Generator, GeneratorID}

impl Generator {
    /// The maximum output at snapshot `t`
    pub fn max_output(&self, t: usize) -> Power {
        self.capacity * self.availability[t]
    }
}
