//! Summaries of a solved dispatch.
//!
//! These are pure functions over a [`DispatchResult`] and the [`Topology`] it was solved for. The
//! result must come from an instance built from the same topology.
use crate::generator::{GeneratorID, Technology};
use crate::optimisation::DispatchResult;
use crate::region::RegionID;
use crate::storage::StorageID;
use crate::topology::Topology;
use crate::units::{
    Dimensionless, Emissions, EmissionsPerEnergy, Energy, Money, MoneyPerEnergy, Power,
};
use chrono::Datelike;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use strum::IntoEnumIterator;

/// Generation from all units of one technology
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnologyGeneration {
    /// Output summed over units, per snapshot
    pub series: Vec<Power>,
    /// Energy generated over the horizon
    pub total: Energy,
    /// Highest output in any snapshot
    pub peak: Power,
    /// Installed capacity
    pub capacity: Power,
    /// Energy generated as a fraction of what installed capacity could produce
    pub capacity_factor: Dimensionless,
}

/// Generation by technology
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationSummary {
    /// Technologies with at least one generator, in a fixed order
    pub by_technology: IndexMap<Technology, TechnologyGeneration>,
    /// Energy generated by all units
    pub total: Energy,
}

/// Sum per-snapshot output across generators, grouped by technology
fn technology_series(
    result: &DispatchResult,
    topology: &Topology,
) -> IndexMap<Technology, Vec<Power>> {
    let n = result.snapshots.len();
    let mut series: IndexMap<Technology, Vec<Power>> = Technology::iter()
        .filter(|tech| {
            topology
                .generators()
                .values()
                .any(|generator| generator.technology == *tech)
        })
        .map(|tech| (tech, vec![Power(0.0); n]))
        .collect();

    for (id, output) in &result.generation {
        let technology = topology.generators()[id].technology;
        for (total, value) in series[&technology].iter_mut().zip(output) {
            *total += *value;
        }
    }

    series
}

/// Generation per technology: totals, per-snapshot series, peaks and capacity factors
pub fn generation_summary(result: &DispatchResult, topology: &Topology) -> GenerationSummary {
    let hours = result.snapshots.duration();
    let horizon = result.snapshots.total_duration();

    let by_technology: IndexMap<_, _> = technology_series(result, topology)
        .into_iter()
        .map(|(technology, series)| {
            let total = series.iter().copied().sum::<Power>() * hours;
            let peak = series.iter().copied().fold(Power(0.0), Power::max);
            let capacity = topology
                .generators()
                .values()
                .filter(|generator| generator.technology == technology)
                .map(|generator| generator.capacity)
                .sum::<Power>();
            // A technology made up only of zero-capacity units has nothing to compare against
            let capacity_factor = if capacity > Power(0.0) {
                total / (capacity * horizon)
            } else {
                Dimensionless(0.0)
            };
            let summary = TechnologyGeneration {
                series,
                total,
                peak,
                capacity,
                capacity_factor,
            };
            (technology, summary)
        })
        .collect();

    let total = by_technology.values().map(|tech| tech.total).sum();
    GenerationSummary {
        by_technology,
        total,
    }
}

/// CO2 emissions from generation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmissionsSummary {
    /// Total emissions over the horizon
    pub total: Emissions,
    /// Emissions of each generator
    pub by_generator: IndexMap<GeneratorID, Emissions>,
    /// Emissions of each technology present
    pub by_technology: IndexMap<Technology, Emissions>,
    /// Emissions per unit of demand served, if there is any demand
    pub intensity: Option<EmissionsPerEnergy>,
}

/// Total emissions: the sum over generators and snapshots of output times emissions factor
pub fn emissions_summary(result: &DispatchResult, topology: &Topology) -> EmissionsSummary {
    let hours = result.snapshots.duration();

    let by_generator: IndexMap<_, _> = result
        .generation
        .iter()
        .map(|(id, output)| {
            let factor = topology.generators()[id].emissions_factor;
            let emissions = output.iter().map(|value| factor * (*value * hours)).sum();
            (id.clone(), emissions)
        })
        .collect();

    let mut by_technology: IndexMap<Technology, Emissions> = IndexMap::new();
    for (id, emissions) in &by_generator {
        *by_technology
            .entry(topology.generators()[id].technology)
            .or_default() += *emissions;
    }
    by_technology.sort_keys();

    let total: Emissions = by_generator.values().copied().sum();
    let demand = total_demand(result, topology);
    let intensity = (demand > Energy(0.0)).then(|| total / demand);

    EmissionsSummary {
        total,
        by_generator,
        by_technology,
        intensity,
    }
}

/// Demand summed over all regions and snapshots
fn total_demand(result: &DispatchResult, topology: &Topology) -> Energy {
    let hours = result.snapshots.duration();
    (0..result.snapshots.len())
        .map(|t| topology.total_demand_at(t) * hours)
        .sum()
}

/// Operation of a single storage unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageUnitSummary {
    /// Energy stored at the end of each snapshot
    pub state_of_charge: Vec<Energy>,
    /// Energy drawn from the grid
    pub charged: Energy,
    /// Energy delivered to the grid (the energy cycled through the unit)
    pub discharged: Energy,
}

impl StorageUnitSummary {
    /// Energy drawn from the grid which was not delivered back.
    ///
    /// For cyclic operation this is the energy lost to conversion.
    pub fn net_consumption(&self) -> Energy {
        self.charged - self.discharged
    }
}

/// Storage operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageSummary {
    /// Summary for each unit
    pub by_unit: IndexMap<StorageID, StorageUnitSummary>,
    /// Energy cycled through all units
    pub total_discharged: Energy,
    /// Energy drawn from the grid by all units
    pub total_charged: Energy,
}

/// State-of-charge trajectories and cycled energy for each storage unit
pub fn storage_summary(result: &DispatchResult) -> StorageSummary {
    let hours = result.snapshots.duration();
    let by_unit: IndexMap<_, _> = result
        .storage
        .iter()
        .map(|(id, dispatch)| {
            let summary = StorageUnitSummary {
                state_of_charge: dispatch.state_of_charge.clone(),
                charged: dispatch.charge.iter().copied().sum::<Power>() * hours,
                discharged: dispatch.discharge.iter().copied().sum::<Power>() * hours,
            };
            (id.clone(), summary)
        })
        .collect();

    StorageSummary {
        total_discharged: by_unit.values().map(|unit| unit.discharged).sum(),
        total_charged: by_unit.values().map(|unit| unit.charged).sum(),
        by_unit,
    }
}

/// Energy exchanged by one region over links
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionFlows {
    /// Net power received (after losses) minus power sent, per snapshot
    pub net_import_series: Vec<Power>,
    /// Energy received, after losses
    pub imports: Energy,
    /// Energy sent
    pub exports: Energy,
}

impl RegionFlows {
    /// Energy received minus energy sent
    pub fn net_import(&self) -> Energy {
        self.imports - self.exports
    }
}

/// Inter-regional exchange
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowSummary {
    /// Exchange for every region, in topology order
    pub by_region: IndexMap<RegionID, RegionFlows>,
    /// Energy lost in transit
    pub losses: Energy,
}

/// Net imports and exports per region.
///
/// Returns `None` for single-region dispatch, where there are no flows.
pub fn flow_summary(result: &DispatchResult, topology: &Topology) -> Option<FlowSummary> {
    if !result.config.multi_region {
        return None;
    }

    let n = result.snapshots.len();
    let hours = result.snapshots.duration();
    let mut imports: IndexMap<&RegionID, Vec<Power>> = topology
        .regions()
        .keys()
        .map(|id| (id, vec![Power(0.0); n]))
        .collect();
    let mut exports = imports.clone();

    for (id, flows) in &result.flows {
        let link = &topology.links()[id];
        let delivered = link.delivery_factor();
        for t in 0..n {
            let (forward, reverse) = (flows.forward[t], flows.reverse[t]);
            exports[&link.from_region][t] += forward;
            imports[&link.to_region][t] += forward * delivered;
            exports[&link.to_region][t] += reverse;
            imports[&link.from_region][t] += reverse * delivered;
        }
    }

    let by_region: IndexMap<_, _> = imports
        .into_iter()
        .zip(exports.into_values())
        .map(|((id, imports), exports)| {
            let flows = RegionFlows {
                net_import_series: imports
                    .iter()
                    .zip(&exports)
                    .map(|(import, export)| *import - *export)
                    .collect(),
                imports: imports.into_iter().sum::<Power>() * hours,
                exports: exports.into_iter().sum::<Power>() * hours,
            };
            (id.clone(), flows)
        })
        .collect();

    let losses = by_region
        .values()
        .map(|flows| flows.exports - flows.imports)
        .sum();

    Some(FlowSummary { by_region, losses })
}

/// Available variable renewable energy which was not used
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurtailmentSummary {
    /// Curtailed energy for each variable renewable technology present
    pub by_technology: IndexMap<Technology, Energy>,
    /// Curtailed energy across all technologies
    pub total: Energy,
    /// Curtailed energy as a fraction of available variable renewable energy
    pub share: Dimensionless,
}

/// Curtailment of solar and wind: available output minus actual output
pub fn curtailment_summary(result: &DispatchResult, topology: &Topology) -> CurtailmentSummary {
    let hours = result.snapshots.duration();
    let mut by_technology: IndexMap<Technology, Energy> = IndexMap::new();
    let mut available = Energy(0.0);

    for (id, output) in &result.generation {
        let generator = &topology.generators()[id];
        if !generator.technology.is_variable_renewable() {
            continue;
        }

        for (t, value) in output.iter().enumerate() {
            let max_output = generator.max_output(t);
            available += max_output * hours;
            *by_technology.entry(generator.technology).or_default() +=
                (max_output - *value).max(Power(0.0)) * hours;
        }
    }
    by_technology.sort_keys();

    let total: Energy = by_technology.values().copied().sum();
    let share = if available > Energy(0.0) {
        total / available
    } else {
        Dimensionless(0.0)
    };

    CurtailmentSummary {
        by_technology,
        total,
        share,
    }
}

/// Breakdown of the dispatch cost
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostSummary {
    /// Total cost (the objective value)
    pub total: Money,
    /// Cost of generator output
    pub generation: Money,
    /// Cost of storage discharge
    pub storage: Money,
    /// Total cost per unit of demand, if there is any demand
    pub average_cost: Option<MoneyPerEnergy>,
}

/// Cost of generation and storage, and average cost per unit of demand
pub fn cost_summary(result: &DispatchResult, topology: &Topology) -> CostSummary {
    let hours = result.snapshots.duration();

    let generation: Money = result
        .generation
        .iter()
        .map(|(id, output)| {
            let cost = topology.generators()[id].marginal_cost;
            output.iter().map(|value| cost * (*value * hours)).sum::<Money>()
        })
        .sum();

    let storage: Money = result
        .storage
        .iter()
        .map(|(id, dispatch)| {
            let cost = topology.storage_units()[id].marginal_cost;
            dispatch
                .discharge
                .iter()
                .map(|value| cost * (*value * hours))
                .sum::<Money>()
        })
        .sum();

    let total = generation + storage;
    let demand = total_demand(result, topology);
    CostSummary {
        total,
        generation,
        storage,
        average_cost: (demand > Energy(0.0)).then(|| total / demand),
    }
}

/// A calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Month {
    /// Calendar year
    pub year: i32,
    /// Month of the year, starting at 1
    pub month: u32,
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// Energy generated by each technology in each calendar month covered by the snapshots
pub fn monthly_generation(
    result: &DispatchResult,
    topology: &Topology,
) -> IndexMap<Month, IndexMap<Technology, Energy>> {
    let hours = result.snapshots.duration();
    let series = technology_series(result, topology);

    let mut months: IndexMap<Month, IndexMap<Technology, Energy>> = IndexMap::new();
    for (t, timestamp) in result.snapshots.iter().enumerate() {
        let month = Month {
            year: timestamp.year(),
            month: timestamp.month(),
        };
        let by_technology = months.entry(month).or_default();
        for (technology, output) in &series {
            *by_technology.entry(*technology).or_default() += output[t] * hours;
        }
    }

    months
}
