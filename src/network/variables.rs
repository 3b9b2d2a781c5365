//! Code for adding decision variables to a dispatch instance.
use super::DispatchConfig;
use crate::generator::GeneratorID;
use crate::link::LinkID;
use crate::lp::{LinearProgram, Var};
use crate::snapshot::SnapshotSet;
use crate::storage::StorageID;
use crate::topology::Topology;
use indexmap::IndexMap;

/// Variables for a single storage unit, one per snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct StorageVariables {
    /// Power drawn from the grid
    pub charge: Vec<Var>,
    /// Power delivered to the grid
    pub discharge: Vec<Var>,
    /// Energy stored at the end of each snapshot
    pub state_of_charge: Vec<Var>,
}

/// Variables for a single link, one per snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum FlowVariables {
    /// A lossless link has one signed flow variable, positive from `from_region` to `to_region`
    Bidirectional(Vec<Var>),
    /// A lossy link has one non-negative variable for each direction
    Directional {
        /// Flow sent from `from_region` towards `to_region`
        forward: Vec<Var>,
        /// Flow sent from `to_region` towards `from_region`
        reverse: Vec<Var>,
    },
}

/// A map for easy lookup of variables in the problem.
///
/// The entries are ordered (see [`IndexMap`]).
///
/// We use this data structure for two things:
///
/// 1. In order define constraints for the optimisation
/// 2. To keep track of the entity and snapshot that each variable corresponds to, for when we are
///    reading the results of the optimisation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableMap {
    /// Generator output, by generator and snapshot
    pub generation: IndexMap<GeneratorID, Vec<Var>>,
    /// Storage variables, by storage unit
    pub storage: IndexMap<StorageID, StorageVariables>,
    /// Flow variables, by link
    pub flows: IndexMap<LinkID, FlowVariables>,
}

/// Add variables to the problem.
///
/// Objective coefficients are costs per snapshot, so each power variable is weighted by the
/// snapshot duration. Storage variables are only added if storage is enabled and link variables
/// only in multi-region mode.
pub fn add_variables(
    lp: &mut LinearProgram,
    topology: &Topology,
    snapshots: &SnapshotSet,
    config: &DispatchConfig,
) -> VariableMap {
    let hours = snapshots.duration();
    let mut variables = VariableMap::default();

    for generator in topology.generators().values() {
        let cost = generator.marginal_cost.value() * hours.value();
        let vars = (0..snapshots.len())
            .map(|t| lp.add_column(cost, 0.0, generator.max_output(t).value()))
            .collect();
        variables.generation.insert(generator.id.clone(), vars);
    }

    if config.include_storage {
        for unit in topology.storage_units().values() {
            let power = unit.power_capacity.value();
            let dispatch_cost = unit.marginal_cost.value() * hours.value();
            let mut charge = Vec::with_capacity(snapshots.len());
            let mut discharge = Vec::with_capacity(snapshots.len());
            let mut state_of_charge = Vec::with_capacity(snapshots.len());
            for _ in 0..snapshots.len() {
                charge.push(lp.add_column(0.0, 0.0, power));
                discharge.push(lp.add_column(dispatch_cost, 0.0, power));
                state_of_charge.push(lp.add_column(0.0, 0.0, unit.energy_capacity.value()));
            }

            variables.storage.insert(
                unit.id.clone(),
                StorageVariables {
                    charge,
                    discharge,
                    state_of_charge,
                },
            );
        }
    }

    if config.multi_region {
        for link in topology.links().values() {
            let capacity = link.capacity.value();
            let reverse_limit = link.reverse_limit().value();
            let flow_vars = if link.is_lossless() {
                FlowVariables::Bidirectional(
                    (0..snapshots.len())
                        .map(|_| lp.add_column(0.0, -reverse_limit, capacity))
                        .collect(),
                )
            } else {
                let mut forward = Vec::with_capacity(snapshots.len());
                let mut reverse = Vec::with_capacity(snapshots.len());
                for _ in 0..snapshots.len() {
                    forward.push(lp.add_column(0.0, 0.0, capacity));
                    reverse.push(lp.add_column(0.0, 0.0, reverse_limit));
                }
                FlowVariables::Directional { forward, reverse }
            };
            variables.flows.insert(link.id.clone(), flow_vars);
        }
    }

    variables
}
