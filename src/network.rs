//! Builds dispatch optimisation instances from a topology, a snapshot set and a configuration.
//!
//! Each instance is a linear program with:
//!
//! * one output variable per generator and snapshot, bounded by capacity times availability
//! * charge, discharge and state-of-charge variables per storage unit and snapshot (if enabled)
//! * one flow variable per link and snapshot (two for lossy links), in multi-region mode only
//! * one energy balance equality per bus and snapshot
//! * one state-of-charge recurrence per storage unit and snapshot
//!
//! The objective is total generation and storage dispatch cost, which is minimised.
use crate::error::ConfigurationError;
use crate::graph::find_islands;
use crate::lp::LinearProgram;
use crate::region::RegionID;
use crate::snapshot::SnapshotSet;
use crate::topology::Topology;
use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod constraints;
use constraints::{ConstraintKeys, add_constraints};
pub mod variables;
use variables::{VariableMap, add_variables};

/// Options controlling how an instance is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Whether each region gets its own balance (otherwise all regions form one system balance)
    pub multi_region: bool,
    /// Whether storage units are dispatched
    pub include_storage: bool,
    /// Whether storage must end the horizon where it started
    pub storage_cyclic: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            multi_region: false,
            include_storage: true,
            storage_cyclic: true,
        }
    }
}

/// A node with its own energy balance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bus {
    /// A single region, in multi-region mode
    Region(RegionID),
    /// All regions together, in single-region mode
    System,
}

impl fmt::Display for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Region(id) => write!(f, "{id}"),
            Self::System => write!(f, "system"),
        }
    }
}

/// The bus each region belongs to
pub type BusMap = IndexMap<RegionID, Bus>;

/// A fully specified dispatch problem, ready to be solved.
///
/// The contents are only interpreted by [`crate::optimisation::solve`].
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationInstance {
    pub(crate) lp: LinearProgram,
    pub(crate) variables: VariableMap,
    pub(crate) constraint_keys: ConstraintKeys,
    pub(crate) buses: BusMap,
    pub(crate) snapshots: SnapshotSet,
    pub(crate) config: DispatchConfig,
}

impl OptimizationInstance {
    /// The number of decision variables
    pub fn num_variables(&self) -> usize {
        self.lp.num_cols()
    }

    /// The number of constraints
    pub fn num_constraints(&self) -> usize {
        self.lp.num_rows()
    }

    /// The snapshots the instance covers
    pub fn snapshots(&self) -> &SnapshotSet {
        &self.snapshots
    }

    /// The configuration the instance was built with
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }
}

/// Check that the configuration can be applied to this topology and snapshot set
fn check_inputs(
    topology: &Topology,
    snapshots: &SnapshotSet,
    config: &DispatchConfig,
) -> Result<(), ConfigurationError> {
    let n_regions = topology.regions().len();
    if config.multi_region && n_regions < 2 {
        return Err(ConfigurationError::new(
            "dispatch configuration",
            "multi_region",
            format!("requires at least two regions, but the topology has {n_regions}"),
        ));
    }

    for generator in topology.generators().values() {
        snapshots.check_aligned(
            format_args!("generator {}", generator.id),
            "availability",
            generator.availability.len(),
        )?;
    }

    for (region_id, profile) in topology.demand() {
        snapshots.check_aligned(format_args!("region {region_id}"), "demand", profile.len())?;
    }

    if config.include_storage {
        for unit in topology.storage_units().values() {
            for (field, value) in [
                ("efficiency_store", unit.efficiency_store),
                ("efficiency_dispatch", unit.efficiency_dispatch),
            ] {
                if value.value() > 1.0 {
                    return Err(ConfigurationError::new(
                        format_args!("storage unit {}", unit.id),
                        field,
                        format!("must be in the range (0, 1], got {}", value.value()),
                    ));
                }
            }
        }
    }

    Ok(())
}

/// Assign each region to a bus
fn assign_buses(topology: &Topology, multi_region: bool) -> BusMap {
    topology
        .regions()
        .keys()
        .map(|id| {
            let bus = if multi_region {
                Bus::Region(id.clone())
            } else {
                Bus::System
            };
            (id.clone(), bus)
        })
        .collect()
}

/// Build an optimisation instance.
///
/// # Arguments
///
/// * `topology` - The validated topology
/// * `snapshots` - The snapshots to dispatch over. Every time series in `topology` must have one
///   value per snapshot.
/// * `config` - Build options
///
/// # Returns
///
/// An instance which can be passed to [`crate::optimisation::solve`], or a
/// [`ConfigurationError`] if the inputs are inconsistent with each other.
pub fn build(
    topology: &Topology,
    snapshots: &SnapshotSet,
    config: &DispatchConfig,
) -> Result<OptimizationInstance, ConfigurationError> {
    check_inputs(topology, snapshots, config)?;

    if config.multi_region {
        let islands = find_islands(topology);
        if islands.len() > 1 {
            warn!(
                "Network is split into {} islands which cannot exchange power: {}",
                islands.len(),
                islands
                    .iter()
                    .map(|island| format!("[{}]", island.iter().join(", ")))
                    .join(", ")
            );
        }
    } else if !topology.links().is_empty() {
        debug!("Single-region mode: ignoring {} link(s)", topology.links().len());
    }

    let buses = assign_buses(topology, config.multi_region);

    let mut lp = LinearProgram::default();
    let variables = add_variables(&mut lp, topology, snapshots, config);
    let constraint_keys = add_constraints(
        &mut lp,
        &variables,
        topology,
        snapshots,
        &buses,
        config.storage_cyclic,
    );

    debug!(
        "Built dispatch instance with {} variables, {} constraints and {} non-zeros",
        lp.num_cols(),
        lp.num_rows(),
        lp.num_nonzeros()
    );

    Ok(OptimizationInstance {
        lp,
        variables,
        constraint_keys,
        buses,
        snapshots: snapshots.clone(),
        config: *config,
    })
}
