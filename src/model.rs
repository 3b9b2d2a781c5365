//! The model: everything read from a model directory that is needed to run a dispatch.
use crate::network::DispatchConfig;
use crate::optimisation::SolveOptions;
use crate::snapshot::SnapshotSet;
use crate::solver::SolverOptions;
use crate::topology::Topology;
use std::path::PathBuf;

pub mod parameters;
pub use parameters::ModelParameters;

/// Model definition
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    /// Path to the model folder
    pub model_path: PathBuf,
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// The snapshots to dispatch over
    pub snapshots: SnapshotSet,
    /// Regions, units, links and demand
    pub topology: Topology,
}

impl Model {
    /// The options used to build the optimisation instance
    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            multi_region: self.parameters.multi_region,
            include_storage: self.parameters.include_storage,
            storage_cyclic: self.parameters.storage_cyclic,
        }
    }

    /// The options passed to the solver
    pub fn solve_options(&self) -> SolveOptions {
        let defaults = SolveOptions::default();
        SolveOptions {
            solver: SolverOptions {
                time_limit: self.parameters.solver_time_limit,
                ..defaults.solver
            },
            value_of_lost_load: self.parameters.value_of_lost_load,
        }
    }
}
