//! Functionality for running a dispatch from start to finish.
use crate::error::{DispatchError, Phase};
use crate::export::{NETWORK_FILE_NAME, export_network};
use crate::model::Model;
use crate::network::{DispatchConfig, build};
use crate::optimisation::{DispatchResult, SolveOptions, extract, solve_lp};
use crate::output::metadata::write_metadata;
use crate::output::write_results;
use crate::snapshot::SnapshotSet;
use crate::solver::{SolverBackend, SolverRegistry};
use crate::topology::Topology;
use anyhow::Result;
use log::info;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A flag which another thread can set to stop a run at the next phase boundary
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create a token which has not been cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Fail with [`DispatchError::Cancelled`] if cancellation has been requested
    fn check(&self, phase: Phase) -> Result<(), DispatchError> {
        if self.is_cancelled() {
            info!("Run cancelled before {phase} phase");
            Err(DispatchError::Cancelled(phase))
        } else {
            Ok(())
        }
    }
}

/// Build, solve and extract a dispatch.
///
/// `token` is checked before each of the three phases.
pub fn dispatch(
    topology: &Topology,
    snapshots: &SnapshotSet,
    config: &DispatchConfig,
    backend: &dyn SolverBackend,
    options: &SolveOptions,
    token: &CancellationToken,
) -> Result<DispatchResult, DispatchError> {
    token.check(Phase::Build)?;
    let instance = build(topology, snapshots, config)?;

    token.check(Phase::Solve)?;
    let solution = solve_lp(&instance, backend, options)?;

    token.check(Phase::Extract)?;
    Ok(extract(&instance, &solution, backend.name()))
}

/// Options for [`run`] which override the model parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    /// Solver backend to use instead of the one named in the model
    pub solver: Option<String>,
    /// Whether to leave storage out of the dispatch
    pub no_storage: bool,
    /// Whether to build the instance without solving it
    pub no_solve: bool,
    /// Whether to export the solved network to JSON
    pub export: bool,
}

/// Run the dispatch for a model and write the results.
///
/// # Arguments
///
/// * `model` - The model to run
/// * `output_path` - The folder to which output files will be written
/// * `opts` - Run options
/// * `token` - Checked before each phase of the dispatch
///
/// # Returns
///
/// The dispatch, or `None` if `opts.no_solve` is set.
pub fn run(
    model: &Model,
    output_path: &Path,
    opts: &RunOptions,
    token: &CancellationToken,
) -> Result<Option<DispatchResult>> {
    let solver = opts.solver.as_deref().unwrap_or(&model.parameters.solver);
    let registry = SolverRegistry::with_defaults();
    let backend = registry.get(solver)?;

    let mut config = model.dispatch_config();
    if opts.no_storage {
        config.include_storage = false;
    }

    if opts.no_solve {
        let instance = build(&model.topology, &model.snapshots, &config)?;
        info!(
            "Built dispatch instance with {} variables and {} constraints; skipping solve",
            instance.num_variables(),
            instance.num_constraints()
        );
        return Ok(None);
    }

    let result = dispatch(
        &model.topology,
        &model.snapshots,
        &config,
        backend,
        &model.solve_options(),
        token,
    )?;

    write_metadata(output_path, &model.model_path, backend.name())?;
    write_results(output_path, &result, &model.topology)?;
    if opts.export {
        export_network(&output_path.join(NETWORK_FILE_NAME), &model.topology, &result)?;
    }

    Ok(Some(result))
}
