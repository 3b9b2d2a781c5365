//! Code for solving dispatch instances.
//!
//! This is used to calculate generator output, storage operation, link flows and regional prices.
use crate::error::{InfeasibleError, Shortfall, SolveFailure, SolverError};
use crate::generator::GeneratorID;
use crate::link::LinkID;
use crate::lp::{LinearProgram, Var};
use crate::network::variables::FlowVariables;
use crate::network::{DispatchConfig, OptimizationInstance};
use crate::region::RegionID;
use crate::snapshot::SnapshotSet;
use crate::solver::{LpOutcome, LpSolution, SolverBackend, SolverOptions, SolverRegistry};
use crate::storage::StorageID;
use crate::units::{Energy, Money, MoneyPerEnergy, Power};
use indexmap::IndexMap;
use log::{Level, debug, error, info, log_enabled, warn};
use serde::{Deserialize, Serialize};

/// The default cost of unserved energy used when diagnosing infeasible instances
pub const DEFAULT_VALUE_OF_LOST_LOAD: MoneyPerEnergy = MoneyPerEnergy(1e9);

/// Relative tolerance within which solved values are moved onto their bounds
const BOUND_TOLERANCE: f64 = 1e-6;

/// Constraint violation (MW for balance rows, MWh for storage rows) above which we warn
const RESIDUAL_TOLERANCE: f64 = 1e-4;

/// Options for [`solve_with_options`]
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOptions {
    /// Options passed to the backend
    pub solver: SolverOptions,
    /// Penalty on unserved energy when locating the cause of an infeasibility
    pub value_of_lost_load: MoneyPerEnergy,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            solver: SolverOptions {
                time_limit: None,
                verbose: log_enabled!(Level::Debug),
            },
            value_of_lost_load: DEFAULT_VALUE_OF_LOST_LOAD,
        }
    }
}

/// Solved operation of a storage unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageDispatch {
    /// Power drawn from the grid
    pub charge: Vec<Power>,
    /// Power delivered to the grid
    pub discharge: Vec<Power>,
    /// Energy stored at the end of each snapshot
    pub state_of_charge: Vec<Energy>,
}

/// Solved flows along a link.
///
/// Both directions are reported as power sent, before losses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkFlows {
    /// Power sent from `from_region` towards `to_region`
    pub forward: Vec<Power>,
    /// Power sent from `to_region` towards `from_region`
    pub reverse: Vec<Power>,
}

impl LinkFlows {
    /// Net power sent from `from_region` at snapshot `t`
    pub fn net(&self, t: usize) -> Power {
        self.forward[t] - self.reverse[t]
    }
}

/// The optimal dispatch, keyed by entity ID and snapshot index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    /// Total cost of the dispatch
    pub objective_value: Money,
    /// The snapshots dispatched over
    pub snapshots: SnapshotSet,
    /// The configuration the instance was built with
    pub config: DispatchConfig,
    /// Output of each generator
    pub generation: IndexMap<GeneratorID, Vec<Power>>,
    /// Operation of each storage unit (empty if storage was disabled)
    pub storage: IndexMap<StorageID, StorageDispatch>,
    /// Flows along each link (empty in single-region mode)
    pub flows: IndexMap<LinkID, LinkFlows>,
    /// Marginal price of energy in each region.
    ///
    /// In single-region mode every region gets the system price.
    pub prices: IndexMap<RegionID, Vec<MoneyPerEnergy>>,
}

/// Solve a dispatch instance with the named solver backend.
///
/// # Arguments
///
/// * `instance` - The instance, as returned by [`crate::network::build`]
/// * `solver_name` - Name of the backend (case-insensitive), e.g. `"highs"`
///
/// # Returns
///
/// The optimal dispatch, or a [`SolveFailure`] describing why there is none.
pub fn solve(
    instance: &OptimizationInstance,
    solver_name: &str,
) -> Result<DispatchResult, SolveFailure> {
    let registry = SolverRegistry::with_defaults();
    let backend = registry.get(solver_name)?;
    solve_with_options(instance, backend, &SolveOptions::default())
}

/// Solve a dispatch instance with the given backend and options
pub fn solve_with_options(
    instance: &OptimizationInstance,
    backend: &dyn SolverBackend,
    options: &SolveOptions,
) -> Result<DispatchResult, SolveFailure> {
    let solution = solve_lp(instance, backend, options)?;
    Ok(extract(instance, &solution, backend.name()))
}

/// Run the backend on an instance's linear program.
///
/// If the program is infeasible, the shortfalls which cause it are located before returning.
pub fn solve_lp(
    instance: &OptimizationInstance,
    backend: &dyn SolverBackend,
    options: &SolveOptions,
) -> Result<LpSolution, SolveFailure> {
    debug!(
        "Solving dispatch instance with {} variables and {} constraints using {}",
        instance.num_variables(),
        instance.num_constraints(),
        backend.name()
    );

    match backend.solve(&instance.lp, &options.solver)? {
        LpOutcome::Optimal(solution) => {
            check_solution_size(&instance.lp, &solution, backend.name())?;
            Ok(solution)
        }
        LpOutcome::Infeasible => {
            let err = diagnose_infeasibility(instance, backend, options);
            for shortfall in &err.shortfalls {
                warn!(
                    "Demand not met at {} in snapshot {} ({}): short by {} MW",
                    shortfall.bus,
                    shortfall.snapshot,
                    shortfall.timestamp,
                    shortfall.shortfall.value()
                );
            }
            Err(err.into())
        }
        LpOutcome::Unbounded => {
            error!("Dispatch instance is unbounded");
            Err(SolveFailure::Unbounded)
        }
    }
}

/// Turn an optimal solution from [`solve_lp`] into a [`DispatchResult`]
pub fn extract(
    instance: &OptimizationInstance,
    solution: &LpSolution,
    backend_name: &str,
) -> DispatchResult {
    let result = extract_result(instance, solution);
    info!(
        "Optimal dispatch found with {backend_name}: total cost {}",
        result.objective_value.value()
    );
    result
}

/// Check that the backend returned one value per variable and one dual per constraint
fn check_solution_size(
    lp: &LinearProgram,
    solution: &LpSolution,
    backend: &str,
) -> Result<(), SolverError> {
    if solution.columns.len() != lp.num_cols() || solution.row_duals.len() != lp.num_rows() {
        return Err(SolverError::new(
            backend,
            format!(
                "Solution has {} values and {} duals for {} variables and {} constraints",
                solution.columns.len(),
                solution.row_duals.len(),
                lp.num_cols(),
                lp.num_rows()
            ),
        ));
    }

    Ok(())
}

/// Move a value onto a bound if it lies within tolerance of it.
///
/// This removes tiny negative outputs and similar noise from the solver.
fn snap_to_bounds(value: f64, lower: f64, upper: f64) -> f64 {
    let near = |bound: f64| {
        bound.is_finite() && (value - bound).abs() <= BOUND_TOLERANCE * bound.abs().max(1.0)
    };

    if near(lower) {
        lower
    } else if near(upper) {
        upper
    } else {
        value
    }
}

/// The solved values of all variables, snapped to bounds
struct SnappedValues(Vec<f64>);

impl SnappedValues {
    fn new(lp: &LinearProgram, solution: &LpSolution) -> Self {
        Self(
            lp.columns()
                .iter()
                .zip(&solution.columns)
                .map(|(col, value)| snap_to_bounds(*value, col.lower, col.upper))
                .collect(),
        )
    }

    fn get(&self, var: Var) -> f64 {
        self.0[var.index()]
    }

    fn power(&self, vars: &[Var]) -> Vec<Power> {
        vars.iter().map(|var| Power(self.get(*var))).collect()
    }
}

/// The largest amount by which `values` fall outside the bounds of any of `rows`
fn max_violation(lp: &LinearProgram, rows: impl Iterator<Item = usize>, values: &[f64]) -> f64 {
    rows.map(|idx| {
        let row = &lp.rows()[idx];
        let activity = lp.row_activity(idx, values);
        if row.is_equality() {
            (activity - row.lower).abs()
        } else {
            (row.lower - activity).max(activity - row.upper).max(0.0)
        }
    })
    .fold(0.0, f64::max)
}

/// Warn if snapping to bounds has left the energy balance or storage constraints unmet
fn check_residuals(instance: &OptimizationInstance, values: &SnappedValues) {
    let keys = &instance.constraint_keys;
    let balance = max_violation(
        &instance.lp,
        keys.balance_keys.iter_rows().map(|(idx, _)| idx),
        &values.0,
    );
    if balance > RESIDUAL_TOLERANCE {
        warn!("Energy balance is out by up to {balance} MW in the reported dispatch");
    }

    let storage = max_violation(
        &instance.lp,
        keys.storage_keys.iter_rows().map(|(idx, _)| idx),
        &values.0,
    );
    if storage > RESIDUAL_TOLERANCE {
        warn!("Storage state of charge is out by up to {storage} MWh in the reported dispatch");
    }
}

/// Convert the solution to a [`DispatchResult`]
fn extract_result(instance: &OptimizationInstance, solution: &LpSolution) -> DispatchResult {
    let values = SnappedValues::new(&instance.lp, solution);
    check_residuals(instance, &values);
    let variables = &instance.variables;

    let generation = variables
        .generation
        .iter()
        .map(|(id, vars)| (id.clone(), values.power(vars)))
        .collect();

    let storage = variables
        .storage
        .iter()
        .map(|(id, vars)| {
            let dispatch = StorageDispatch {
                charge: values.power(&vars.charge),
                discharge: values.power(&vars.discharge),
                state_of_charge: vars
                    .state_of_charge
                    .iter()
                    .map(|var| Energy(values.get(*var)))
                    .collect(),
            };
            (id.clone(), dispatch)
        })
        .collect();

    let flows = variables
        .flows
        .iter()
        .map(|(id, vars)| {
            let flows = match vars {
                FlowVariables::Bidirectional(vars) => {
                    let net = values.power(vars);
                    LinkFlows {
                        forward: net.iter().map(|flow| flow.max(Power(0.0))).collect(),
                        reverse: net.iter().map(|flow| (-*flow).max(Power(0.0))).collect(),
                    }
                }
                FlowVariables::Directional { forward, reverse } => LinkFlows {
                    forward: values.power(forward),
                    reverse: values.power(reverse),
                },
            };
            (id.clone(), flows)
        })
        .collect();

    // Prices are the duals of the balance constraints, per unit of energy
    let hours = instance.snapshots.duration();
    let mut bus_prices = IndexMap::new();
    for ((bus, t), dual) in instance
        .constraint_keys
        .balance_keys
        .zip_duals(&solution.row_duals)
    {
        bus_prices
            .entry(bus.clone())
            .or_insert_with(|| vec![MoneyPerEnergy(0.0); instance.snapshots.len()])[*t] =
            MoneyPerEnergy(dual / hours.value());
    }
    let prices = instance
        .buses
        .iter()
        .map(|(region_id, bus)| (region_id.clone(), bus_prices[bus].clone()))
        .collect();

    DispatchResult {
        objective_value: Money(instance.lp.objective_value(&values.0)),
        snapshots: instance.snapshots.clone(),
        config: instance.config,
        generation,
        storage,
        flows,
        prices,
    }
}

/// Find where supply falls short by re-solving with a lost-load slack on every balance row.
///
/// If the relaxed instance cannot be solved either, no shortfalls are reported.
fn diagnose_infeasibility(
    instance: &OptimizationInstance,
    backend: &dyn SolverBackend,
    options: &SolveOptions,
) -> InfeasibleError {
    let hours = instance.snapshots.duration();
    let cost = options.value_of_lost_load.value() * hours.value();

    let mut lp = instance.lp.clone();
    let slacks: Vec<_> = instance
        .constraint_keys
        .balance_keys
        .iter_rows()
        .map(|(row, key)| {
            let var = lp.add_column(cost, 0.0, f64::INFINITY);
            lp.add_term(row, var, 1.0);
            (var, key)
        })
        .collect();

    let solution = match backend.solve(&lp, &options.solver) {
        Ok(LpOutcome::Optimal(solution)) if solution.columns.len() == lp.num_cols() => solution,
        outcome => {
            warn!("Could not locate cause of infeasibility: relaxed instance gave {outcome:?}");
            return InfeasibleError::default();
        }
    };

    let shortfalls = slacks
        .into_iter()
        .filter_map(|(var, (bus, t))| {
            let value = solution.columns[var.index()];
            (value > BOUND_TOLERANCE).then(|| Shortfall {
                bus: bus.to_string(),
                snapshot: *t,
                timestamp: instance.snapshots.timestamps()[*t],
                shortfall: Power(value),
            })
        })
        .collect();

    InfeasibleError { shortfalls }
}
