//! Solver backends for linear programs.
//!
//! The rest of the program only talks to solvers through the [`SolverBackend`] trait, so which
//! solver is used is a configuration string rather than a hard-coded dependency.
use crate::error::SolverError;
use crate::lp::LinearProgram;
use highs::{HighsModelStatus, RowProblem, Sense};
use indexmap::IndexMap;

/// The name of the default solver backend
pub const DEFAULT_SOLVER: &str = "highs";

/// Options passed through to the solver backend
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolverOptions {
    /// Maximum solve time in seconds
    pub time_limit: Option<f64>,
    /// Whether the backend should print its own log
    pub verbose: bool,
}

/// An optimal solution to a [`LinearProgram`]
#[derive(Debug, Clone, PartialEq)]
pub struct LpSolution {
    /// Value of the objective function
    pub objective_value: f64,
    /// Value of each variable, in column order
    pub columns: Vec<f64>,
    /// Dual value of each constraint, in row order
    pub row_duals: Vec<f64>,
}

/// The result of a solve which the backend completed normally
#[derive(Debug, Clone, PartialEq)]
pub enum LpOutcome {
    /// An optimal solution was found
    Optimal(LpSolution),
    /// The constraints cannot all be satisfied
    Infeasible,
    /// The objective can be decreased without limit
    Unbounded,
}

/// A linear programming solver
pub trait SolverBackend {
    /// The name used to select this backend (lower case)
    fn name(&self) -> &'static str;

    /// Minimise the given linear program.
    ///
    /// Failures inside the backend (timeouts, numerical trouble) are returned as [`SolverError`]s.
    fn solve(&self, lp: &LinearProgram, options: &SolverOptions) -> Result<LpOutcome, SolverError>;
}

/// The HiGHS solver
#[derive(Debug, Default, Clone, Copy)]
pub struct HighsBackend;

impl HighsBackend {
    /// Handle the case where HiGHS has no columns to optimise
    fn solve_empty(lp: &LinearProgram) -> LpOutcome {
        // With no variables every row's activity is zero
        if lp.rows().iter().all(|row| row.lower <= 0.0 && 0.0 <= row.upper) {
            LpOutcome::Optimal(LpSolution {
                objective_value: 0.0,
                columns: Vec::new(),
                row_duals: vec![0.0; lp.num_rows()],
            })
        } else {
            LpOutcome::Infeasible
        }
    }
}

impl SolverBackend for HighsBackend {
    fn name(&self) -> &'static str {
        "highs"
    }

    fn solve(&self, lp: &LinearProgram, options: &SolverOptions) -> Result<LpOutcome, SolverError> {
        let mut problem = RowProblem::default();
        let cols: Vec<_> = lp
            .columns()
            .iter()
            .map(|col| problem.add_column(col.cost, col.lower..=col.upper))
            .collect();
        for row in lp.rows() {
            problem.add_row(
                row.lower..=row.upper,
                row.terms
                    .iter()
                    .map(|(var, coeff)| (cols[var.index()], *coeff)),
            );
        }

        let mut model = problem.optimise(Sense::Minimise);
        model.set_option("output_flag", options.verbose);
        model.set_option("log_to_console", options.verbose);
        if let Some(time_limit) = options.time_limit {
            model.set_option("time_limit", time_limit);
        }

        let solved = model.try_solve().map_err(|status| {
            SolverError::new(self.name(), format!("HiGHS failed to run: {status:?}"))
        })?;

        match solved.status() {
            HighsModelStatus::Optimal => {
                let solution = solved.get_solution();
                let columns = solution.columns().to_vec();
                Ok(LpOutcome::Optimal(LpSolution {
                    objective_value: lp.objective_value(&columns),
                    columns,
                    row_duals: solution.dual_rows().to_vec(),
                }))
            }
            HighsModelStatus::Infeasible | HighsModelStatus::UnboundedOrInfeasible => {
                Ok(LpOutcome::Infeasible)
            }
            HighsModelStatus::Unbounded => Ok(LpOutcome::Unbounded),
            HighsModelStatus::ModelEmpty => Ok(Self::solve_empty(lp)),
            status => Err(SolverError::new(
                self.name(),
                format!("HiGHS finished with status {status:?}"),
            )),
        }
    }
}

/// Holds the available solver backends, keyed by name.
///
/// Create with [`SolverRegistry::with_defaults`] for the built-in backends.
#[derive(Default)]
pub struct SolverRegistry {
    backends: IndexMap<String, Box<dyn SolverBackend>>,
}

impl SolverRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry containing the built-in backends
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(HighsBackend));
        registry
    }

    /// Register a backend, replacing any existing backend of the same name
    pub fn register(&mut self, backend: Box<dyn SolverBackend>) {
        self.backends.insert(backend.name().to_string(), backend);
    }

    /// Look up a backend by name (case-insensitive)
    pub fn get(&self, name: &str) -> Result<&dyn SolverBackend, SolverError> {
        self.backends
            .get(&name.to_ascii_lowercase())
            .map(|backend| &**backend)
            .ok_or_else(|| {
                SolverError::new(
                    name,
                    format!(
                        "Unknown solver backend. Available backends: {}",
                        self.names().collect::<Vec<_>>().join(", ")
                    ),
                )
            })
    }

    /// Names of the registered backends
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.backends.keys().map(String::as_str)
    }
}
