//! Error types for building and solving dispatch problems.
//!
//! The core reports three kinds of failure: a configuration is malformed
//! ([`ConfigurationError`]), no dispatch can satisfy the energy balance ([`InfeasibleError`]) or
//! the solver backend itself fails ([`SolverError`]). None of these carry `Rc`s so they can be
//! converted into [`anyhow::Error`] by callers.
use crate::units::Power;
use chrono::NaiveDateTime;
use std::fmt;
use thiserror::Error;

/// A malformed or inconsistent topology, snapshot set or configuration
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid {field} for {entity}: {reason}")]
pub struct ConfigurationError {
    /// The offending entity (e.g. `generator coal_1`)
    pub entity: String,
    /// The offending field
    pub field: String,
    /// What is wrong with it
    pub reason: String,
}

impl ConfigurationError {
    /// Create a new [`ConfigurationError`]
    pub fn new(entity: impl fmt::Display, field: &str, reason: impl Into<String>) -> Self {
        Self {
            entity: entity.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Supply falling short of demand at one bus and snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Shortfall {
    /// The bus (region or whole system) where demand could not be met
    pub bus: String,
    /// Index of the snapshot
    pub snapshot: usize,
    /// Timestamp of the snapshot
    pub timestamp: NaiveDateTime,
    /// The average unmet power over the snapshot
    pub shortfall: Power,
}

/// The energy balance cannot be satisfied
#[derive(Debug, Clone, PartialEq, Default, Error)]
#[error("No dispatch satisfies the energy balance{}", describe_shortfalls(.shortfalls))]
pub struct InfeasibleError {
    /// Where supply falls short, if this could be determined
    pub shortfalls: Vec<Shortfall>,
}

/// Where supply first falls short, or nothing if the location is unknown
fn describe_shortfalls(shortfalls: &[Shortfall]) -> String {
    let Some(first) = shortfalls.first() else {
        return String::new();
    };

    format!(
        ": supply falls short at {} bus/snapshot pair(s), starting with {} at snapshot {} ({}) by \
        {} MW",
        shortfalls.len(),
        first.bus,
        first.snapshot,
        first.timestamp,
        first.shortfall.value()
    )
}

/// A failure inside the solver backend (timeout, numerical trouble, unknown backend, ...)
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Solver backend '{backend}' failed: {message}")]
pub struct SolverError {
    /// Name of the backend
    pub backend: String,
    /// The backend's diagnostic, passed through verbatim
    pub message: String,
}

impl SolverError {
    /// Create a new [`SolverError`]
    pub fn new(backend: &str, message: impl Into<String>) -> Self {
        Self {
            backend: backend.to_string(),
            message: message.into(),
        }
    }
}

/// The ways in which solving a dispatch instance can fail
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveFailure {
    /// No feasible dispatch exists
    #[error(transparent)]
    Infeasible(#[from] InfeasibleError),
    /// The objective is unbounded, which indicates a bug in problem construction
    #[error("Dispatch problem is unbounded; all variables should be bounded, so this is a bug")]
    Unbounded,
    /// The backend failed
    #[error(transparent)]
    Solver(#[from] SolverError),
}

/// A stage of the dispatch pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum Phase {
    /// Building the optimisation instance
    #[display("build")]
    Build,
    /// Solving the instance
    #[display("solve")]
    Solve,
    /// Extracting summaries from the result
    #[display("extract")]
    Extract,
}

/// Any failure in the end-to-end dispatch pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    /// The inputs are malformed
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// The instance could not be solved
    #[error(transparent)]
    Solve(#[from] SolveFailure),
    /// The run was cancelled before the given phase started
    #[error("Run cancelled before {0} phase")]
    Cancelled(Phase),
}
