//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::input::{deserialise_timestamp, input_err_msg, read_toml};
use crate::optimisation::DEFAULT_VALUE_OF_LOST_LOAD;
use crate::snapshot::SnapshotSet;
use crate::solver::{DEFAULT_SOLVER, SolverRegistry};
use crate::units::MoneyPerEnergy;
use anyhow::{Context, Result, ensure};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_include_storage, bool, true);
define_param_default!(default_storage_cyclic, bool, true);
define_param_default!(default_solver, String, DEFAULT_SOLVER.to_string());
define_param_default!(
    default_value_of_lost_load,
    MoneyPerEnergy,
    DEFAULT_VALUE_OF_LOST_LOAD
);

/// Represents the contents of the entire model file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ModelParameters {
    /// Timestamp of the first snapshot (e.g. "2024-07-01 00:00")
    #[serde(deserialize_with = "deserialise_timestamp")]
    pub start: NaiveDateTime,
    /// Number of hourly snapshots
    pub snapshots: usize,
    /// Whether each region has its own energy balance, with links between them
    #[serde(default)]
    pub multi_region: bool,
    /// Whether storage units are dispatched
    #[serde(default = "default_include_storage")]
    pub include_storage: bool,
    /// Whether storage must end the horizon with the energy it started with
    #[serde(default = "default_storage_cyclic")]
    pub storage_cyclic: bool,
    /// Name of the solver backend
    #[serde(default = "default_solver")]
    pub solver: String,
    /// The cost applied to unmet demand.
    ///
    /// This is only used to locate shortfalls when the model is infeasible.
    #[serde(default = "default_value_of_lost_load")]
    pub value_of_lost_load: MoneyPerEnergy,
    /// Maximum time the solver may run for, in seconds
    #[serde(default)]
    pub solver_time_limit: Option<f64>,
}

/// Check that the `snapshots` parameter is valid
fn check_snapshots(count: usize) -> Result<()> {
    ensure!(count > 0, "snapshots must be greater than zero");

    Ok(())
}

/// Check that the `solver` parameter names a known backend
fn check_solver(name: &str) -> Result<()> {
    SolverRegistry::with_defaults().get(name)?;

    Ok(())
}

/// Check that the `value_of_lost_load` parameter is valid
fn check_value_of_lost_load(value: MoneyPerEnergy) -> Result<()> {
    ensure!(
        value.is_finite() && value > MoneyPerEnergy(0.0),
        "value_of_lost_load must be a finite number greater than zero"
    );

    Ok(())
}

/// Check that the `solver_time_limit` parameter is valid
fn check_solver_time_limit(value: Option<f64>) -> Result<()> {
    if let Some(value) = value {
        ensure!(
            value.is_finite() && value > 0.0,
            "solver_time_limit must be a finite number greater than zero"
        );
    }

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        check_snapshots(self.snapshots)?;
        check_solver(&self.solver)?;
        check_value_of_lost_load(self.value_of_lost_load)?;
        check_solver_time_limit(self.solver_time_limit)?;

        Ok(())
    }

    /// The hourly snapshots described by `start` and `snapshots`
    pub fn snapshot_set(&self) -> Result<SnapshotSet> {
        let snapshots = SnapshotSet::hourly(self.start, self.snapshots)?;
        Ok(snapshots)
    }
}
