//! Common routines for handling input data.
use crate::id::{HasID, IDLike};
use crate::model::{Model, ModelParameters};
use crate::snapshot::SnapshotSet;
use crate::topology::Topology;
use anyhow::{Context, Result, bail, ensure};
use chrono::NaiveDateTime;
use indexmap::IndexMap;
use itertools::Itertools;
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use std::fs;
use std::path::Path;

mod demand;
use demand::read_demand;
mod generator;
use generator::read_generators;
mod link;
use link::read_links;
mod region;
use region::read_regions;
mod storage;
use storage::read_storage_units;

/// Formats accepted for timestamps in input files
const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"];

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec = read_csv_internal(file_path)?;
    if vec.is_empty() {
        bail!("CSV file {} cannot be empty", file_path.display());
    }
    Ok(vec.into_iter())
}

/// Read a series of type `T`s from a CSV file.
///
/// Returns an empty iterator if the file is missing or has no rows.
pub fn read_csv_optional<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    if !file_path.is_file() {
        return Ok(Vec::new().into_iter());
    }

    Ok(read_csv_internal(file_path)?.into_iter())
}

fn read_csv_internal<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let vec = csv::Reader::from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Parse a timestamp in one of the accepted formats
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value.trim(), format).ok())
        .with_context(|| {
            format!(
                "Invalid timestamp '{value}'. Expected one of the formats: {}",
                TIMESTAMP_FORMATS.join(", ")
            )
        })
}

/// Read a timestamp from a string field
pub fn deserialise_timestamp<'de, D>(deserialiser: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserialiser)?;
    parse_timestamp(&value).map_err(serde::de::Error::custom)
}

/// Read a CSV file of items with IDs.
///
/// As this function is only ever used for top-level CSV files (i.e. the ones which actually define
/// the IDs for a given type), we use an ordered map to maintain the order in the input files.
fn read_csv_id_file<T, ID: IDLike>(file_path: &Path) -> Result<IndexMap<ID, T>>
where
    T: HasID<ID> + DeserializeOwned,
{
    fill_and_validate_map(read_csv(file_path)?).with_context(|| input_err_msg(file_path))
}

/// Collect records into a map keyed by ID, rejecting duplicates
fn fill_and_validate_map<T, ID: IDLike>(records: impl Iterator<Item = T>) -> Result<IndexMap<ID, T>>
where
    T: HasID<ID>,
{
    let mut map = IndexMap::new();
    for record in records {
        let id = record.get_id().clone();
        let existing = map.insert(id.clone(), record).is_some();
        ensure!(!existing, "Duplicate ID found: {id}");
    }

    Ok(map)
}

/// Group rows of a long-format time series file by key.
///
/// Each key's rows must list exactly the snapshot timestamps, in order.
fn collect_series<ID: IDLike, V>(
    rows: impl IntoIterator<Item = (ID, NaiveDateTime, V)>,
    snapshots: &SnapshotSet,
) -> Result<IndexMap<ID, Vec<V>>> {
    let mut series: IndexMap<ID, Vec<V>> = IndexMap::new();
    for (id, timestamp, value) in rows {
        let values = series.entry(id.clone()).or_default();
        let t = values.len();
        match snapshots.get(t) {
            Some(expected) if *expected == timestamp => values.push(value),
            Some(expected) => bail!(
                "Timestamps for {id} must match the model snapshots: expected {expected} at \
                position {t}, found {timestamp}"
            ),
            None => bail!(
                "Too many values for {id}: found {timestamp} after the last snapshot ({})",
                snapshots.len()
            ),
        }
    }

    for (id, values) in &series {
        ensure!(
            values.len() == snapshots.len(),
            "Missing values for {id}: found {} of {} snapshot(s)",
            values.len(),
            snapshots.len()
        );
    }

    Ok(series)
}

/// Read a model from the specified directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The static model data ([`Model`]) or an error.
pub fn load_model<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
    let model_dir = model_dir.as_ref();
    let parameters = ModelParameters::from_path(model_dir)?;
    let snapshots = parameters.snapshot_set()?;

    let regions = read_regions(model_dir)?;
    let generators = read_generators(model_dir, &regions, &snapshots)?;
    let storage_units = read_storage_units(model_dir, &regions)?;
    let links = read_links(model_dir, &regions)?;
    let demand = read_demand(model_dir, &regions, &snapshots)?;

    let topology = Topology::new(regions, generators, storage_units, links, demand)
        .context("Invalid network topology")?;

    Ok(Model {
        model_path: model_dir.to_path_buf(),
        parameters,
        snapshots,
        topology,
    })
}
