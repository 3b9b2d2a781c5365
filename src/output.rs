//! The module responsible for writing output data to disk.
use crate::generator::{GeneratorID, Technology};
use crate::link::LinkID;
use crate::optimisation::DispatchResult;
use crate::region::RegionID;
use crate::results::{
    cost_summary, curtailment_summary, emissions_summary, flow_summary, generation_summary,
    monthly_generation, storage_summary,
};
use crate::storage::StorageID;
use crate::topology::Topology;
use anyhow::{Context, Result, ensure};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "powerdispatch_results";

/// The output file name for generator output
const GENERATION_FILE_NAME: &str = "generation.csv";

/// The output file name for storage operation
const STORAGE_FILE_NAME: &str = "storage.csv";

/// The output file name for link flows
const FLOWS_FILE_NAME: &str = "flows.csv";

/// The output file name for regional prices
const PRICES_FILE_NAME: &str = "prices.csv";

/// The output file name for generation by technology
const GENERATION_SUMMARY_FILE_NAME: &str = "generation_summary.csv";

/// The output file name for storage totals
const STORAGE_SUMMARY_FILE_NAME: &str = "storage_summary.csv";

/// The output file name for regional imports and exports
const REGION_FLOWS_FILE_NAME: &str = "region_flows.csv";

/// The output file name for monthly generation by technology
const MONTHLY_GENERATION_FILE_NAME: &str = "monthly_generation.csv";

/// The output file name for headline figures
const SUMMARY_FILE_NAME: &str = "summary.toml";

/// Get the model name from the specified directory path
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to check
    // for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory for the model specified at `model_dir`.
///
/// # Returns
///
/// Whether an existing, non-empty folder was deleted, or an error if it exists and
/// `allow_overwrite` is false.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Folder exists and is empty: nothing to do
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Please delete the folder or pass the \
            --overwrite command-line option."
        );

        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Represents a row in the generation CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct GenerationRow {
    timestamp: NaiveDateTime,
    generator_id: GeneratorID,
    region_id: RegionID,
    technology: Technology,
    output: f64,
}

/// Represents a row in the storage CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct StorageRow {
    timestamp: NaiveDateTime,
    storage_id: StorageID,
    region_id: RegionID,
    charge: f64,
    discharge: f64,
    state_of_charge: f64,
}

/// Represents a row in the flows CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct FlowRow {
    timestamp: NaiveDateTime,
    link_id: LinkID,
    from_region: RegionID,
    to_region: RegionID,
    forward: f64,
    reverse: f64,
    net: f64,
}

/// Represents a row in the prices CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct PriceRow {
    timestamp: NaiveDateTime,
    region_id: RegionID,
    price: f64,
}

/// Represents a row in the generation summary CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct TechnologySummaryRow {
    technology: Technology,
    capacity: f64,
    generation: f64,
    peak: f64,
    capacity_factor: f64,
    emissions: f64,
    curtailed: f64,
}

/// Represents a row in the storage summary CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct StorageSummaryRow {
    storage_id: StorageID,
    charged: f64,
    discharged: f64,
    net_consumption: f64,
    round_trip_efficiency: f64,
    final_state_of_charge: f64,
}

/// Represents a row in the region flows CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct RegionFlowsRow {
    region_id: RegionID,
    imports: f64,
    exports: f64,
    net_import: f64,
}

/// Represents a row in the monthly generation CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct MonthlyGenerationRow {
    month: String,
    technology: Technology,
    generation: f64,
}

/// Headline figures for a run
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Summary {
    total_cost: f64,
    generation_cost: f64,
    storage_cost: f64,
    average_cost: Option<f64>,
    total_generation: f64,
    total_emissions: f64,
    emissions_intensity: Option<f64>,
    curtailed_energy: f64,
    curtailment_share: f64,
}

/// Write all of `rows` to a new CSV file
fn write_csv<T: Serialize>(file_path: &Path, rows: impl IntoIterator<Item = T>) -> Result<()> {
    let mut writer = csv::Writer::from_path(file_path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// An object for writing dispatch time series to file
pub struct DataWriter {
    generation_writer: csv::Writer<File>,
    storage_writer: csv::Writer<File>,
    flows_writer: csv::Writer<File>,
    prices_writer: csv::Writer<File>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    pub fn create(output_path: &Path) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        Ok(Self {
            generation_writer: new_writer(GENERATION_FILE_NAME)?,
            storage_writer: new_writer(STORAGE_FILE_NAME)?,
            flows_writer: new_writer(FLOWS_FILE_NAME)?,
            prices_writer: new_writer(PRICES_FILE_NAME)?,
        })
    }

    /// Write generator output to a CSV file
    pub fn write_generation(&mut self, result: &DispatchResult, topology: &Topology) -> Result<()> {
        for (t, timestamp) in result.snapshots.iter().enumerate() {
            for (generator_id, output) in &result.generation {
                let generator = &topology.generators()[generator_id];
                let row = GenerationRow {
                    timestamp: *timestamp,
                    generator_id: generator_id.clone(),
                    region_id: generator.region_id.clone(),
                    technology: generator.technology,
                    output: output[t].value(),
                };
                self.generation_writer.serialize(row)?;
            }
        }

        Ok(())
    }

    /// Write storage operation to a CSV file
    pub fn write_storage(&mut self, result: &DispatchResult, topology: &Topology) -> Result<()> {
        for (t, timestamp) in result.snapshots.iter().enumerate() {
            for (storage_id, dispatch) in &result.storage {
                let row = StorageRow {
                    timestamp: *timestamp,
                    storage_id: storage_id.clone(),
                    region_id: topology.storage_units()[storage_id].region_id.clone(),
                    charge: dispatch.charge[t].value(),
                    discharge: dispatch.discharge[t].value(),
                    state_of_charge: dispatch.state_of_charge[t].value(),
                };
                self.storage_writer.serialize(row)?;
            }
        }

        Ok(())
    }

    /// Write link flows to a CSV file
    pub fn write_flows(&mut self, result: &DispatchResult, topology: &Topology) -> Result<()> {
        for (t, timestamp) in result.snapshots.iter().enumerate() {
            for (link_id, flows) in &result.flows {
                let link = &topology.links()[link_id];
                let row = FlowRow {
                    timestamp: *timestamp,
                    link_id: link_id.clone(),
                    from_region: link.from_region.clone(),
                    to_region: link.to_region.clone(),
                    forward: flows.forward[t].value(),
                    reverse: flows.reverse[t].value(),
                    net: flows.net(t).value(),
                };
                self.flows_writer.serialize(row)?;
            }
        }

        Ok(())
    }

    /// Write regional prices to a CSV file
    pub fn write_prices(&mut self, result: &DispatchResult) -> Result<()> {
        for (t, timestamp) in result.snapshots.iter().enumerate() {
            for (region_id, prices) in &result.prices {
                let row = PriceRow {
                    timestamp: *timestamp,
                    region_id: region_id.clone(),
                    price: prices[t].value(),
                };
                self.prices_writer.serialize(row)?;
            }
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.generation_writer.flush()?;
        self.storage_writer.flush()?;
        self.flows_writer.flush()?;
        self.prices_writer.flush()?;

        Ok(())
    }
}

/// Write summaries of the dispatch: per-technology, storage, regional exchange and monthly
/// breakdowns, plus headline figures.
pub fn write_summaries(
    output_path: &Path,
    result: &DispatchResult,
    topology: &Topology,
) -> Result<()> {
    let generation = generation_summary(result, topology);
    let emissions = emissions_summary(result, topology);
    let curtailment = curtailment_summary(result, topology);
    let costs = cost_summary(result, topology);

    let technology_rows = generation.by_technology.iter().map(|(technology, summary)| {
        TechnologySummaryRow {
            technology: *technology,
            capacity: summary.capacity.value(),
            generation: summary.total.value(),
            peak: summary.peak.value(),
            capacity_factor: summary.capacity_factor.value(),
            emissions: emissions
                .by_technology
                .get(technology)
                .map_or(0.0, |value| value.value()),
            curtailed: curtailment
                .by_technology
                .get(technology)
                .map_or(0.0, |value| value.value()),
        }
    });
    write_csv(&output_path.join(GENERATION_SUMMARY_FILE_NAME), technology_rows)?;

    let storage = storage_summary(result);
    let storage_rows = storage
        .by_unit
        .iter()
        .map(|(storage_id, summary)| StorageSummaryRow {
            storage_id: storage_id.clone(),
            charged: summary.charged.value(),
            discharged: summary.discharged.value(),
            net_consumption: summary.net_consumption().value(),
            round_trip_efficiency: topology.storage_units()[storage_id]
                .round_trip_efficiency()
                .value(),
            final_state_of_charge: summary
                .state_of_charge
                .last()
                .map_or(0.0, |value| value.value()),
        });
    write_csv(&output_path.join(STORAGE_SUMMARY_FILE_NAME), storage_rows)?;

    let region_rows: Vec<_> = flow_summary(result, topology)
        .map(|flows| {
            flows
                .by_region
                .into_iter()
                .map(|(region_id, flows)| RegionFlowsRow {
                    net_import: flows.net_import().value(),
                    imports: flows.imports.value(),
                    exports: flows.exports.value(),
                    region_id,
                })
                .collect()
        })
        .unwrap_or_default();
    write_csv(&output_path.join(REGION_FLOWS_FILE_NAME), region_rows)?;

    let monthly_rows = monthly_generation(result, topology)
        .into_iter()
        .flat_map(|(month, by_technology)| {
            by_technology
                .into_iter()
                .map(move |(technology, generation)| MonthlyGenerationRow {
                    month: month.to_string(),
                    technology,
                    generation: generation.value(),
                })
        });
    write_csv(&output_path.join(MONTHLY_GENERATION_FILE_NAME), monthly_rows)?;

    let summary = Summary {
        total_cost: costs.total.value(),
        generation_cost: costs.generation.value(),
        storage_cost: costs.storage.value(),
        average_cost: costs.average_cost.map(|value| value.value()),
        total_generation: generation.total.value(),
        total_emissions: emissions.total.value(),
        emissions_intensity: emissions.intensity.map(|value| value.value()),
        curtailed_energy: curtailment.total.value(),
        curtailment_share: curtailment.share.value(),
    };
    fs::write(
        output_path.join(SUMMARY_FILE_NAME),
        toml::to_string(&summary)?,
    )?;

    Ok(())
}

/// Write the dispatch time series and summaries to `output_path`
pub fn write_results(
    output_path: &Path,
    result: &DispatchResult,
    topology: &Topology,
) -> Result<()> {
    let mut writer = DataWriter::create(output_path)?;
    writer.write_generation(result, topology)?;
    writer.write_storage(result, topology)?;
    writer.write_flows(result, topology)?;
    writer.write_prices(result)?;
    writer.flush()?;

    write_summaries(output_path, result, topology)
}
