//! Export of a solved network to a self-describing JSON file, and import back.
use crate::input::input_err_msg;
use crate::optimisation::DispatchResult;
use crate::topology::Topology;
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// The file name used when exporting from the `run` command
pub const NETWORK_FILE_NAME: &str = "network.json";

/// The current version of the export format
const FORMAT_VERSION: u32 = 1;

/// A topology together with its solved dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolvedNetwork {
    /// Version of the export format
    pub format_version: u32,
    /// The network which was dispatched
    pub topology: Topology,
    /// The dispatch, including its snapshots and configuration
    pub result: DispatchResult,
}

impl SolvedNetwork {
    /// Check that `result` refers only to entities in `topology` and that every series has one
    /// value per snapshot
    fn validate(&self) -> Result<()> {
        ensure!(
            self.format_version == FORMAT_VERSION,
            "Unsupported format version {} (expected {FORMAT_VERSION})",
            self.format_version
        );

        let snapshots = &self.result.snapshots;
        for (id, profile) in self.topology.demand() {
            snapshots.check_aligned(format_args!("region {id}"), "demand", profile.len())?;
        }
        for (id, generator) in self.topology.generators() {
            let entity = format!("generator {id}");
            snapshots.check_aligned(&entity, "availability", generator.availability.len())?;
        }

        for (id, output) in &self.result.generation {
            ensure!(
                self.topology.generators().contains_key(id),
                "Result refers to unknown generator {id}"
            );
            snapshots.check_aligned(format_args!("generator {id}"), "generation", output.len())?;
        }
        for (id, dispatch) in &self.result.storage {
            ensure!(
                self.topology.storage_units().contains_key(id),
                "Result refers to unknown storage unit {id}"
            );
            let entity = format!("storage unit {id}");
            snapshots.check_aligned(&entity, "charge", dispatch.charge.len())?;
            snapshots.check_aligned(&entity, "discharge", dispatch.discharge.len())?;
            snapshots.check_aligned(&entity, "state_of_charge", dispatch.state_of_charge.len())?;
        }
        for (id, flows) in &self.result.flows {
            ensure!(
                self.topology.links().contains_key(id),
                "Result refers to unknown link {id}"
            );
            let entity = format!("link {id}");
            snapshots.check_aligned(&entity, "forward", flows.forward.len())?;
            snapshots.check_aligned(&entity, "reverse", flows.reverse.len())?;
        }
        for (id, prices) in &self.result.prices {
            ensure!(
                self.topology.regions().contains_key(id),
                "Result refers to unknown region {id}"
            );
            snapshots.check_aligned(format_args!("region {id}"), "prices", prices.len())?;
        }

        Ok(())
    }
}

/// Write a topology and its dispatch to a JSON file
pub fn export_network(
    file_path: &Path,
    topology: &Topology,
    result: &DispatchResult,
) -> Result<()> {
    let network = SolvedNetwork {
        format_version: FORMAT_VERSION,
        topology: topology.clone(),
        result: result.clone(),
    };
    let json =
        serde_json::to_string_pretty(&network).context("Failed to serialise network to JSON")?;
    fs::write(file_path, json)
        .with_context(|| format!("Failed to write {}", file_path.display()))?;

    Ok(())
}

/// Read a topology and its dispatch from a JSON file written by [`export_network`].
///
/// The topology goes through the same validation as when it is first built.
pub fn import_network(file_path: &Path) -> Result<SolvedNetwork> {
    let json = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let network: SolvedNetwork =
        serde_json::from_str(&json).with_context(|| input_err_msg(file_path))?;
    network
        .validate()
        .with_context(|| input_err_msg(file_path))?;

    Ok(network)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{snapshots, two_region_topology};
    use crate::network::{DispatchConfig, build};
    use crate::optimisation::solve;
    use crate::results::generation_summary;
    use crate::snapshot::SnapshotSet;
    use float_cmp::assert_approx_eq;
    use rstest::{fixture, rstest};
    use tempfile::tempdir;

    #[fixture]
    fn solved(two_region_topology: Topology, snapshots: SnapshotSet) -> (Topology, DispatchResult) {
        let config = DispatchConfig {
            multi_region: true,
            ..Default::default()
        };
        let instance = build(&two_region_topology, &snapshots, &config).unwrap();
        let result = solve(&instance, "highs").unwrap();
        (two_region_topology, result)
    }

    #[rstest]
    fn test_export_import(solved: (Topology, DispatchResult)) {
        let (topology, result) = solved;
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(NETWORK_FILE_NAME);
        export_network(&file_path, &topology, &result).unwrap();

        let network = import_network(&file_path).unwrap();
        assert_eq!(network.topology, topology);
        assert_eq!(
            network
                .result
                .flows
                .keys()
                .map(|id| id.to_string())
                .collect::<Vec<_>>(),
            ["A-B"]
        );
        assert_eq!(network.result.config, result.config);

        // Reducers give the same answers on the imported copy
        assert_approx_eq!(
            f64,
            generation_summary(&network.result, &network.topology)
                .total
                .value(),
            generation_summary(&result, &topology).total.value()
        );
    }

    #[rstest]
    fn test_import_unknown_generator(solved: (Topology, DispatchResult)) {
        let (topology, mut result) = solved;
        let output = result.generation[0].clone();
        result.generation.insert("ghost".into(), output);

        let dir = tempdir().unwrap();
        let file_path = dir.path().join(NETWORK_FILE_NAME);
        export_network(&file_path, &topology, &result).unwrap();

        let err = import_network(&file_path).unwrap_err();
        assert_eq!(
            err.chain().nth(1).unwrap().to_string(),
            "Result refers to unknown generator ghost"
        );
    }

    /// Export `solved`, then edit the JSON with `edit` before importing it again
    fn import_edited<F>(solved: (Topology, DispatchResult), edit: F) -> Result<SolvedNetwork>
    where
        F: FnOnce(&mut serde_json::Value),
    {
        let (topology, result) = solved;
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(NETWORK_FILE_NAME);
        export_network(&file_path, &topology, &result).unwrap();

        let mut json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&file_path).unwrap()).unwrap();
        edit(&mut json);
        fs::write(&file_path, json.to_string()).unwrap();

        import_network(&file_path)
    }

    #[rstest]
    #[case("/result/flows/A-B/forward", "Invalid forward for link A-B")]
    #[case("/result/flows/A-B/reverse", "Invalid reverse for link A-B")]
    #[case("/result/generation/expensive", "Invalid generation for generator expensive")]
    #[case("/result/prices/B", "Invalid prices for region B")]
    #[case("/topology/generators/cheap/availability", "Invalid availability for generator cheap")]
    fn test_import_truncated_series(
        solved: (Topology, DispatchResult),
        #[case] pointer: &str,
        #[case] prefix: &str,
    ) {
        let err = import_edited(solved, |json| {
            json.pointer_mut(pointer)
                .unwrap()
                .as_array_mut()
                .unwrap()
                .pop();
        })
        .unwrap_err();
        assert_eq!(
            err.chain().nth(1).unwrap().to_string(),
            format!("{prefix}: has 23 value(s) but there are 24 snapshot(s)")
        );
    }

    #[rstest]
    fn test_import_unknown_region_price(solved: (Topology, DispatchResult)) {
        let err = import_edited(solved, |json| {
            let prices = json.pointer_mut("/result/prices").unwrap();
            let series = prices["B"].clone();
            prices.as_object_mut().unwrap().insert("Z".into(), series);
        })
        .unwrap_err();
        assert_eq!(
            err.chain().nth(1).unwrap().to_string(),
            "Result refers to unknown region Z"
        );
    }

    #[rstest]
    fn test_import_mismatched_key(solved: (Topology, DispatchResult)) {
        let err = import_edited(solved, |json| {
            *json.pointer_mut("/topology/generators/cheap/id").unwrap() = "other".into();
        })
        .unwrap_err();
        assert!(
            err.chain()
                .nth(1)
                .unwrap()
                .to_string()
                .starts_with("Invalid id for generator cheap: does not match its key (got other)")
        );
    }

    #[test]
    fn test_import_invalid_json() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(NETWORK_FILE_NAME);
        fs::write(&file_path, "{\"format_version\": 1}").unwrap();
        assert!(import_network(&file_path).is_err());
    }
}
