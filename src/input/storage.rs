//! Code for reading storage units from a CSV file.
use super::*;
use crate::id::{IDCollection, define_id_getter};
use crate::region::RegionMap;
use crate::storage::{StorageID, StorageMap, StorageUnit};
use crate::units::{Dimensionless, Energy, MoneyPerEnergy, Power};
use serde::Deserialize;

const STORAGE_FILE_NAME: &str = "storage.csv";

/// A row of the storage CSV file
#[derive(Debug, Deserialize, PartialEq)]
struct StorageUnitRaw {
    id: StorageID,
    region_id: String,
    power_capacity: Power,
    energy_capacity: Energy,
    efficiency_store: Dimensionless,
    efficiency_dispatch: Dimensionless,
    initial_soc: Option<Dimensionless>,
    marginal_cost: Option<MoneyPerEnergy>,
}
define_id_getter! {StorageUnitRaw, StorageID}

/// Read storage units from the model directory.
///
/// The file is optional. Missing initial states of charge and marginal costs default to zero.
pub fn read_storage_units(model_dir: &Path, regions: &RegionMap) -> Result<StorageMap> {
    let file_path = model_dir.join(STORAGE_FILE_NAME);
    let records = read_csv_optional::<StorageUnitRaw>(&file_path)?;
    let raw: IndexMap<StorageID, StorageUnitRaw> =
        fill_and_validate_map(records).with_context(|| input_err_msg(&file_path))?;

    raw.into_values()
        .map(|raw| {
            let unit = StorageUnit {
                id: raw.id.clone(),
                region_id: regions.get_id(&raw.region_id)?.clone(),
                power_capacity: raw.power_capacity,
                energy_capacity: raw.energy_capacity,
                efficiency_store: raw.efficiency_store,
                efficiency_dispatch: raw.efficiency_dispatch,
                initial_soc: raw.initial_soc.unwrap_or_default(),
                marginal_cost: raw.marginal_cost.unwrap_or_default(),
            };
            Ok::<_, anyhow::Error>((raw.id, unit))
        })
        .try_collect()
        .with_context(|| input_err_msg(&file_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::regions;
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn create_storage_file(dir_path: &Path, contents: &str) {
        let mut file = File::create(dir_path.join(STORAGE_FILE_NAME)).unwrap();
        write!(file, "{contents}").unwrap();
    }

    #[rstest]
    fn test_read_storage_units(regions: RegionMap) {
        let dir = tempdir().unwrap();
        create_storage_file(
            dir.path(),
            "id,region_id,power_capacity,energy_capacity,efficiency_store,efficiency_dispatch,\
initial_soc,marginal_cost
battery,A,20,80,0.95,0.95,0.5,
pumped_hydro,A,100,800,0.87,0.87,,1.5
",
        );

        let units = read_storage_units(dir.path(), &regions).unwrap();
        assert_eq!(units.len(), 2);

        let battery = &units["battery"];
        assert_eq!(battery.energy_capacity, Energy(80.0));
        assert_eq!(battery.initial_soc, Dimensionless(0.5));
        assert_eq!(battery.marginal_cost, MoneyPerEnergy(0.0));

        let hydro = &units["pumped_hydro"];
        assert_eq!(hydro.initial_soc, Dimensionless(0.0));
        assert_eq!(hydro.marginal_cost, MoneyPerEnergy(1.5));
    }

    #[rstest]
    fn test_read_storage_units_missing_file(regions: RegionMap) {
        let dir = tempdir().unwrap();
        assert!(read_storage_units(dir.path(), &regions).unwrap().is_empty());
    }

    #[rstest]
    fn test_read_storage_units_unknown_region(regions: RegionMap) {
        let dir = tempdir().unwrap();
        create_storage_file(
            dir.path(),
            "id,region_id,power_capacity,energy_capacity,efficiency_store,efficiency_dispatch
battery,X,20,80,0.95,0.95
",
        );

        let err = read_storage_units(dir.path(), &regions).unwrap_err();
        assert_eq!(err.chain().nth(1).unwrap().to_string(), "Unknown ID X found");
    }
}
