//! Code for reading regional demand profiles from a CSV file.
use super::*;
use crate::id::IDCollection;
use crate::region::RegionMap;
use crate::topology::DemandMap;
use crate::units::Power;
use serde::Deserialize;

const DEMAND_FILE_NAME: &str = "demand.csv";

/// A row of the demand CSV file
#[derive(Debug, Deserialize, PartialEq)]
struct DemandRaw {
    region_id: String,
    #[serde(deserialize_with = "deserialise_timestamp")]
    timestamp: NaiveDateTime,
    demand: Power,
}

/// Read demand profiles from the model directory.
///
/// Every region must have a profile covering every snapshot.
pub fn read_demand(
    model_dir: &Path,
    regions: &RegionMap,
    snapshots: &SnapshotSet,
) -> Result<DemandMap> {
    let file_path = model_dir.join(DEMAND_FILE_NAME);
    read_demand_from_iter(read_csv(&file_path)?, regions, snapshots)
        .with_context(|| input_err_msg(&file_path))
}

fn read_demand_from_iter<I>(
    iter: I,
    regions: &RegionMap,
    snapshots: &SnapshotSet,
) -> Result<DemandMap>
where
    I: Iterator<Item = DemandRaw>,
{
    let rows: Vec<_> = iter
        .map(|row| {
            let region_id = regions.get_id(&row.region_id)?.clone();
            Ok((region_id, row.timestamp, row.demand))
        })
        .collect::<Result<_>>()?;
    let mut demand = collect_series(rows, snapshots)?;

    for region_id in regions.keys() {
        ensure!(
            demand.contains_key(region_id),
            "Missing demand for region {region_id}"
        );
    }

    // Regions in the same order as the regions file
    demand.sort_by_cached_key(|region_id, _| regions.get_index_of(region_id));

    Ok(demand)
}
