//! Code for reading transmission links from a CSV file.
use super::*;
use crate::id::{IDCollection, define_id_getter};
use crate::link::{LinkID, LinkMap, TransmissionLink};
use crate::region::RegionMap;
use crate::units::{Dimensionless, Power};
use serde::Deserialize;

const LINKS_FILE_NAME: &str = "links.csv";

/// A row of the links CSV file
#[derive(Debug, Deserialize, PartialEq)]
struct LinkRaw {
    id: LinkID,
    from_region: String,
    to_region: String,
    capacity: Power,
    reverse_capacity: Option<Power>,
    loss_factor: Option<Dimensionless>,
}
define_id_getter! {LinkRaw, LinkID}

/// Read transmission links from the model directory.
///
/// The file is optional. Reverse capacity defaults to the forward capacity and loss factor to zero.
pub fn read_links(model_dir: &Path, regions: &RegionMap) -> Result<LinkMap> {
    let file_path = model_dir.join(LINKS_FILE_NAME);
    let records = read_csv_optional::<LinkRaw>(&file_path)?;
    let raw: IndexMap<LinkID, LinkRaw> =
        fill_and_validate_map(records).with_context(|| input_err_msg(&file_path))?;

    raw.into_values()
        .map(|raw| {
            let link = TransmissionLink {
                id: raw.id.clone(),
                from_region: regions.get_id(&raw.from_region)?.clone(),
                to_region: regions.get_id(&raw.to_region)?.clone(),
                capacity: raw.capacity,
                reverse_capacity: raw.reverse_capacity,
                loss_factor: raw.loss_factor.unwrap_or_default(),
            };
            Ok::<_, anyhow::Error>((raw.id, link))
        })
        .try_collect()
        .with_context(|| input_err_msg(&file_path))
}
