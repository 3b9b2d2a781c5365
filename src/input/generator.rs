//! Code for reading generators and their availability profiles.
use super::*;
use crate::generator::{Generator, GeneratorID, GeneratorMap, Technology};
use crate::id::{IDCollection, define_id_getter};
use crate::region::RegionMap;
use crate::units::{Dimensionless, EmissionsPerEnergy, MoneyPerEnergy, Power};
use serde::Deserialize;

const GENERATORS_FILE_NAME: &str = "generators.csv";
const AVAILABILITY_FILE_NAME: &str = "availability.csv";

/// A row of the generators CSV file
#[derive(Debug, Deserialize, PartialEq)]
struct GeneratorRaw {
    id: GeneratorID,
    region_id: String,
    technology: Technology,
    capacity: Power,
    marginal_cost: MoneyPerEnergy,
    emissions_factor: EmissionsPerEnergy,
    /// Constant availability, for generators without a profile
    availability: Option<Dimensionless>,
}
define_id_getter! {GeneratorRaw, GeneratorID}

/// A row of the availability CSV file
#[derive(Debug, Deserialize, PartialEq)]
struct AvailabilityRaw {
    generator_id: String,
    #[serde(deserialize_with = "deserialise_timestamp")]
    timestamp: NaiveDateTime,
    value: Dimensionless,
}

/// Read generators from the model directory.
///
/// Each generator's availability comes from its `availability` column, from its profile in
/// `availability.csv` or, if neither is given, defaults to 1 for every snapshot.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `regions` - All known regions
/// * `snapshots` - The model snapshots, which profiles must match
pub fn read_generators(
    model_dir: &Path,
    regions: &RegionMap,
    snapshots: &SnapshotSet,
) -> Result<GeneratorMap> {
    let file_path = model_dir.join(GENERATORS_FILE_NAME);
    let raw: IndexMap<GeneratorID, GeneratorRaw> = read_csv_id_file(&file_path)?;

    let availability_path = model_dir.join(AVAILABILITY_FILE_NAME);
    let mut profiles = read_availability(&availability_path, &raw, snapshots)
        .with_context(|| input_err_msg(&availability_path))?;

    raw.into_values()
        .map(|generator| {
            let profile = profiles.swap_remove(&generator.id);
            into_generator(generator, profile, regions, snapshots)
        })
        .try_collect()
        .with_context(|| input_err_msg(&file_path))
}

/// Convert a raw row into a [`Generator`], resolving its region and availability
fn into_generator(
    raw: GeneratorRaw,
    profile: Option<Vec<Dimensionless>>,
    regions: &RegionMap,
    snapshots: &SnapshotSet,
) -> Result<(GeneratorID, Generator)> {
    let region_id = regions.get_id(&raw.region_id)?.clone();
    let availability = match (raw.availability, profile) {
        (Some(_), Some(_)) => bail!(
            "Generator {} has both a constant availability and an availability profile",
            raw.id
        ),
        (Some(value), None) => vec![value; snapshots.len()],
        (None, Some(profile)) => profile,
        (None, None) => vec![Dimensionless(1.0); snapshots.len()],
    };

    let generator = Generator {
        id: raw.id.clone(),
        region_id,
        technology: raw.technology,
        capacity: raw.capacity,
        marginal_cost: raw.marginal_cost,
        emissions_factor: raw.emissions_factor,
        availability,
    };
    Ok((raw.id, generator))
}

/// Read availability profiles, keyed by generator
fn read_availability(
    file_path: &Path,
    generators: &IndexMap<GeneratorID, GeneratorRaw>,
    snapshots: &SnapshotSet,
) -> Result<IndexMap<GeneratorID, Vec<Dimensionless>>> {
    let rows: Vec<_> = read_csv_optional::<AvailabilityRaw>(file_path)?
        .map(|row| {
            let id = generators.get_id(&row.generator_id)?.clone();
            Ok((id, row.timestamp, row.value))
        })
        .collect::<Result<_>>()?;

    collect_series(rows, snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{regions, snapshots};
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_file(dir_path: &Path, file_name: &str, contents: &str) {
        let mut file = File::create(dir_path.join(file_name)).unwrap();
        write!(file, "{contents}").unwrap();
    }

    /// Availability for `generator_id`: 0.5 at night, 1.0 during the day
    fn availability_rows(generator_id: &str, snapshots: &SnapshotSet) -> String {
        let mut contents = "generator_id,timestamp,value\n".to_string();
        for (t, timestamp) in snapshots.iter().enumerate() {
            let value = if (6..18).contains(&t) { 1.0 } else { 0.5 };
            contents.push_str(&format!(
                "{generator_id},{},{value}\n",
                timestamp.format("%Y-%m-%d %H:%M")
            ));
        }
        contents
    }

    #[rstest]
    fn test_read_generators(regions: RegionMap, snapshots: SnapshotSet) {
        let dir = tempdir().unwrap();
        write_file(
            dir.path(),
            GENERATORS_FILE_NAME,
            "id,region_id,technology,capacity,marginal_cost,emissions_factor,availability
coal1,A,coal,150,10,0.85,
solar1,A,solar,50,0,0,
gas1,A,gas,100,50,0.4,0.9
",
        );
        write_file(
            dir.path(),
            AVAILABILITY_FILE_NAME,
            &availability_rows("solar1", &snapshots),
        );

        let generators = read_generators(dir.path(), &regions, &snapshots).unwrap();
        assert_eq!(
            generators.keys().map(|id| id.to_string()).collect::<Vec<_>>(),
            ["coal1", "solar1", "gas1"]
        );

        let coal = &generators["coal1"];
        assert_eq!(coal.technology, Technology::Coal);
        assert_eq!(coal.capacity, Power(150.0));
        assert_eq!(coal.availability, vec![Dimensionless(1.0); snapshots.len()]);

        let solar = &generators["solar1"];
        assert_eq!(solar.availability[0], Dimensionless(0.5));
        assert_eq!(solar.availability[12], Dimensionless(1.0));

        let gas = &generators["gas1"];
        assert_eq!(gas.availability, vec![Dimensionless(0.9); snapshots.len()]);
    }

    #[rstest]
    fn test_read_generators_unknown_region(regions: RegionMap, snapshots: SnapshotSet) {
        let dir = tempdir().unwrap();
        write_file(
            dir.path(),
            GENERATORS_FILE_NAME,
            "id,region_id,technology,capacity,marginal_cost,emissions_factor
coal1,B,coal,150,10,0.85
",
        );

        let err = read_generators(dir.path(), &regions, &snapshots).unwrap_err();
        assert_eq!(err.chain().nth(1).unwrap().to_string(), "Unknown ID B found");
    }

    #[rstest]
    fn test_read_generators_unknown_technology(regions: RegionMap, snapshots: SnapshotSet) {
        let dir = tempdir().unwrap();
        write_file(
            dir.path(),
            GENERATORS_FILE_NAME,
            "id,region_id,technology,capacity,marginal_cost,emissions_factor
fusion1,A,fusion,150,10,0
",
        );

        assert!(read_generators(dir.path(), &regions, &snapshots).is_err());
    }

    #[rstest]
    fn test_read_generators_constant_and_profile(regions: RegionMap, snapshots: SnapshotSet) {
        let dir = tempdir().unwrap();
        write_file(
            dir.path(),
            GENERATORS_FILE_NAME,
            "id,region_id,technology,capacity,marginal_cost,emissions_factor,availability
solar1,A,solar,50,0,0,0.3
",
        );
        write_file(
            dir.path(),
            AVAILABILITY_FILE_NAME,
            &availability_rows("solar1", &snapshots),
        );

        let err = read_generators(dir.path(), &regions, &snapshots).unwrap_err();
        assert_eq!(
            err.chain().nth(1).unwrap().to_string(),
            "Generator solar1 has both a constant availability and an availability profile"
        );
    }

    #[rstest]
    fn test_read_availability_unknown_generator(regions: RegionMap, snapshots: SnapshotSet) {
        let dir = tempdir().unwrap();
        write_file(
            dir.path(),
            GENERATORS_FILE_NAME,
            "id,region_id,technology,capacity,marginal_cost,emissions_factor
coal1,A,coal,150,10,0.85
",
        );
        write_file(
            dir.path(),
            AVAILABILITY_FILE_NAME,
            &availability_rows("wind1", &snapshots),
        );

        let err = read_generators(dir.path(), &regions, &snapshots).unwrap_err();
        assert_eq!(
            err.chain().nth(1).unwrap().to_string(),
            "Unknown ID wind1 found"
        );
    }
}
