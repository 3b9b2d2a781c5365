//! Fixtures for tests

use crate::generator::{Generator, Technology};
use crate::link::TransmissionLink;
use crate::network::DispatchConfig;
use crate::region::{Region, RegionID, RegionMap};
use crate::snapshot::SnapshotSet;
use crate::storage::StorageUnit;
use crate::topology::{DemandMap, Topology};
use crate::units::{Dimensionless, EmissionsPerEnergy, Energy, MoneyPerEnergy, Power};
use chrono::{NaiveDate, NaiveDateTime};
use indexmap::indexmap;
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// Assert that a typed (non-`anyhow`) error with the given message occurs
macro_rules! assert_config_error {
    ($result:expr, $msg:expr) => {
        assert_eq!($result.unwrap_err().to_string(), $msg);
    };
}
pub(crate) use assert_config_error;

/// Number of snapshots used by fixtures
pub const N_SNAPSHOTS: usize = 24;

#[fixture]
pub fn start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 7, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

#[fixture]
pub fn snapshots(start_time: NaiveDateTime) -> SnapshotSet {
    SnapshotSet::hourly(start_time, N_SNAPSHOTS).unwrap()
}

fn region(id: &str) -> Region {
    Region {
        id: id.into(),
        description: format!("Region {id}"),
    }
}

#[fixture]
pub fn regions() -> RegionMap {
    indexmap! {"A".into() => region("A")}
}

#[fixture]
pub fn two_regions() -> RegionMap {
    indexmap! {"A".into() => region("A"), "B".into() => region("B")}
}

#[fixture]
pub fn demand() -> DemandMap {
    indexmap! {RegionID::new("A") => vec![Power(100.0); N_SNAPSHOTS]}
}

#[fixture]
pub fn generator() -> Generator {
    Generator {
        id: "gen1".into(),
        region_id: "A".into(),
        technology: Technology::Coal,
        capacity: Power(150.0),
        marginal_cost: MoneyPerEnergy(10.0),
        emissions_factor: EmissionsPerEnergy(0.85),
        availability: vec![Dimensionless(1.0); N_SNAPSHOTS],
    }
}

#[fixture]
pub fn storage_unit() -> StorageUnit {
    StorageUnit {
        id: "store1".into(),
        region_id: "A".into(),
        power_capacity: Power(20.0),
        energy_capacity: Energy(100.0),
        efficiency_store: Dimensionless(0.9),
        efficiency_dispatch: Dimensionless(1.0),
        initial_soc: Dimensionless(0.5),
        marginal_cost: MoneyPerEnergy(0.0),
    }
}

#[fixture]
pub fn link() -> TransmissionLink {
    TransmissionLink {
        id: "A-B".into(),
        from_region: "A".into(),
        to_region: "B".into(),
        capacity: Power(50.0),
        reverse_capacity: None,
        loss_factor: Dimensionless(0.0),
    }
}

/// A single region with one generator and flat demand of 100
#[fixture]
pub fn topology(regions: RegionMap, generator: Generator, demand: DemandMap) -> Topology {
    Topology::new(
        regions,
        indexmap! {generator.id.clone() => generator},
        indexmap! {},
        indexmap! {},
        demand,
    )
    .unwrap()
}

/// A single region with a generator and a storage unit
#[fixture]
pub fn topology_with_storage(
    regions: RegionMap,
    generator: Generator,
    storage_unit: StorageUnit,
    demand: DemandMap,
) -> Topology {
    Topology::new(
        regions,
        indexmap! {generator.id.clone() => generator},
        indexmap! {storage_unit.id.clone() => storage_unit},
        indexmap! {},
        demand,
    )
    .unwrap()
}

/// Two regions joined by a link: cheap surplus in A, expensive generation in B
#[fixture]
pub fn two_region_topology(two_regions: RegionMap, link: TransmissionLink) -> Topology {
    let cheap = Generator {
        id: "cheap".into(),
        region_id: "A".into(),
        technology: Technology::Coal,
        capacity: Power(200.0),
        marginal_cost: MoneyPerEnergy(10.0),
        emissions_factor: EmissionsPerEnergy(0.85),
        availability: vec![Dimensionless(1.0); N_SNAPSHOTS],
    };
    let expensive = Generator {
        id: "expensive".into(),
        region_id: "B".into(),
        technology: Technology::Gas,
        capacity: Power(200.0),
        marginal_cost: MoneyPerEnergy(50.0),
        emissions_factor: EmissionsPerEnergy(0.4),
        availability: vec![Dimensionless(1.0); N_SNAPSHOTS],
    };
    let demand = indexmap! {
        RegionID::new("A") => vec![Power(50.0); N_SNAPSHOTS],
        RegionID::new("B") => vec![Power(100.0); N_SNAPSHOTS],
    };

    Topology::new(
        two_regions,
        indexmap! {cheap.id.clone() => cheap, expensive.id.clone() => expensive},
        indexmap! {},
        indexmap! {link.id.clone() => link},
        demand,
    )
    .unwrap()
}

#[fixture]
pub fn config() -> DispatchConfig {
    DispatchConfig::default()
}
