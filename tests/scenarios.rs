//! End-to-end dispatch scenarios solved with HiGHS.
use chrono::{NaiveDate, NaiveDateTime};
use float_cmp::assert_approx_eq;
use indexmap::{IndexMap, indexmap};
use powerdispatch::error::SolveFailure;
use powerdispatch::generator::{Generator, Technology};
use powerdispatch::input::load_model;
use powerdispatch::link::TransmissionLink;
use powerdispatch::network::{DispatchConfig, build};
use powerdispatch::optimisation::{DispatchResult, solve};
use powerdispatch::region::{Region, RegionID};
use powerdispatch::results::{emissions_summary, generation_summary};
use powerdispatch::snapshot::SnapshotSet;
use powerdispatch::storage::{StorageMap, StorageUnit};
use powerdispatch::topology::Topology;
use powerdispatch::units::{Dimensionless, EmissionsPerEnergy, Energy, MoneyPerEnergy, Power};
use std::fmt::Display;

const N_SNAPSHOTS: usize = 24;

/// Tolerance on quantities read back from the solver
const EPSILON: f64 = 1e-6;

/// Relative tolerance used by [`check_invariants`]
const TOLERANCE: f64 = 1e-5;

fn snapshots() -> SnapshotSet {
    let start: NaiveDateTime = NaiveDate::from_ymd_opt(2023, 7, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    SnapshotSet::hourly(start, N_SNAPSHOTS).unwrap()
}

fn region(id: &str) -> (RegionID, Region) {
    let id = RegionID::new(id);
    let region = Region {
        id: id.clone(),
        description: String::new(),
    };
    (id, region)
}

fn generator(id: &str, region_id: &str, capacity: f64, marginal_cost: f64) -> Generator {
    Generator {
        id: id.into(),
        region_id: region_id.into(),
        technology: Technology::Coal,
        capacity: Power(capacity),
        marginal_cost: MoneyPerEnergy(marginal_cost),
        emissions_factor: EmissionsPerEnergy(0.0),
        availability: vec![Dimensionless(1.0); N_SNAPSHOTS],
    }
}

/// A single region "A" with flat demand
fn single_region(generators: Vec<Generator>, storage: StorageMap, demand: f64) -> Topology {
    Topology::new(
        IndexMap::from_iter([region("A")]),
        generators.into_iter().map(|g| (g.id.clone(), g)).collect(),
        storage,
        indexmap! {},
        indexmap! {RegionID::new("A") => vec![Power(demand); N_SNAPSHOTS]},
    )
    .unwrap()
}

fn dispatch(topology: &Topology, config: &DispatchConfig) -> Result<DispatchResult, SolveFailure> {
    let instance = build(topology, &snapshots(), config).unwrap();
    solve(&instance, "highs")
}

fn assert_close(actual: f64, expected: f64, what: impl Display) {
    let tolerance = TOLERANCE * expected.abs().max(1.0);
    assert!(
        (actual - expected).abs() <= tolerance,
        "{what}: expected {expected}, got {actual}"
    );
}

fn assert_within(value: f64, upper: f64, what: impl Display) {
    let tolerance = TOLERANCE * upper.abs().max(1.0);
    assert!(
        value >= -tolerance && value <= upper + tolerance,
        "{what}: {value} is outside [0, {upper}]"
    );
}

/// Check what every optimal dispatch must satisfy.
///
/// Supply meets demand at every bus and snapshot, after link losses. Generator output stays within
/// available capacity, flows within link limits and state of charge within the reservoir. State
/// of charge follows from charging and discharging, starting from the final state if storage is
/// cyclic and from the initial charge otherwise.
fn check_invariants(topology: &Topology, result: &DispatchResult) {
    let n = result.snapshots.len();
    let hours = result.snapshots.duration().value();
    let mut supply: IndexMap<RegionID, Vec<f64>> = topology
        .regions()
        .keys()
        .map(|id| (id.clone(), vec![0.0; n]))
        .collect();

    for (id, output) in &result.generation {
        let generator = &topology.generators()[id];
        for (t, value) in output.iter().enumerate() {
            let limit = generator.max_output(t).value();
            assert_within(value.value(), limit, format_args!("generator {id} at {t}"));
            supply[&generator.region_id][t] += value.value();
        }
    }

    for (id, dispatch) in &result.storage {
        let unit = &topology.storage_units()[id];
        let energy_capacity = unit.energy_capacity.value();
        let mut previous = if result.config.storage_cyclic {
            dispatch.state_of_charge[n - 1].value()
        } else {
            unit.initial_energy().value()
        };

        for t in 0..n {
            let charge = dispatch.charge[t].value();
            let discharge = dispatch.discharge[t].value();
            let soc = dispatch.state_of_charge[t].value();
            let power_capacity = unit.power_capacity.value();
            assert_within(charge, power_capacity, format_args!("charge of {id} at {t}"));
            assert_within(discharge, power_capacity, format_args!("discharge of {id} at {t}"));
            assert_within(soc, energy_capacity, format_args!("state of charge of {id} at {t}"));

            let stored = unit.efficiency_store.value() * charge;
            let released = discharge / unit.efficiency_dispatch.value();
            assert_close(
                soc,
                previous + hours * (stored - released),
                format_args!("state of charge of {id} at {t}"),
            );
            previous = soc;

            supply[&unit.region_id][t] += discharge - charge;
        }
    }

    for (id, flows) in &result.flows {
        let link = &topology.links()[id];
        let delivered = link.delivery_factor().value();
        for t in 0..n {
            let forward = flows.forward[t].value();
            let reverse = flows.reverse[t].value();
            assert_within(forward, link.capacity.value(), format_args!("link {id} at {t}"));
            assert_within(reverse, link.reverse_limit().value(), format_args!("link {id} at {t}"));

            supply[&link.from_region][t] += delivered * reverse - forward;
            supply[&link.to_region][t] += delivered * forward - reverse;
        }
    }

    for t in 0..n {
        if result.config.multi_region {
            for (region_id, profile) in topology.demand() {
                assert_close(
                    supply[region_id][t],
                    profile[t].value(),
                    format_args!("balance of region {region_id} at {t}"),
                );
            }
        } else {
            let total: f64 = supply.values().map(|series| series[t]).sum();
            let demand = topology.total_demand_at(t).value();
            assert_close(total, demand, format_args!("system balance at {t}"));
        }
    }
}

/// Regions A and B joined by a 50 MW link, with cheap surplus in A
fn two_regions(loss_factor: f64) -> Topology {
    let link = TransmissionLink {
        id: "A-B".into(),
        from_region: "A".into(),
        to_region: "B".into(),
        capacity: Power(50.0),
        reverse_capacity: None,
        loss_factor: Dimensionless(loss_factor),
    };
    let generators = [
        generator("cheap", "A", 200.0, 10.0),
        generator("expensive", "B", 100.0, 50.0),
    ];
    Topology::new(
        IndexMap::from_iter([region("A"), region("B")]),
        generators.into_iter().map(|g| (g.id.clone(), g)).collect(),
        indexmap! {},
        indexmap! {link.id.clone() => link},
        indexmap! {
            RegionID::new("A") => vec![Power(50.0); N_SNAPSHOTS],
            RegionID::new("B") => vec![Power(100.0); N_SNAPSHOTS],
        },
    )
    .unwrap()
}

fn battery(initial_soc: f64) -> StorageUnit {
    StorageUnit {
        id: "battery".into(),
        region_id: "A".into(),
        power_capacity: Power(20.0),
        energy_capacity: Energy(100.0),
        efficiency_store: Dimensionless(0.9),
        efficiency_dispatch: Dimensionless(1.0),
        initial_soc: Dimensionless(initial_soc),
        marginal_cost: MoneyPerEnergy(0.0),
    }
}

#[test]
fn test_flat_demand_single_generator() {
    let topology = single_region(vec![generator("gen", "A", 150.0, 10.0)], indexmap! {}, 100.0);
    let result = dispatch(&topology, &DispatchConfig::default()).unwrap();
    check_invariants(&topology, &result);

    for output in &result.generation["gen"] {
        assert_approx_eq!(f64, output.value(), 100.0, epsilon = EPSILON);
    }
    assert_approx_eq!(f64, result.objective_value.value(), 24_000.0, epsilon = EPSILON);
    for price in &result.prices["A"] {
        assert_approx_eq!(f64, price.value(), 10.0, epsilon = EPSILON);
    }
}

#[test]
fn test_demand_exceeds_capacity() {
    let topology = single_region(vec![generator("gen", "A", 100.0, 10.0)], indexmap! {}, 120.0);
    let Err(SolveFailure::Infeasible(err)) = dispatch(&topology, &DispatchConfig::default()) else {
        panic!("Expected an infeasible dispatch");
    };

    assert_eq!(err.shortfalls.len(), N_SNAPSHOTS);
    for (t, shortfall) in err.shortfalls.iter().enumerate() {
        assert_eq!(shortfall.bus, "system");
        assert_eq!(shortfall.snapshot, t);
        assert_approx_eq!(f64, shortfall.shortfall.value(), 20.0, epsilon = EPSILON);
    }
}

#[test]
fn test_link_relieves_expensive_region() {
    let topology = two_regions(0.0);
    let config = DispatchConfig {
        multi_region: true,
        ..Default::default()
    };
    let result = dispatch(&topology, &config).unwrap();
    check_invariants(&topology, &result);

    let flows = &result.flows["A-B"];
    for t in 0..N_SNAPSHOTS {
        assert_approx_eq!(f64, flows.net(t).value(), 50.0, epsilon = EPSILON);
        assert_approx_eq!(
            f64,
            result.generation["expensive"][t].value(),
            50.0,
            epsilon = EPSILON
        );
    }
    assert_approx_eq!(
        f64,
        result.objective_value.value(),
        3500.0 * N_SNAPSHOTS as f64,
        epsilon = EPSILON
    );
    assert_approx_eq!(f64, result.prices["A"][0].value(), 10.0, epsilon = EPSILON);
    assert_approx_eq!(f64, result.prices["B"][0].value(), 50.0, epsilon = EPSILON);
}

#[test]
fn test_lossy_link_delivers_less() {
    let topology = two_regions(0.1);
    let config = DispatchConfig {
        multi_region: true,
        ..Default::default()
    };
    let result = dispatch(&topology, &config).unwrap();
    check_invariants(&topology, &result);

    // 50 MW sent from A, 45 MW arriving in B
    for t in 0..N_SNAPSHOTS {
        assert_approx_eq!(f64, result.flows["A-B"].forward[t].value(), 50.0, epsilon = EPSILON);
        assert_approx_eq!(f64, result.flows["A-B"].reverse[t].value(), 0.0, epsilon = EPSILON);
        assert_approx_eq!(f64, result.generation["cheap"][t].value(), 100.0, epsilon = EPSILON);
        assert_approx_eq!(
            f64,
            result.generation["expensive"][t].value(),
            55.0,
            epsilon = EPSILON
        );
    }
    assert_approx_eq!(
        f64,
        result.objective_value.value(),
        3750.0 * N_SNAPSHOTS as f64,
        epsilon = 1e-4
    );
    assert_approx_eq!(f64, result.prices["A"][0].value(), 10.0, epsilon = EPSILON);
    assert_approx_eq!(f64, result.prices["B"][0].value(), 50.0, epsilon = EPSILON);
}

#[test]
fn test_storage_shifts_cheap_energy() {
    // Cheap power is only available for the first half of the day
    let mut cheap = generator("cheap", "A", 50.0, 5.0);
    for value in &mut cheap.availability[N_SNAPSHOTS / 2..] {
        *value = Dimensionless(0.0);
    }
    let expensive = generator("expensive", "A", 50.0, 100.0);
    let battery = battery(0.0);
    let topology = single_region(
        vec![cheap, expensive],
        indexmap! {battery.id.clone() => battery},
        10.0,
    );
    let result = dispatch(&topology, &DispatchConfig::default()).unwrap();
    check_invariants(&topology, &result);

    let storage = &result.storage["battery"];
    let charged: f64 = storage.charge.iter().map(|p| p.value()).sum();
    let discharged: f64 = storage.discharge.iter().map(|p| p.value()).sum();
    assert_approx_eq!(f64, discharged, 100.0, epsilon = EPSILON);
    assert_approx_eq!(f64, charged, 100.0 / 0.9, epsilon = EPSILON);
    assert!(discharged < charged);

    // Charging happens while cheap power is available, discharging afterwards
    for t in N_SNAPSHOTS / 2..N_SNAPSHOTS {
        assert_approx_eq!(f64, storage.charge[t].value(), 0.0, epsilon = EPSILON);
    }
    for t in 0..N_SNAPSHOTS / 2 {
        assert_approx_eq!(f64, storage.discharge[t].value(), 0.0, epsilon = EPSILON);
    }

    // Cyclic: the first snapshot starts from the final state of charge
    let last = storage.state_of_charge[N_SNAPSHOTS - 1].value();
    let before_first = storage.state_of_charge[0].value() - 0.9 * storage.charge[0].value()
        + storage.discharge[0].value();
    assert_approx_eq!(f64, before_first, last, epsilon = EPSILON);

    let expected_cost = 5.0 * (10.0 * 12.0 + 100.0 / 0.9) + 100.0 * 20.0;
    assert_approx_eq!(
        f64,
        result.objective_value.value(),
        expected_cost,
        epsilon = 1e-4
    );
}

#[test]
fn test_resolve_gives_same_cost() {
    let mut gas = generator("gas", "A", 80.0, 30.0);
    gas.emissions_factor = EmissionsPerEnergy(0.4);
    let topology = single_region(
        vec![generator("coal", "A", 60.0, 10.0), gas],
        indexmap! {},
        100.0,
    );
    let instance = build(&topology, &snapshots(), &DispatchConfig::default()).unwrap();
    let first = solve(&instance, "highs").unwrap();
    let second = solve(&instance, "highs").unwrap();
    check_invariants(&topology, &first);

    assert_approx_eq!(
        f64,
        first.objective_value.value(),
        second.objective_value.value(),
        epsilon = EPSILON
    );

    // Only gas emits: 40 MW for 24 hours at 0.4 t/MWh
    let emissions = emissions_summary(&first, &topology);
    assert_approx_eq!(f64, emissions.total.value(), 384.0, epsilon = 1e-4);
}

#[test]
fn test_storage_starts_from_initial_charge() {
    // Half full at the start, with nothing cheap to refill it from
    let battery = battery(0.5);
    let topology = single_region(
        vec![generator("expensive", "A", 50.0, 100.0)],
        indexmap! {battery.id.clone() => battery},
        10.0,
    );
    let config = DispatchConfig {
        storage_cyclic: false,
        ..Default::default()
    };
    let result = dispatch(&topology, &config).unwrap();
    check_invariants(&topology, &result);

    let storage = &result.storage["battery"];
    let discharged: f64 = storage.discharge.iter().map(|p| p.value()).sum();
    assert_approx_eq!(f64, discharged, 50.0, epsilon = EPSILON);
    assert_approx_eq!(
        f64,
        storage.state_of_charge[N_SNAPSHOTS - 1].value(),
        0.0,
        epsilon = EPSILON
    );
    assert_approx_eq!(
        f64,
        result.objective_value.value(),
        100.0 * (10.0 * N_SNAPSHOTS as f64 - 50.0),
        epsilon = 1e-4
    );
}

#[test]
fn test_zero_capacity_generator() {
    let mut retired = generator("retired", "A", 0.0, 1.0);
    retired.technology = Technology::Gas;
    let topology = single_region(
        vec![generator("coal", "A", 150.0, 10.0), retired],
        indexmap! {},
        100.0,
    );
    let result = dispatch(&topology, &DispatchConfig::default()).unwrap();
    check_invariants(&topology, &result);

    assert!(result.generation["retired"].iter().all(|p| *p == Power(0.0)));
    let gas = &generation_summary(&result, &topology).by_technology[&Technology::Gas];
    assert_eq!(gas.capacity, Power(0.0));
    assert_eq!(gas.capacity_factor, Dimensionless(0.0));
}

#[test]
fn test_regional_demo_invariants() {
    let model = load_model("demos/guangdong_regional").unwrap();
    let instance = build(&model.topology, &model.snapshots, &model.dispatch_config()).unwrap();
    let result = solve(&instance, &model.parameters.solver).unwrap();
    check_invariants(&model.topology, &result);
}
