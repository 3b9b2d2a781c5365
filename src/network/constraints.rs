//! Code for adding constraints to a dispatch instance.
use super::variables::{FlowVariables, VariableMap};
use super::{Bus, BusMap};
use crate::lp::{LinearProgram, Var};
use crate::region::RegionID;
use crate::snapshot::SnapshotSet;
use crate::storage::StorageID;
use crate::topology::Topology;
use indexmap::IndexMap;

/// Corresponding keys for a block of constraints along with the row offset in the solution
#[derive(Debug, Clone, PartialEq)]
pub struct KeysWithOffset<T> {
    offset: usize,
    keys: Vec<T>,
}

impl<T> KeysWithOffset<T> {
    /// Zip the keys with the corresponding dual values in the solution, accounting for the offset
    pub fn zip_duals<'a>(&'a self, duals: &'a [f64]) -> impl Iterator<Item = (&'a T, f64)> {
        assert!(
            self.offset + self.keys.len() <= duals.len(),
            "Bad constraint keys: dual rows out of range"
        );

        self.keys.iter().zip(duals[self.offset..].iter().copied())
    }

    /// Iterate over the keys along with their row indices
    pub fn iter_rows(&self) -> impl Iterator<Item = (usize, &T)> {
        self.keys
            .iter()
            .enumerate()
            .map(|(idx, key)| (self.offset + idx, key))
    }

    /// The number of constraints in the block
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the block is empty
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Indicates the bus and snapshot index covered by each energy balance constraint
pub type BalanceKeys = KeysWithOffset<(Bus, usize)>;

/// Indicates the storage unit and snapshot index covered by each state-of-charge constraint
pub type StorageKeys = KeysWithOffset<(StorageID, usize)>;

/// The keys for different constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintKeys {
    /// Keys for energy balance constraints
    pub balance_keys: BalanceKeys,
    /// Keys for state-of-charge constraints
    pub storage_keys: StorageKeys,
}

/// Add all constraints to the problem.
///
/// Note: the ordering of constraints is important, as the dual values of the balance constraints
/// must later be retrieved to calculate prices.
pub fn add_constraints(
    lp: &mut LinearProgram,
    variables: &VariableMap,
    topology: &Topology,
    snapshots: &SnapshotSet,
    buses: &BusMap,
    storage_cyclic: bool,
) -> ConstraintKeys {
    let balance_keys = add_balance_constraints(lp, variables, topology, snapshots, buses);
    let storage_keys =
        add_state_of_charge_constraints(lp, variables, topology, snapshots, storage_cyclic);

    ConstraintKeys {
        balance_keys,
        storage_keys,
    }
}

/// Terms contributed to each bus's balance by one snapshot's worth of variables
type BusTerms = IndexMap<Bus, Vec<(Var, f64)>>;

/// Collect the terms each bus gets at snapshot `t`
fn collect_bus_terms(
    variables: &VariableMap,
    topology: &Topology,
    buses: &BusMap,
    t: usize,
) -> BusTerms {
    let mut terms: BusTerms = buses.values().map(|bus| (bus.clone(), Vec::new())).collect();
    let mut push = |region_id: &RegionID, var: Var, coeff: f64| {
        let bus = &buses[region_id];
        terms[bus].push((var, coeff));
    };

    for (generator_id, vars) in &variables.generation {
        let generator = &topology.generators()[generator_id];
        push(&generator.region_id, vars[t], 1.0);
    }

    for (storage_id, vars) in &variables.storage {
        let unit = &topology.storage_units()[storage_id];
        push(&unit.region_id, vars.discharge[t], 1.0);
        push(&unit.region_id, vars.charge[t], -1.0);
    }

    for (link_id, vars) in &variables.flows {
        let link = &topology.links()[link_id];
        match vars {
            FlowVariables::Bidirectional(flow) => {
                push(&link.from_region, flow[t], -1.0);
                push(&link.to_region, flow[t], 1.0);
            }
            FlowVariables::Directional { forward, reverse } => {
                let delivered = link.delivery_factor().value();
                push(&link.from_region, forward[t], -1.0);
                push(&link.to_region, forward[t], delivered);
                push(&link.to_region, reverse[t], -1.0);
                push(&link.from_region, reverse[t], delivered);
            }
        }
    }

    terms
}

/// Add energy balance constraints.
///
/// For every bus and snapshot, generation plus discharge minus charge plus net inflow must equal
/// demand exactly. There is no implicit load shedding: if supply is short the problem is
/// infeasible unless an `unserved_load` generator is present.
fn add_balance_constraints(
    lp: &mut LinearProgram,
    variables: &VariableMap,
    topology: &Topology,
    snapshots: &SnapshotSet,
    buses: &BusMap,
) -> BalanceKeys {
    // Row offset in problem. This line **must** come before we add more constraints.
    let offset = lp.num_rows();

    // Demand is aggregated per bus
    let mut demand: IndexMap<Bus, Vec<f64>> = IndexMap::new();
    for (region_id, profile) in topology.demand() {
        let bus_demand = demand
            .entry(buses[region_id].clone())
            .or_insert_with(|| vec![0.0; snapshots.len()]);
        for (total, value) in bus_demand.iter_mut().zip(profile) {
            *total += value.value();
        }
    }

    let mut rows: IndexMap<Bus, Vec<(Vec<(Var, f64)>, f64)>> = IndexMap::new();
    for t in 0..snapshots.len() {
        for (bus, terms) in collect_bus_terms(variables, topology, buses, t) {
            let rhs = demand[&bus][t];
            rows.entry(bus).or_default().push((terms, rhs));
        }
    }

    // Rows are ordered by bus, then snapshot
    let mut keys = Vec::new();
    for (bus, bus_rows) in rows {
        for (t, (terms, rhs)) in bus_rows.into_iter().enumerate() {
            lp.add_equality(rhs, terms);
            keys.push((bus.clone(), t));
        }
    }

    BalanceKeys { offset, keys }
}

/// Add state-of-charge constraints for storage units.
///
/// For each snapshot:
///
/// `soc[t] - soc[t-1] - eff_store * h * charge[t] + (h / eff_dispatch) * discharge[t] = 0`
///
/// For the first snapshot, `soc[t-1]` is the state of charge at the final snapshot if storage is
/// cyclic. Otherwise it is the (constant) initial energy, which moves to the right-hand side.
fn add_state_of_charge_constraints(
    lp: &mut LinearProgram,
    variables: &VariableMap,
    topology: &Topology,
    snapshots: &SnapshotSet,
    storage_cyclic: bool,
) -> StorageKeys {
    // Row offset in problem. This line **must** come before we add more constraints.
    let offset = lp.num_rows();
    let hours = snapshots.duration().value();
    let last = snapshots.len() - 1;

    let mut keys = Vec::new();
    for (storage_id, vars) in &variables.storage {
        let unit = &topology.storage_units()[storage_id];
        let store_coeff = -unit.efficiency_store.value() * hours;
        let dispatch_coeff = hours / unit.efficiency_dispatch.value();

        for t in 0..snapshots.len() {
            let mut terms = vec![
                (vars.state_of_charge[t], 1.0),
                (vars.charge[t], store_coeff),
                (vars.discharge[t], dispatch_coeff),
            ];
            let rhs = match (t, storage_cyclic) {
                (0, true) => {
                    terms.push((vars.state_of_charge[last], -1.0));
                    0.0
                }
                (0, false) => unit.initial_energy().value(),
                _ => {
                    terms.push((vars.state_of_charge[t - 1], -1.0));
                    0.0
                }
            };

            lp.add_equality(rhs, terms);
            keys.push((storage_id.clone(), t));
        }
    }

    StorageKeys { offset, keys }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{snapshots, topology_with_storage, two_region_topology};
    use crate::network::DispatchConfig;
    use crate::network::variables::add_variables;
    use rstest::rstest;

    fn region_buses(topology: &Topology) -> BusMap {
        topology
            .regions()
            .keys()
            .map(|id| (id.clone(), Bus::Region(id.clone())))
            .collect()
    }

    #[rstest]
    fn test_balance_rows(topology_with_storage: Topology, snapshots: SnapshotSet) {
        let mut lp = LinearProgram::default();
        let config = DispatchConfig::default();
        let variables = add_variables(&mut lp, &topology_with_storage, &snapshots, &config);
        let buses = region_buses(&topology_with_storage);
        let keys = add_constraints(
            &mut lp,
            &variables,
            &topology_with_storage,
            &snapshots,
            &buses,
            true,
        );

        assert_eq!(keys.balance_keys.len(), 24);
        assert_eq!(keys.storage_keys.len(), 24);
        let (row_idx, key) = keys.balance_keys.iter_rows().nth(3).unwrap();
        assert_eq!(*key, (Bus::Region(RegionID::new("A")), 3));

        let row = &lp.rows()[row_idx];
        assert_eq!((row.lower, row.upper), (100.0, 100.0));
        let storage = &variables.storage["store1"];
        assert_eq!(
            row.terms,
            [
                (variables.generation["gen1"][3], 1.0),
                (storage.discharge[3], 1.0),
                (storage.charge[3], -1.0)
            ]
        );
    }

    #[rstest]
    #[case(true, 0.0)]
    #[case(false, 50.0)]
    fn test_first_soc_row(
        topology_with_storage: Topology,
        snapshots: SnapshotSet,
        #[case] cyclic: bool,
        #[case] rhs: f64,
    ) {
        let mut lp = LinearProgram::default();
        let config = DispatchConfig::default();
        let variables = add_variables(&mut lp, &topology_with_storage, &snapshots, &config);
        let buses = region_buses(&topology_with_storage);
        let keys = add_constraints(
            &mut lp,
            &variables,
            &topology_with_storage,
            &snapshots,
            &buses,
            cyclic,
        );

        let (row_idx, _) = keys.storage_keys.iter_rows().next().unwrap();
        let row = &lp.rows()[row_idx];
        assert_eq!(row.lower, rhs);

        let storage = &variables.storage["store1"];
        let wraps = row
            .terms
            .iter()
            .any(|(var, coeff)| *var == storage.state_of_charge[23] && *coeff == -1.0);
        assert_eq!(wraps, cyclic);
        assert!(row.terms.contains(&(storage.charge[0], -0.9)));
        assert!(row.terms.contains(&(storage.discharge[0], 1.0)));
    }

    #[rstest]
    fn test_lossy_link_terms(two_region_topology: Topology, snapshots: SnapshotSet) {
        let mut topology = two_region_topology;
        let mut links = topology.links().clone();
        links[0].loss_factor = crate::units::Dimensionless(0.1);
        topology = Topology::new(
            topology.regions().clone(),
            topology.generators().clone(),
            topology.storage_units().clone(),
            links,
            topology.demand().clone(),
        )
        .unwrap();

        let mut lp = LinearProgram::default();
        let config = DispatchConfig {
            multi_region: true,
            ..Default::default()
        };
        let variables = add_variables(&mut lp, &topology, &snapshots, &config);
        let buses = region_buses(&topology);
        let keys = add_constraints(&mut lp, &variables, &topology, &snapshots, &buses, true);

        let FlowVariables::Directional { forward, reverse } = &variables.flows["A-B"] else {
            panic!("Lossy link should have directional flow variables");
        };
        let (row_b, key) = keys.balance_keys.iter_rows().nth(24).unwrap();
        assert_eq!(*key, (Bus::Region(RegionID::new("B")), 0));
        let terms = &lp.rows()[row_b].terms;
        assert!(terms.contains(&(forward[0], 0.9)));
        assert!(terms.contains(&(reverse[0], -1.0)));
    }
}
