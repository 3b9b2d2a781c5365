//! The topology of a power system: its regions, the units connected to them and regional demand.
use crate::error::ConfigurationError;
use crate::generator::{Generator, GeneratorMap};
use crate::id::{HasID, IDLike};
use crate::link::{LinkMap, TransmissionLink};
use crate::region::{RegionID, RegionMap};
use crate::storage::{StorageMap, StorageUnit};
use crate::units::{Dimensionless, Power};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Demand profiles, keyed by region
pub type DemandMap = IndexMap<RegionID, Vec<Power>>;

/// A validated set of regions, generators, storage units, links and demand.
///
/// Immutable once constructed. Deserialising goes through the same validation as [`Topology::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TopologyData")]
pub struct Topology {
    regions: RegionMap,
    generators: GeneratorMap,
    storage_units: StorageMap,
    links: LinkMap,
    demand: DemandMap,
}

/// The unvalidated contents of a [`Topology`]
#[derive(Deserialize)]
struct TopologyData {
    regions: RegionMap,
    generators: GeneratorMap,
    storage_units: StorageMap,
    links: LinkMap,
    demand: DemandMap,
}

impl TryFrom<TopologyData> for Topology {
    type Error = ConfigurationError;

    fn try_from(data: TopologyData) -> Result<Self, Self::Error> {
        Self::new(
            data.regions,
            data.generators,
            data.storage_units,
            data.links,
            data.demand,
        )
    }
}

/// Check that `value` is finite and strictly positive
fn check_positive(entity: &str, field: &str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::new(
            entity,
            field,
            format!("must be a finite number greater than zero, got {value}"),
        ))
    }
}

/// Check that `value` is finite and not negative
fn check_non_negative(entity: &str, field: &str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::new(
            entity,
            field,
            format!("must be finite and non-negative, got {value}"),
        ))
    }
}

/// Check that `value` lies in [0, 1]
fn check_proportion(
    entity: &str,
    field: &str,
    value: Dimensionless,
) -> Result<(), ConfigurationError> {
    if (0.0..=1.0).contains(&value.value()) {
        Ok(())
    } else {
        Err(ConfigurationError::new(
            entity,
            field,
            format!("must be between 0 and 1, got {}", value.value()),
        ))
    }
}

/// Check that `region_id` is one of `regions`
fn check_region(
    entity: &str,
    field: &str,
    region_id: &RegionID,
    regions: &RegionMap,
) -> Result<(), ConfigurationError> {
    if regions.contains_key(region_id) {
        Ok(())
    } else {
        Err(ConfigurationError::new(
            entity,
            field,
            format!("unknown region {region_id}"),
        ))
    }
}

/// Check that every entry of `map` is stored under its own ID
fn check_keys<ID, T>(kind: &str, map: &IndexMap<ID, T>) -> Result<(), ConfigurationError>
where
    ID: IDLike,
    T: HasID<ID>,
{
    match map.iter().find(|&(key, value)| value.get_id() != key) {
        Some((key, value)) => Err(ConfigurationError::new(
            format!("{kind} {key}"),
            "id",
            format!("does not match its key (got {})", value.get_id()),
        )),
        None => Ok(()),
    }
}

fn validate_generator(
    generator: &Generator,
    regions: &RegionMap,
) -> Result<(), ConfigurationError> {
    let entity = format!("generator {}", generator.id);
    check_region(&entity, "region_id", &generator.region_id, regions)?;
    // Retired or not-yet-built units are supplied with zero capacity
    check_non_negative(&entity, "capacity", generator.capacity.value())?;

    if !generator.marginal_cost.is_finite() {
        return Err(ConfigurationError::new(&entity, "marginal_cost", "must be finite"));
    }
    check_non_negative(&entity, "emissions_factor", generator.emissions_factor.value())?;

    for value in &generator.availability {
        check_proportion(&entity, "availability", *value)?;
    }

    Ok(())
}

fn validate_storage_unit(
    unit: &StorageUnit,
    regions: &RegionMap,
) -> Result<(), ConfigurationError> {
    let entity = format!("storage unit {}", unit.id);
    check_region(&entity, "region_id", &unit.region_id, regions)?;
    check_positive(&entity, "power_capacity", unit.power_capacity.value())?;
    check_positive(&entity, "energy_capacity", unit.energy_capacity.value())?;
    check_positive(&entity, "efficiency_store", unit.efficiency_store.value())?;
    check_positive(&entity, "efficiency_dispatch", unit.efficiency_dispatch.value())?;
    check_proportion(&entity, "initial_soc", unit.initial_soc)?;

    if !unit.marginal_cost.is_finite() {
        return Err(ConfigurationError::new(&entity, "marginal_cost", "must be finite"));
    }

    Ok(())
}

fn validate_link(link: &TransmissionLink, regions: &RegionMap) -> Result<(), ConfigurationError> {
    let entity = format!("link {}", link.id);
    check_region(&entity, "from_region", &link.from_region, regions)?;
    check_region(&entity, "to_region", &link.to_region, regions)?;
    if link.from_region == link.to_region {
        return Err(ConfigurationError::new(&entity, "to_region", "must differ from from_region"));
    }

    check_positive(&entity, "capacity", link.capacity.value())?;
    if let Some(reverse) = link.reverse_capacity {
        check_non_negative(&entity, "reverse_capacity", reverse.value())?;
    }

    let loss = link.loss_factor.value();
    if !(0.0..1.0).contains(&loss) {
        return Err(ConfigurationError::new(
            &entity,
            "loss_factor",
            format!("must be in the range [0, 1), got {loss}"),
        ));
    }

    Ok(())
}

fn validate_demand(demand: &DemandMap, regions: &RegionMap) -> Result<(), ConfigurationError> {
    for region_id in demand.keys() {
        check_region("demand", "region_id", region_id, regions)?;
    }

    for region_id in regions.keys() {
        let entity = format!("region {region_id}");
        let Some(profile) = demand.get(region_id) else {
            return Err(ConfigurationError::new(
                &entity,
                "demand",
                "no demand profile provided",
            ));
        };

        if let Some((t, value)) = profile
            .iter()
            .enumerate()
            .find(|(_, value)| !(value.is_finite() && value.value() >= 0.0))
        {
            return Err(ConfigurationError::new(
                &entity,
                "demand",
                format!(
                    "must be finite and non-negative, got {} at snapshot {t}",
                    value.value()
                ),
            ));
        }
    }

    Ok(())
}

impl Topology {
    /// Create a new [`Topology`], checking that it is internally consistent.
    ///
    /// Every entity must be stored under its own ID and every unit must be connected to a known
    /// region. Links must join two distinct regions. Generator capacities may be zero but storage
    /// and link capacities and efficiencies must be strictly positive. Every region needs a demand
    /// profile.
    pub fn new(
        regions: RegionMap,
        generators: GeneratorMap,
        storage_units: StorageMap,
        links: LinkMap,
        demand: DemandMap,
    ) -> Result<Self, ConfigurationError> {
        if regions.is_empty() {
            return Err(ConfigurationError::new(
                "topology",
                "regions",
                "at least one region is required",
            ));
        }

        check_keys("region", &regions)?;
        check_keys("generator", &generators)?;
        check_keys("storage unit", &storage_units)?;
        check_keys("link", &links)?;

        for generator in generators.values() {
            validate_generator(generator, &regions)?;
        }
        for unit in storage_units.values() {
            validate_storage_unit(unit, &regions)?;
        }
        for link in links.values() {
            validate_link(link, &regions)?;
        }
        validate_demand(&demand, &regions)?;

        Ok(Self {
            regions,
            generators,
            storage_units,
            links,
            demand,
        })
    }

    /// The regions (buses) of the network
    pub fn regions(&self) -> &RegionMap {
        &self.regions
    }

    /// All generators
    pub fn generators(&self) -> &GeneratorMap {
        &self.generators
    }

    /// All storage units
    pub fn storage_units(&self) -> &StorageMap {
        &self.storage_units
    }

    /// All transmission links
    pub fn links(&self) -> &LinkMap {
        &self.links
    }

    /// Demand profiles for every region
    pub fn demand(&self) -> &DemandMap {
        &self.demand
    }

    /// Demand summed over all regions at snapshot `t`
    pub fn total_demand_at(&self, t: usize) -> Power {
        self.demand.values().map(|profile| profile[t]).sum()
    }
}
