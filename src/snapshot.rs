//! The set of time points over which dispatch is optimised.
use crate::error::ConfigurationError;
use crate::units::Hours;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// The duration represented by each snapshot
pub const SNAPSHOT_DURATION: Hours = Hours(1.0);

/// An ordered, strictly increasing, non-empty sequence of hourly time points.
///
/// All time-varying quantities in a model are indexed by position in this set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<NaiveDateTime>", into = "Vec<NaiveDateTime>")]
pub struct SnapshotSet(Vec<NaiveDateTime>);

impl SnapshotSet {
    /// Create a snapshot set from the given timestamps.
    ///
    /// Fails if the timestamps are empty or not strictly increasing.
    pub fn new(timestamps: Vec<NaiveDateTime>) -> Result<Self, ConfigurationError> {
        if timestamps.is_empty() {
            return Err(ConfigurationError::new(
                "snapshot set",
                "timestamps",
                "must contain at least one snapshot",
            ));
        }

        if let Some(idx) = timestamps.windows(2).position(|w| w[0] >= w[1]) {
            return Err(ConfigurationError::new(
                "snapshot set",
                "timestamps",
                format!(
                    "must be strictly increasing, but {} is followed by {}",
                    timestamps[idx],
                    timestamps[idx + 1]
                ),
            ));
        }

        Ok(Self(timestamps))
    }

    /// Create `count` consecutive hourly snapshots, starting at `start`
    pub fn hourly(start: NaiveDateTime, count: usize) -> Result<Self, ConfigurationError> {
        let timestamps = (0..count)
            .map(|i| {
                i64::try_from(i)
                    .ok()
                    .and_then(|hours| start.checked_add_signed(Duration::hours(hours)))
                    .ok_or_else(|| {
                        ConfigurationError::new("snapshot set", "snapshots", "too many snapshots")
                    })
            })
            .collect::<Result<_, _>>()?;

        Self::new(timestamps)
    }

    /// The number of snapshots
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; a snapshot set cannot be empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the timestamps in order
    pub fn iter(&self) -> impl Iterator<Item = &NaiveDateTime> {
        self.0.iter()
    }

    /// The timestamps as a slice
    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.0
    }

    /// The timestamp at index `idx`
    pub fn get(&self, idx: usize) -> Option<&NaiveDateTime> {
        self.0.get(idx)
    }

    /// The duration of each snapshot
    pub fn duration(&self) -> Hours {
        SNAPSHOT_DURATION
    }

    /// Total duration of the horizon
    pub fn total_duration(&self) -> Hours {
        Hours(SNAPSHOT_DURATION.value() * self.len() as f64)
    }

    /// Check that a time series for `entity` has one value per snapshot
    pub fn check_aligned(
        &self,
        entity: impl std::fmt::Display,
        field: &str,
        series_len: usize,
    ) -> Result<(), ConfigurationError> {
        if series_len == self.len() {
            Ok(())
        } else {
            Err(ConfigurationError::new(
                entity,
                field,
                format!(
                    "has {series_len} value(s) but there are {} snapshot(s)",
                    self.len()
                ),
            ))
        }
    }
}

impl TryFrom<Vec<NaiveDateTime>> for SnapshotSet {
    type Error = ConfigurationError;

    fn try_from(value: Vec<NaiveDateTime>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SnapshotSet> for Vec<NaiveDateTime> {
    fn from(value: SnapshotSet) -> Self {
        value.0
    }
}
