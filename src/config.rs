//! System configuration and floor bounds.

use std::time::Duration;

use crate::error::{DispatchError, DispatchResult};
use crate::types::Floor;

pub const DEFAULT_UNITS: usize = 3;
pub const DEFAULT_CAPACITY: usize = 5;
pub const DEFAULT_MIN_FLOOR: Floor = 1;
pub const DEFAULT_MAX_FLOOR: Floor = 15;
pub const DEFAULT_FLOOR_DELAY_MS: u64 = 50;

/// Inclusive range of floors the controller accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FloorRange {
    min: Floor,
    max: Floor,
}

impl FloorRange {
    pub fn new(min: Floor, max: Floor) -> DispatchResult<Self> {
        if min > max {
            return Err(DispatchError::Config(format!(
                "min_floor {min} is above max_floor {max}"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> Floor {
        self.min
    }

    pub fn max(&self) -> Floor {
        self.max
    }

    pub fn contains(&self, floor: Floor) -> bool {
        (self.min..=self.max).contains(&floor)
    }

    pub fn check(&self, floor: Floor) -> DispatchResult<()> {
        if self.contains(floor) {
            Ok(())
        } else {
            Err(DispatchError::FloorOutOfRange {
                floor,
                min: self.min,
                max: self.max,
            })
        }
    }
}

/// Everything needed to build a running controller.
#[derive(Clone, Debug)]
pub struct DispatchConfig {
    pub units: usize,
    pub capacity: usize,
    pub min_floor: Floor,
    pub max_floor: Floor,
    /// Position every unit starts at.
    pub origin_floor: Floor,
    /// Simulated transit time per floor; zero disables sleeping.
    pub floor_delay: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            units: DEFAULT_UNITS,
            capacity: DEFAULT_CAPACITY,
            min_floor: DEFAULT_MIN_FLOOR,
            max_floor: DEFAULT_MAX_FLOOR,
            origin_floor: DEFAULT_MIN_FLOOR,
            floor_delay: Duration::from_millis(DEFAULT_FLOOR_DELAY_MS),
        }
    }
}

impl DispatchConfig {
    pub fn floor_range(&self) -> DispatchResult<FloorRange> {
        FloorRange::new(self.min_floor, self.max_floor)
    }

    pub fn validate(&self) -> DispatchResult<()> {
        if self.units == 0 {
            return Err(DispatchError::NoUnits);
        }
        if self.capacity == 0 {
            return Err(DispatchError::Config("capacity must be > 0".to_string()));
        }
        let floors = self.floor_range()?;
        if !floors.contains(self.origin_floor) {
            return Err(DispatchError::Config(format!(
                "origin_floor {} outside {}..={}",
                self.origin_floor,
                floors.min(),
                floors.max()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(DispatchConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_units_and_zero_capacity() {
        let config = DispatchConfig {
            units: 0,
            ..DispatchConfig::default()
        };
        assert!(matches!(config.validate(), Err(DispatchError::NoUnits)));

        let config = DispatchConfig {
            capacity: 0,
            ..DispatchConfig::default()
        };
        assert!(matches!(config.validate(), Err(DispatchError::Config(_))));
    }

    #[test]
    fn rejects_origin_outside_range() {
        let config = DispatchConfig {
            origin_floor: 0,
            ..DispatchConfig::default()
        };
        assert!(matches!(config.validate(), Err(DispatchError::Config(_))));
    }

    #[test]
    fn floor_range_checks_bounds_inclusively() {
        let floors = FloorRange::new(-2, 10).expect("valid range");
        assert!(floors.check(-2).is_ok());
        assert!(floors.check(10).is_ok());
        assert!(matches!(
            floors.check(11),
            Err(DispatchError::FloorOutOfRange {
                floor: 11,
                min: -2,
                max: 10
            })
        ));
        assert!(FloorRange::new(5, 4).is_err());
    }
}
