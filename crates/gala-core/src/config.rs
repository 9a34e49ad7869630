//! Pool construction parameters.
//!
//! A [`PoolConfig`] fixes the arena capacity and the world geometry for the
//! life of the pool. Defaults match the shipping game; tests shrink them to
//! keep scenarios readable.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when validating a [`PoolConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration value is outside its usable range.
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Construction parameters for an entity pool.
///
/// # Example
///
/// ```
/// use gala_core::PoolConfig;
///
/// let config = PoolConfig {
///     capacity: 64,
///     ..PoolConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of entity slots, fixed for the life of the pool.
    pub capacity: u16,
    /// Free slots held back from miscellaneous-effect allocation so that
    /// gameplay-relevant entities always have headroom.
    pub misc_reserve: u16,
    /// log2 of the spatial cell edge length in world units.
    pub cell_shift: u8,
    /// Edge length of the (square) world in spatial cells.
    pub world_cells: u16,
    /// Maximum number of litter entities before the oldest is evicted.
    pub max_litter: u16,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            misc_reserve: 300,
            cell_shift: 5,
            world_cells: 256,
            max_litter: 500,
        }
    }
}

impl PoolConfig {
    /// Maximum world elevation in world units.
    pub const MAX_ELEVATION: i32 = 1 << 12;

    /// Checks that the configuration describes a usable pool.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the capacity is zero or would
    /// not leave room for the reserved index niche, when the world has no
    /// cells, or when the world edge would overflow an `i32` coordinate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid("capacity must be at least 1"));
        }
        if self.capacity == u16::MAX {
            return Err(ConfigError::Invalid("capacity must leave one index unused"));
        }
        if self.world_cells == 0 {
            return Err(ConfigError::Invalid("world must span at least one cell"));
        }
        if self.cell_shift >= 16 {
            return Err(ConfigError::Invalid("cell_shift must be below 16"));
        }
        let edge = i64::from(self.world_cells) << self.cell_shift;
        if edge > i64::from(i32::MAX) {
            return Err(ConfigError::Invalid("world edge overflows coordinate range"));
        }
        Ok(())
    }

    /// Edge length of the world in world units.
    #[must_use]
    pub fn world_units(&self) -> i32 {
        i32::from(self.world_cells) << self.cell_shift
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(PoolConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_capacity_rejected() {
        let config = PoolConfig {
            capacity: 0,
            ..PoolConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn full_index_range_rejected() {
        let config = PoolConfig {
            capacity: u16::MAX,
            ..PoolConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn degenerate_world_rejected() {
        let config = PoolConfig {
            world_cells: 0,
            ..PoolConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_world_rejected() {
        let config = PoolConfig {
            cell_shift: 15,
            world_cells: u16::MAX,
            ..PoolConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn world_units_follows_shift() {
        let config = PoolConfig {
            cell_shift: 5,
            world_cells: 256,
            ..PoolConfig::default()
        };
        assert_eq!(config.world_units(), 256 * 32);
    }

    #[test]
    fn serialization_roundtrip() {
        let config = PoolConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: PoolConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
