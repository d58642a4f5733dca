//! Simulation settings
//!
//! Every timing and capacity the core depends on. Loaded from JSON on native
//! builds; missing keys fall back to the defaults below.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::CELL_SIZE;
use crate::error::SettingsError;

/// Fixed pool sizes, reconstructed at every level load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolCapacities {
    pub horizontal_segments: usize,
    pub vertical_segments: usize,
    pub devices: usize,
}

impl Default for PoolCapacities {
    fn default() -> Self {
        Self {
            horizontal_segments: 200,
            vertical_segments: 200,
            devices: 50,
        }
    }
}

/// Corner-slip tuning. Empirical values; kept configurable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CornerSlip {
    /// Second-smallest separation must be below this fraction of a cell
    pub fraction: f32,
    /// Nudge along each axis, in scale units
    pub nudge: f32,
}

impl Default for CornerSlip {
    fn default() -> Self {
        Self {
            fraction: 0.3,
            nudge: 2.0,
        }
    }
}

/// Simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Cell edge in pixels
    pub cell_size: f32,

    // === Devices and blasts ===
    pub fuse_ms: u64,
    pub early_fuse_ms: u64,
    /// Lifetime of a single blast segment
    pub blast_lifetime_ms: u64,
    /// Delay before a detonated device returns to its pool
    pub device_teardown_ms: u64,
    /// Capacity restore delay; `None` means "same as the fuse"
    pub capacity_restore_ms: Option<u64>,
    pub wall_break_cue_ms: u64,

    // === World ===
    pub collapse_delay_ms: u64,
    pub pickup_burn_ms: u64,

    // === Entities ===
    pub respawn_delay_ms: u64,
    pub invulnerability_ms: u64,
    pub spawn_guard_ms: u64,
    pub enemy_removal_ms: u64,
    pub player_lives: u32,
    pub starting_capacity: u32,
    pub starting_power: u32,

    // === Level flow ===
    pub level_transition_ms: u64,
    pub level_time_budget_ms: u64,
    pub max_level: u32,

    pub pools: PoolCapacities,
    pub corner_slip: CornerSlip,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            cell_size: CELL_SIZE,

            fuse_ms: 2500,
            early_fuse_ms: 80,
            blast_lifetime_ms: 500,
            device_teardown_ms: 500,
            capacity_restore_ms: None,
            wall_break_cue_ms: 100,

            collapse_delay_ms: 500,
            pickup_burn_ms: 500,

            respawn_delay_ms: 2000,
            invulnerability_ms: 2000,
            spawn_guard_ms: 4000,
            enemy_removal_ms: 1000,
            player_lives: 5,
            starting_capacity: 1,
            starting_power: 2,

            level_transition_ms: 4000,
            level_time_budget_ms: 120_000,
            max_level: 5,

            pools: PoolCapacities::default(),
            corner_slip: CornerSlip::default(),
        }
    }
}

impl SimConfig {
    /// Effective capacity restore delay
    pub fn capacity_restore_ms(&self) -> u64 {
        self.capacity_restore_ms.unwrap_or(self.fuse_ms)
    }

    /// Pixels per scale unit
    pub fn scale(&self) -> f32 {
        crate::scale_for(self.cell_size)
    }

    /// Parse from a JSON document and validate
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(config)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(SettingsError::Invalid(format!(
                "cell_size must be positive, got {}",
                self.cell_size
            )));
        }
        if self.pools.devices == 0
            || self.pools.horizontal_segments == 0
            || self.pools.vertical_segments == 0
        {
            return Err(SettingsError::Invalid(
                "pool capacities must be non-zero".to_string(),
            ));
        }
        if self.max_level == 0 {
            return Err(SettingsError::Invalid("max_level must be at least 1".to_string()));
        }
        if self.corner_slip.fraction < 0.0 || self.corner_slip.nudge < 0.0 {
            return Err(SettingsError::Invalid(
                "corner slip tuning must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_config_surface() {
        let config = SimConfig::default();
        assert_eq!(config.fuse_ms, 2500);
        assert_eq!(config.early_fuse_ms, 80);
        assert_eq!(config.blast_lifetime_ms, 500);
        assert_eq!(config.collapse_delay_ms, 500);
        assert_eq!(config.respawn_delay_ms, 2000);
        assert_eq!(config.invulnerability_ms, 2000);
        assert_eq!(config.capacity_restore_ms(), config.fuse_ms);
        assert_eq!(config.pools, PoolCapacities::default());
        assert_eq!(config.pools.devices, 50);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SimConfig::from_json(r#"{ "fuse_ms": 1000, "pools": { "devices": 3 } }"#)
            .unwrap();
        assert_eq!(config.fuse_ms, 1000);
        assert_eq!(config.capacity_restore_ms(), 1000);
        assert_eq!(config.pools.devices, 3);
        assert_eq!(config.pools.horizontal_segments, 200);
        assert_eq!(config.early_fuse_ms, 80);
    }

    #[test]
    fn test_rejects_zero_pool() {
        let err = SimConfig::from_json(r#"{ "pools": { "devices": 0 } }"#).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(_)));
    }

    #[test]
    fn test_rejects_bad_json() {
        let err = SimConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn test_round_trip_through_json() {
        let mut config = SimConfig::default();
        config.capacity_restore_ms = Some(1234);
        let json = serde_json::to_string(&config).unwrap();
        let back = SimConfig::from_json(&json).unwrap();
        assert_eq!(back.capacity_restore_ms(), 1234);
    }
}
