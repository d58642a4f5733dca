//! Error taxonomy
//!
//! None of these surface to a player. Simulation code degrades within the
//! tick: a failed action is skipped and retried at the next opportunity.

use std::fmt;

use thiserror::Error;

/// Which fixed-capacity pool an acquire failed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    HorizontalSegments,
    VerticalSegments,
    Devices,
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PoolKind::HorizontalSegments => "horizontal segment",
            PoolKind::VerticalSegments => "vertical segment",
            PoolKind::Devices => "device",
        };
        f.write_str(name)
    }
}

/// Something that can only be triggered once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerTarget {
    Obstacle(u32),
    Device,
    Pickup(u32),
}

impl fmt::Display for TriggerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerTarget::Obstacle(id) => write!(f, "obstacle {id}"),
            TriggerTarget::Device => f.write_str("device"),
            TriggerTarget::Pickup(id) => write!(f, "pickup {id}"),
        }
    }
}

/// Simulation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("{pool} pool exhausted ({capacity} slots active)")]
    PoolExhausted { pool: PoolKind, capacity: usize },

    #[error("cell ({row}, {col}) is outside the grid")]
    InvalidCell { row: i32, col: i32 },

    #[error("cell ({row}, {col}) is occupied")]
    CellOccupied { row: i32, col: i32 },

    #[error("{0} was already triggered")]
    DoubleTrigger(TriggerTarget),
}

/// Errors loading or validating a config file
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid settings: {0}")]
    Invalid(String),
}
