//! Blast Grid - a grid arcade simulation engine
//!
//! Core modules:
//! - `sim`: Simulation (scheduler, pools, grid, collisions, explosions, entities)
//! - `settings`: Config surface, loadable from JSON
//! - `layout`: Level-layout collaborator and the classic generator
//! - `audio`: Audio collaborator boundary (cues the core emits)
//! - `error`: Error taxonomy

pub mod audio;
pub mod error;
pub mod layout;
pub mod settings;
pub mod sim;

pub use error::{SettingsError, SimError};
pub use settings::SimConfig;

/// Game configuration constants
pub mod consts {
    /// Grid dimensions (fixed)
    pub const GRID_ROWS: i32 = 11;
    pub const GRID_COLS: i32 = 13;

    /// Default cell edge in pixels
    pub const CELL_SIZE: f32 = 64.0;

    /// Reference frame length; entity speeds are expressed per frame of this length
    pub const FRAME_MS: f32 = 16.7;
    /// Largest movement step per tick, in reference frames (avoids tunneling after stalls)
    pub const MAX_FRAME_STEP: f32 = 6.0;

    /// Sizes and speeds in scale units (1 unit = playfield width / 1000)
    pub const PLAYER_SIZE: f32 = 55.0;
    pub const PLAYER_SPEED: f32 = 4.5;
    pub const ENEMY_SIZE: f32 = 55.0;
    pub const DEVICE_SIZE: f32 = 60.0;

    /// Contact inset used for player hits (blast, enemy, pickup)
    pub const HIT_INSET: f32 = 10.0;
    /// Slack allowed when checking the player is inside the finish tile
    pub const FINISH_SLACK: f32 = 5.0;

    /// Speed factor for diagonal movement (~1/sqrt(2))
    pub const DIAGONAL_SLOWDOWN: f32 = 0.707;

    /// Finish tile location (bottom right)
    pub const FINISH_ROW: i32 = 10;
    pub const FINISH_COL: i32 = 12;
}

/// Pixels per scale unit for a given cell size
#[inline]
pub fn scale_for(cell_size: f32) -> f32 {
    cell_size * consts::GRID_COLS as f32 / 1000.0
}
