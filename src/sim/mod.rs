//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Time comes from the host, never from a system clock
//! - Seeded RNG only
//! - Stable iteration order (pool slot order, timer deadline then id)
//! - No rendering, audio or platform dependencies

pub mod clock;
pub mod collision;
pub mod enemy;
pub mod explosion;
pub mod grid;
pub mod player;
pub mod pool;
pub mod state;
pub mod tick;
pub mod timer;
pub mod view;

pub use clock::{LevelClock, level_score};
pub use collision::{Aabb, Collider};
pub use enemy::{Enemy, Heading};
pub use grid::{Cell, Direction, Grid, GridPos, Orientation};
pub use player::{MoveIntent, Player};
pub use pool::{Pool, PoolHandle};
pub use state::{
    BlastSegment, DeathCause, Device, DeviceId, DeviceState, GameEvent, GamePhase, GameState,
    Obstacle, ObstacleId, ObstacleState, Owner, Pickup, PickupId, PickupKind, PickupState,
    SegmentId,
};
pub use tick::{TickInput, tick};
pub use timer::{Scheduler, TimeMs, TimerEvent, TimerId};
pub use view::{Hud, Sprite, SpriteKind, Style};
