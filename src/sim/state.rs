//! Simulation state and core types
//!
//! One `GameState` per session. Everything a subsystem needs (grid, pools,
//! scheduler, entity tables) hangs off it; cells and timers refer to
//! entities by id, never by reference.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::clock::LevelClock;
use super::collision::{Aabb, Collider};
use super::enemy::Enemy;
use super::grid::{Direction, Grid, GridPos, Orientation};
use super::player::Player;
use super::pool::{Pool, PoolHandle};
use super::timer::{Scheduler, TimeMs, TimerEvent, TimerId};
use crate::audio::{AudioCue, AudioLoop};
use crate::consts::*;
use crate::error::{PoolKind, SimError};
use crate::layout::{LevelLayout, Layout};
use crate::settings::SimConfig;

/// Pooled device slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DeviceId(pub(crate) PoolHandle);

/// Pooled blast segment slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SegmentId {
    pub orientation: Orientation,
    pub(crate) handle: PoolHandle,
}

/// Index into `GameState::obstacles`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObstacleId(pub u32);

/// Index into `GameState::pickups`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PickupId(pub u32);

/// Stable enemy id (enemies are removed from the table when they leave)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnemyId(pub u32);

/// Who dropped a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    Player,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum DeviceState {
    /// Sitting in the pool
    #[default]
    Pooled,
    /// Placed, fuse running
    Armed,
    /// Blast visible, waiting for teardown
    Detonating,
}

/// A placed explosive
#[derive(Debug, Clone, Default)]
pub struct Device {
    pub cell: GridPos,
    pub bounds: Aabb,
    /// Blast radius in cells
    pub power: u32,
    /// Set while the owner still overlaps the device; owners pass through
    pub owner: Option<Owner>,
    pub state: DeviceState,
    /// The one live fuse timer while armed
    pub fuse: Option<TimerId>,
    /// Fuse already shortened by a chain hit
    pub early: bool,
}

impl Collider for Device {
    fn bounds(&self) -> Aabb {
        self.bounds
    }
}

/// One axis of blast at one cell
#[derive(Debug, Clone, Default)]
pub struct BlastSegment {
    pub cell: GridPos,
    pub bounds: Aabb,
    /// Terminal segment of a full-length ray: body clipped on this side to
    /// show the rounded end cap
    pub tip: Option<Direction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ObstacleState {
    Intact,
    Collapsing,
    Removed,
}

/// Destructible wall
#[derive(Debug, Clone)]
pub struct Obstacle {
    pub id: ObstacleId,
    pub cell: GridPos,
    pub state: ObstacleState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PickupKind {
    /// One more device at a time
    Capacity,
    /// One more cell of blast radius
    Power,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PickupState {
    Present,
    /// Hit by a blast, removed after a short delay
    Burning,
    Consumed,
}

#[derive(Debug, Clone)]
pub struct Pickup {
    pub id: PickupId,
    pub cell: GridPos,
    pub kind: PickupKind,
    pub state: PickupState,
}

/// Exit tile; opens once every enemy is gone
#[derive(Debug, Clone, Copy)]
pub struct Finish {
    pub cell: GridPos,
    pub active: bool,
}

/// Horizontal and vertical segment pools
#[derive(Debug, Clone)]
pub struct SegmentPools {
    pub horizontal: Pool<BlastSegment>,
    pub vertical: Pool<BlastSegment>,
}

impl SegmentPools {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            horizontal: Pool::new(
                PoolKind::HorizontalSegments,
                config.pools.horizontal_segments,
            ),
            vertical: Pool::new(PoolKind::VerticalSegments, config.pools.vertical_segments),
        }
    }

    pub fn pool(&self, orientation: Orientation) -> &Pool<BlastSegment> {
        match orientation {
            Orientation::Horizontal => &self.horizontal,
            Orientation::Vertical => &self.vertical,
        }
    }

    pub fn pool_mut(&mut self, orientation: Orientation) -> &mut Pool<BlastSegment> {
        match orientation {
            Orientation::Horizontal => &mut self.horizontal,
            Orientation::Vertical => &mut self.vertical,
        }
    }

    pub fn get(&self, id: SegmentId) -> Option<&BlastSegment> {
        self.pool(id.orientation).get(id.handle)
    }

    pub fn release(&mut self, id: SegmentId) -> bool {
        self.pool_mut(id.orientation).release(id.handle)
    }

    /// Active segments, horizontal first
    pub fn iter(&self) -> impl Iterator<Item = (SegmentId, &BlastSegment)> {
        let horizontal = self.horizontal.iter_active().map(|(handle, segment)| {
            let orientation = Orientation::Horizontal;
            (SegmentId { orientation, handle }, segment)
        });
        let vertical = self.vertical.iter_active().map(|(handle, segment)| {
            let orientation = Orientation::Vertical;
            (SegmentId { orientation, handle }, segment)
        });
        horizontal.chain(vertical)
    }

    pub fn active_count(&self) -> usize {
        self.horizontal.active_count() + self.vertical.active_count()
    }
}

/// Current phase of play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Waiting for the layout collaborator to supply the next level
    AwaitingLevel,
    Playing,
    Paused,
    /// Player reached the finish; waiting for the transition timer
    LevelComplete,
    GameOver,
    Victory,
}

/// How the player died
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeathCause {
    Blast,
    Enemy,
}

/// Events for collaborators (audio, HUD, logging)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GameEvent {
    Audio(AudioCue),
    DevicePlaced { cell: GridPos },
    DeviceDetonated { cell: GridPos, power: u32 },
    ObstacleCollapsing { cell: GridPos },
    ObstacleRemoved { cell: GridPos, revealed_pickup: bool },
    PickupCollected { kind: PickupKind },
    PickupBurnt { cell: GridPos },
    PlayerDied { cause: DeathCause, lives: u32 },
    PlayerRespawned,
    EnemyKilled { id: EnemyId },
    FinishActivated,
    LevelCompleted { level: u32, level_time_ms: TimeMs },
    LevelScored { level: u32, added: f64, total: f64 },
    LevelRequested { level: u32 },
    GameOver,
    Victory { score: f64 },
    Paused,
    Resumed,
}

/// Complete simulation state
#[derive(Debug, Clone)]
pub struct GameState {
    pub config: SimConfig,
    pub seed: u64,
    /// Current level (1-based; 0 before the first load)
    pub level: u32,
    pub phase: GamePhase,
    pub score: f64,
    pub grid: Grid,
    pub scheduler: Scheduler,
    pub devices: Pool<Device>,
    pub segments: SegmentPools,
    /// Indexed by `ObstacleId`
    pub obstacles: Vec<Obstacle>,
    /// Indexed by `PickupId`
    pub pickups: Vec<Pickup>,
    pub player: Player,
    pub enemies: Vec<Enemy>,
    pub finish: Finish,
    pub clock: LevelClock,
    /// Keeps enemies off the player's start cell after a death
    pub spawn_guard: bool,
    pub(crate) rng: Pcg32,
    pub(crate) events: Vec<GameEvent>,
    pub(crate) last_frame: Option<TimeMs>,
    pub(crate) resume_phase: GamePhase,
    pub(crate) alt_death_sound: bool,
}

impl GameState {
    /// Create an empty session; call `next_level` or `load_level` to start
    pub fn new(config: SimConfig, seed: u64) -> Self {
        Self {
            devices: Pool::new(PoolKind::Devices, config.pools.devices),
            segments: SegmentPools::new(&config),
            player: Player::new(&config),
            seed,
            level: 0,
            phase: GamePhase::AwaitingLevel,
            score: 0.0,
            grid: Grid::new(),
            scheduler: Scheduler::new(0),
            obstacles: Vec::new(),
            pickups: Vec::new(),
            enemies: Vec::new(),
            finish: Finish {
                cell: GridPos::new(FINISH_ROW, FINISH_COL),
                active: false,
            },
            clock: LevelClock::start(0),
            spawn_guard: false,
            rng: Pcg32::seed_from_u64(seed),
            events: Vec::new(),
            last_frame: None,
            resume_phase: GamePhase::Playing,
            alt_death_sound: false,
            config,
        }
    }

    /// Replace the world with `layout` and start `level` at `now`.
    ///
    /// Pools are rebuilt at configured capacity and every timer is dropped.
    /// Nothing changes if the layout names a cell outside the grid.
    pub fn load_level(&mut self, level: u32, layout: &Layout, now: TimeMs) -> Result<(), SimError> {
        let mut grid = Grid::new();
        for pos in &layout.solids {
            grid.set_solid(*pos)?;
        }
        let mut obstacles = Vec::with_capacity(layout.destructibles.len());
        for (i, pos) in layout.destructibles.iter().enumerate() {
            let id = ObstacleId(i as u32);
            grid.set_destructible(*pos, id)?;
            obstacles.push(Obstacle {
                id,
                cell: *pos,
                state: ObstacleState::Intact,
            });
        }
        let mut pickups = Vec::with_capacity(layout.pickups.len());
        for (i, (pos, kind)) in layout.pickups.iter().enumerate() {
            let id = PickupId(i as u32);
            grid.set_pickup(*pos, id)?;
            pickups.push(Pickup {
                id,
                cell: *pos,
                kind: *kind,
                state: PickupState::Present,
            });
        }
        let mut enemies = Vec::with_capacity(layout.enemies.len());
        for (i, pos) in layout.enemies.iter().enumerate() {
            if !Grid::in_bounds(*pos) {
                return Err(SimError::InvalidCell {
                    row: pos.row,
                    col: pos.col,
                });
            }
            enemies.push(Enemy::new(EnemyId(i as u32), *pos, level, &self.config));
        }

        self.level = level;
        self.grid = grid;
        self.obstacles = obstacles;
        self.pickups = pickups;
        self.enemies = enemies;
        self.devices.reset(self.config.pools.devices);
        self.segments = SegmentPools::new(&self.config);
        self.scheduler.clear();
        self.scheduler.advance_clock(now);
        self.player = Player::new(&self.config);
        self.finish.active = false;
        self.spawn_guard = false;
        self.clock = LevelClock::start(now);
        self.last_frame = Some(now);
        self.phase = GamePhase::Playing;

        self.grant_invulnerability();
        self.cue(AudioCue::StartLoop(AudioLoop::Music));
        log::info!(
            "Level {} loaded: {} obstacles, {} pickups, {} enemies",
            level,
            self.obstacles.len(),
            self.pickups.len(),
            self.enemies.len()
        );

        self.check_level_clear();
        Ok(())
    }

    /// Load the next level from `layouts` if one was requested
    pub fn next_level(
        &mut self,
        layouts: &mut dyn LevelLayout,
        now: TimeMs,
    ) -> Result<bool, SimError> {
        if self.phase != GamePhase::AwaitingLevel {
            return Ok(false);
        }
        let level = self.level + 1;
        let layout = layouts.build(level);
        self.load_level(level, &layout, now)?;
        Ok(true)
    }

    // === Events ===

    pub(crate) fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub(crate) fn cue(&mut self, cue: AudioCue) {
        self.events.push(GameEvent::Audio(cue));
    }

    /// Take all events emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // === Geometry ===

    /// Pixels per scale unit
    pub fn scale(&self) -> f32 {
        self.config.scale()
    }

    pub fn arena_size(&self) -> Vec2 {
        Vec2::new(
            GRID_COLS as f32 * self.config.cell_size,
            GRID_ROWS as f32 * self.config.cell_size,
        )
    }

    /// Top-left pixel of a cell
    pub fn cell_origin(&self, cell: GridPos) -> Vec2 {
        Vec2::new(cell.col as f32, cell.row as f32) * self.config.cell_size
    }

    pub fn cell_center(&self, cell: GridPos) -> Vec2 {
        self.cell_origin(cell) + Vec2::splat(self.config.cell_size / 2.0)
    }

    pub fn cell_bounds(&self, cell: GridPos) -> Aabb {
        Aabb::square(self.cell_origin(cell), self.config.cell_size)
    }

    /// Cell containing a pixel
    pub fn cell_at(&self, point: Vec2) -> GridPos {
        let cell = point / self.config.cell_size;
        GridPos::new(cell.y.floor() as i32, cell.x.floor() as i32)
    }

    // === Lookups ===

    pub fn obstacle(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.obstacles.get(id.0 as usize)
    }

    pub fn pickup(&self, id: PickupId) -> Option<&Pickup> {
        self.pickups.get(id.0 as usize)
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(id.0)
    }

    pub fn armed_device_count(&self) -> usize {
        self.devices
            .iter_active()
            .filter(|(_, device)| device.state == DeviceState::Armed)
            .count()
    }

    /// Open the finish once every enemy has left
    pub(crate) fn check_level_clear(&mut self) {
        if self.enemies.is_empty() && !self.finish.active && self.phase == GamePhase::Playing {
            self.finish.active = true;
            self.emit(GameEvent::FinishActivated);
            log::info!("Level {} cleared of enemies, finish open", self.level);
        }
    }

    /// Schedule helper
    pub(crate) fn schedule(&mut self, event: TimerEvent, delay: TimeMs) -> TimerId {
        self.scheduler.schedule(event, delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_awaits_level() {
        let state = GameState::new(SimConfig::default(), 1);
        assert_eq!(state.phase, GamePhase::AwaitingLevel);
        assert_eq!(state.devices.capacity(), 50);
        assert_eq!(state.segments.horizontal.capacity(), 200);
        assert_eq!(state.segments.vertical.capacity(), 200);
    }

    #[test]
    fn test_load_level_populates_grid() {
        let mut state = GameState::new(SimConfig::default(), 1);
        let layout = Layout {
            solids: vec![GridPos::new(1, 1)],
            destructibles: vec![GridPos::new(0, 3)],
            pickups: vec![(GridPos::new(0, 3), PickupKind::Power)],
            enemies: vec![GridPos::new(6, 6)],
        };
        state.load_level(1, &layout, 500).unwrap();

        assert_eq!(state.phase, GamePhase::Playing);
        assert!(state.grid.is_solid(GridPos::new(1, 1)));
        assert_eq!(state.grid.destructible_at(GridPos::new(0, 3)), Some(ObstacleId(0)));
        assert_eq!(state.grid.pickup_at(GridPos::new(0, 3)), Some(PickupId(0)));
        assert_eq!(state.enemies.len(), 1);
        assert!(!state.finish.active);
        // Spawn invulnerability is the only live timer
        assert_eq!(state.scheduler.len(), 1);
        assert!(!state.player.vulnerable);
    }

    #[test]
    fn test_load_level_rejects_bad_cell_without_changes() {
        let mut state = GameState::new(SimConfig::default(), 1);
        let layout = Layout {
            solids: vec![GridPos::new(1, 1), GridPos::new(11, 0)],
            ..Layout::default()
        };
        assert_eq!(
            state.load_level(1, &layout, 0),
            Err(SimError::InvalidCell { row: 11, col: 0 })
        );
        assert_eq!(state.phase, GamePhase::AwaitingLevel);
        assert!(state.grid.is_empty(GridPos::new(1, 1)));
    }

    #[test]
    fn test_level_without_enemies_opens_finish() {
        let mut state = GameState::new(SimConfig::default(), 1);
        state.load_level(1, &Layout::default(), 0).unwrap();
        assert!(state.finish.active);
        assert!(state.drain_events().contains(&GameEvent::FinishActivated));
    }

    #[test]
    fn test_cell_geometry() {
        let state = GameState::new(SimConfig::default(), 1);
        let cell = GridPos::new(2, 3);
        assert_eq!(state.cell_origin(cell), Vec2::new(192.0, 128.0));
        assert_eq!(state.cell_at(state.cell_center(cell)), cell);
        assert_eq!(state.arena_size(), Vec2::new(832.0, 704.0));
    }
}
