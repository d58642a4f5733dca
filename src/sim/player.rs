//! Player movement, devices, pickups and death

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::{Aabb, Collider, SlipTuning, resolve_devices, resolve_walls};
use super::grid::{Cell, GridPos};
use super::state::{
    DeathCause, GameEvent, GamePhase, GameState, Owner, PickupKind, PickupState,
};
use super::timer::TimerEvent;
use crate::audio::{AudioCue, AudioLoop, SoundEffect};
use crate::consts::*;
use crate::settings::SimConfig;

/// Held direction keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveIntent {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl MoveIntent {
    pub fn is_moving(&self) -> bool {
        self.left || self.right || self.up || self.down
    }

    pub fn is_diagonal(&self) -> bool {
        (self.left || self.right) && (self.up || self.down)
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    /// Top-left, pixels
    pub pos: Vec2,
    pub start: Vec2,
    pub size: f32,
    /// Pixels per reference frame
    pub speed: f32,
    pub lives: u32,
    pub alive: bool,
    pub vulnerable: bool,
    /// Devices that can be placed right now
    pub capacity: u32,
    pub power: u32,
    pub intent: MoveIntent,
    pub moving: bool,
    pub facing_left: bool,
}

impl Player {
    /// Fresh player centred on the top-left cell
    pub fn new(config: &SimConfig) -> Self {
        let scale = config.scale();
        let size = PLAYER_SIZE * scale;
        let start = Vec2::splat(config.cell_size / 2.0 - size / 2.0);
        Self {
            pos: start,
            start,
            size,
            speed: PLAYER_SPEED * scale,
            lives: config.player_lives,
            alive: true,
            vulnerable: true,
            capacity: config.starting_capacity,
            power: config.starting_power,
            intent: MoveIntent::default(),
            moving: false,
            facing_left: false,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::square(self.pos, self.size)
    }

    pub fn center(&self) -> Vec2 {
        self.pos + Vec2::splat(self.size / 2.0)
    }
}

impl GameState {
    /// Place a device under the player. Returns whether one was placed.
    pub fn drop_device(&mut self) -> bool {
        let cell = self.cell_at(self.player.center());
        if !self.player.alive || self.player.capacity == 0 || !self.grid.is_empty(cell) {
            return false;
        }
        match self.plant_device(cell, self.player.power, Some(Owner::Player)) {
            Ok(_) => {
                self.player.capacity -= 1;
                self.schedule(TimerEvent::CapacityRestore, self.config.capacity_restore_ms());
                true
            }
            Err(e) => {
                log::warn!("Device drop skipped: {e}");
                false
            }
        }
    }

    /// Wall boxes touching the 3x3 neighbourhood of `around`: (solids, destructibles)
    fn nearby_walls(&self, around: GridPos) -> (Vec<Aabb>, Vec<Aabb>) {
        let mut solids = Vec::new();
        let mut destructibles = Vec::new();
        for row in around.row - 1..=around.row + 1 {
            for col in around.col - 1..=around.col + 1 {
                let pos = GridPos::new(row, col);
                match self.grid.cell(pos) {
                    Some(Cell::Solid) => solids.push(self.cell_bounds(pos)),
                    Some(Cell::Destructible(_)) => destructibles.push(self.cell_bounds(pos)),
                    _ => {}
                }
            }
        }
        (solids, destructibles)
    }

    /// Advance the player by `frames` reference frames
    pub(crate) fn move_player(&mut self, frames: f32) {
        if !self.player.alive {
            return;
        }
        let intent = self.player.intent;
        let slowdown = if intent.is_diagonal() {
            DIAGONAL_SLOWDOWN
        } else {
            1.0
        };
        let distance = self.player.speed * slowdown * frames;

        let mut next = self.player.pos;
        if intent.left {
            next.x -= distance;
        }
        if intent.right {
            next.x += distance;
        }
        if intent.up {
            next.y -= distance;
        }
        if intent.down {
            next.y += distance;
        }

        let size = self.player.size;
        let mover = Aabb::square(next, size);
        let (solids, destructibles) = self.nearby_walls(self.cell_at(mover.center()));
        next = resolve_walls(
            mover,
            &solids,
            &destructibles,
            !intent.is_diagonal(),
            SlipTuning::from_config(&self.config),
        );

        // Owners walk off their own device freely; once clear it blocks them too
        let mover = Aabb::square(next, size);
        let handles: Vec<_> = self.devices.iter_active().map(|(h, _)| h).collect();
        let mut blocking = Vec::new();
        for handle in handles {
            if let Some(device) = self.devices.get_mut(handle) {
                if !device.blocks(&mover) {
                    device.owner = None;
                } else if device.owner.is_none() {
                    blocking.push(device.bounds);
                }
            }
        }
        next = resolve_devices(mover, &blocking);

        let arena = self.arena_size();
        next.x = next.x.clamp(0.0, arena.x - size);
        next.y = next.y.clamp(0.0, arena.y - size);
        self.player.pos = next;

        if intent.left {
            self.player.facing_left = true;
        } else if intent.right {
            self.player.facing_left = false;
        }
        self.update_walking(intent.is_moving());

        self.player_contacts();
    }

    fn update_walking(&mut self, moving: bool) {
        if moving == self.player.moving {
            return;
        }
        self.player.moving = moving;
        if moving {
            self.cue(AudioCue::StartLoop(AudioLoop::Walking));
        } else {
            self.cue(AudioCue::StopLoop(AudioLoop::Walking));
        }
    }

    /// Blasts, enemies, pickups and the finish, after movement
    fn player_contacts(&mut self) {
        let bounds = self.player.bounds();
        let body = bounds.shrink(HIT_INSET * self.scale());

        if self.player.vulnerable {
            if self
                .segments
                .iter()
                .any(|(_, segment)| body.overlaps(&segment.bounds))
            {
                self.kill_player(DeathCause::Blast);
                return;
            }
            if self
                .enemies
                .iter()
                .any(|enemy| enemy.alive && body.overlaps(&enemy.bounds()))
            {
                self.kill_player(DeathCause::Enemy);
                return;
            }
        }

        let collected = self.pickups.iter().position(|pickup| {
            pickup.state == PickupState::Present
                && !self.grid.is_obstacle(pickup.cell)
                && body.overlaps(&self.cell_bounds(pickup.cell))
        });
        if let Some(index) = collected {
            self.collect_pickup(index);
        }

        if self.finish.active {
            let slack = FINISH_SLACK * self.scale();
            if self.cell_bounds(self.finish.cell).contains(&bounds, slack) {
                self.complete_level();
            }
        }
    }

    fn collect_pickup(&mut self, index: usize) {
        let Some(pickup) = self.pickups.get_mut(index) else {
            return;
        };
        pickup.state = PickupState::Consumed;
        let (id, cell, kind) = (pickup.id, pickup.cell, pickup.kind);
        self.grid.clear_pickup(cell, id);
        let effect = match kind {
            PickupKind::Capacity => {
                self.player.capacity += 1;
                SoundEffect::CapacityUp
            }
            PickupKind::Power => {
                self.player.power += 1;
                SoundEffect::PowerUp
            }
        };
        self.cue(AudioCue::Play(effect));
        self.emit(GameEvent::PickupCollected { kind });
    }

    pub(crate) fn kill_player(&mut self, cause: DeathCause) {
        self.player.alive = false;
        self.player.lives = self.player.lives.saturating_sub(1);
        self.update_walking(false);

        let effect = match cause {
            DeathCause::Blast => SoundEffect::PlayerBlastDeath,
            DeathCause::Enemy => {
                self.alt_death_sound = !self.alt_death_sound;
                if self.alt_death_sound {
                    SoundEffect::PlayerDeath
                } else {
                    SoundEffect::PlayerDeathAlt
                }
            }
        };
        self.cue(AudioCue::Play(effect));

        self.spawn_guard = true;
        self.schedule(TimerEvent::PlayerRespawn, self.config.respawn_delay_ms);
        self.schedule(TimerEvent::SpawnGuardLift, self.config.spawn_guard_ms);
        self.emit(GameEvent::PlayerDied {
            cause,
            lives: self.player.lives,
        });
        log::info!("Player died ({:?}), {} lives left", cause, self.player.lives);
    }

    /// Respawn timer: back to the start, or game over with no lives left
    pub(crate) fn respawn_player(&mut self) {
        if self.player.lives > 0 {
            self.player.pos = self.player.start;
            self.player.alive = true;
            self.grant_invulnerability();
            self.emit(GameEvent::PlayerRespawned);
            return;
        }
        self.phase = GamePhase::GameOver;
        self.cue(AudioCue::StopLoop(AudioLoop::Music));
        self.cue(AudioCue::Play(SoundEffect::GameLost));
        self.emit(GameEvent::GameOver);
        log::info!("Game over on level {}, score {:.0}", self.level, self.score);
    }

    pub(crate) fn lift_spawn_guard(&mut self) {
        if self.player.lives > 0 {
            self.spawn_guard = false;
        }
    }

    pub(crate) fn grant_invulnerability(&mut self) {
        self.player.vulnerable = false;
        self.schedule(TimerEvent::InvulnerabilityEnd, self.config.invulnerability_ms);
    }

    /// Player reached the open finish
    fn complete_level(&mut self) {
        let now = self.scheduler.now();
        self.player.alive = false;
        self.update_walking(false);
        self.finish.active = false;
        self.clock.freeze(now);
        self.phase = GamePhase::LevelComplete;

        self.cue(AudioCue::StopLoop(AudioLoop::Music));
        self.cue(AudioCue::Play(SoundEffect::FinishLevel));
        self.schedule(TimerEvent::LevelAdvance, self.config.level_transition_ms);
        let level_time_ms = self.clock.elapsed(now);
        self.emit(GameEvent::LevelCompleted {
            level: self.level,
            level_time_ms,
        });
        log::info!("Level {} finished in {} ms", self.level, level_time_ms);
    }
}
