//! Wandering enemies
//!
//! Enemies walk cell to cell. On reaching the centre of a new cell (or when
//! stuck) they pick a random open neighbour, never turning back unless it is
//! the only way out. A device dropped in their path turns them round.

use glam::Vec2;
use rand::Rng;
use serde::Serialize;

use super::collision::Aabb;
use super::grid::{Direction, GridPos};
use super::state::{EnemyId, GameEvent, GameState};
use super::timer::TimerEvent;
use crate::audio::{AudioCue, SoundEffect};
use crate::consts::{ENEMY_SIZE, GRID_COLS, GRID_ROWS};
use crate::settings::SimConfig;

/// Where an enemy is headed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Heading {
    /// Just placed; chooses on the first tick
    Spawn,
    /// No open neighbour; retries every tick
    Stuck,
    Moving(Direction),
}

#[derive(Debug, Clone)]
pub struct Enemy {
    pub id: EnemyId,
    /// Top-left, pixels
    pub pos: Vec2,
    pub size: f32,
    /// Pixels per reference frame
    pub speed: f32,
    pub alive: bool,
    pub heading: Heading,
    /// Cell the current leg started from
    pub curr: GridPos,
    /// Cell the current leg is heading into
    pub next: Option<GridPos>,
    /// Top-left at the centre of `curr`
    prev_spot: Vec2,
    /// Already reversed for the device blocking `next`
    turned_back: bool,
}

impl Enemy {
    /// Enemy centred on `cell`; faster on later levels
    pub fn new(id: EnemyId, cell: GridPos, level: u32, config: &SimConfig) -> Self {
        let scale = config.scale();
        let size = ENEMY_SIZE * scale;
        let pos = spot(cell, size, config.cell_size);
        Self {
            id,
            pos,
            size,
            speed: level as f32 * scale,
            alive: true,
            heading: Heading::Spawn,
            curr: cell,
            next: None,
            prev_spot: pos,
            turned_back: false,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::square(self.pos, self.size)
    }
}

/// Top-left that centres a box of `size` on `cell`
fn spot(cell: GridPos, size: f32, cell_size: f32) -> Vec2 {
    Vec2::new(cell.col as f32, cell.row as f32) * cell_size + Vec2::splat(cell_size / 2.0 - size / 2.0)
}

impl GameState {
    /// Enemies only walk into empty cells, and never onto a guarded start cell
    pub fn enemy_can_enter(&self, pos: GridPos) -> bool {
        self.grid.is_empty(pos) && !(self.spawn_guard && pos == GridPos::new(0, 0))
    }

    pub(crate) fn move_enemies(&mut self, frames: f32) {
        for index in 0..self.enemies.len() {
            self.move_enemy(index, frames);
        }
    }

    fn move_enemy(&mut self, index: usize, frames: f32) {
        let Some(enemy) = self.enemies.get(index) else {
            return;
        };
        if !enemy.alive {
            return;
        }
        let blocked = enemy.next.is_some_and(|next| !self.enemy_can_enter(next));
        let cell_size = self.config.cell_size;

        let enemy = &mut self.enemies[index];
        if blocked {
            if !enemy.turned_back {
                if let Some(next) = enemy.next {
                    enemy.next = Some(enemy.curr);
                    enemy.curr = next;
                }
                enemy.prev_spot = spot(enemy.curr, enemy.size, cell_size);
                if let Heading::Moving(dir) = enemy.heading {
                    enemy.heading = Heading::Moving(dir.opposite());
                }
                enemy.turned_back = true;
            }
        } else {
            enemy.turned_back = false;
        }

        let distance = enemy.speed * frames;
        if let Heading::Moving(dir) = enemy.heading {
            let (dr, dc) = dir.delta();
            enemy.pos += Vec2::new(dc as f32, dr as f32) * distance;
        }

        let travelled = (enemy.pos - enemy.prev_spot).abs();
        let choose = !matches!(enemy.heading, Heading::Moving(_))
            || travelled.x >= cell_size
            || travelled.y >= cell_size;
        if choose {
            self.choose_direction(index);
        }

        let bounds = self.enemies[index].bounds();
        if self
            .segments
            .iter()
            .any(|(_, segment)| bounds.overlaps(&segment.bounds))
        {
            self.kill_enemy(index);
        }
    }

    fn choose_direction(&mut self, index: usize) {
        let cell_size = self.config.cell_size;
        let (center, size, heading) = {
            let enemy = &self.enemies[index];
            (enemy.pos + Vec2::splat(enemy.size / 2.0), enemy.size, enemy.heading)
        };
        let curr = GridPos::new(
            (((center.y - cell_size / 2.0) / cell_size).round() as i32).clamp(0, GRID_ROWS - 1),
            (((center.x - cell_size / 2.0) / cell_size).round() as i32).clamp(0, GRID_COLS - 1),
        );

        let mut open: Vec<Direction> = [Direction::Up, Direction::Down, Direction::Left, Direction::Right]
            .into_iter()
            .filter(|dir| self.enemy_can_enter(curr.step(*dir, 1)))
            .collect();
        if open.len() > 1 {
            if let Heading::Moving(dir) = heading {
                open.retain(|d| *d != dir.opposite());
            }
        }
        let choice = (!open.is_empty()).then(|| open[self.rng.random_range(0..open.len())]);

        let enemy = &mut self.enemies[index];
        enemy.curr = curr;
        enemy.prev_spot = spot(curr, size, cell_size);
        match choice {
            Some(dir) => {
                enemy.heading = Heading::Moving(dir);
                enemy.next = Some(curr.step(dir, 1));
            }
            None => enemy.heading = Heading::Stuck,
        }
    }

    pub(crate) fn kill_enemy(&mut self, index: usize) {
        let Some(enemy) = self.enemies.get_mut(index) else {
            return;
        };
        if !enemy.alive {
            return;
        }
        enemy.alive = false;
        let id = enemy.id;
        self.cue(AudioCue::Play(SoundEffect::EnemyDeath));
        self.schedule(TimerEvent::EnemyRemove(id), self.config.enemy_removal_ms);
        self.emit(GameEvent::EnemyKilled { id });
        log::debug!("Enemy {} killed", id.0);
    }

    /// Dead enemy leaves the level; the last one opens the finish
    pub(crate) fn remove_enemy(&mut self, id: EnemyId) {
        self.enemies.retain(|enemy| enemy.id != id);
        self.check_level_clear();
    }
}
