//! Render view
//!
//! A flat, serializable snapshot of everything a renderer draws. The core
//! never touches a display; hosts draw `Sprite`s in order (walls and pickups
//! first, then devices, blasts, enemies and the player on top).

use glam::Vec2;
use serde::Serialize;

use super::grid::{Cell, Direction, Grid, Orientation};
use super::state::{
    DeviceState, GamePhase, GameState, ObstacleState, PickupKind, PickupState,
};
use super::timer::TimeMs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpriteKind {
    SolidWall,
    DestructibleWall,
    Pickup(PickupKind),
    Finish,
    Device,
    /// Blast segment body
    Blast(Orientation),
    Enemy,
    Player,
}

/// Visual state flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Style {
    /// Wall collapsing, pickup burning, device detonating
    pub burning: bool,
    /// Enemy or player dead
    pub dead: bool,
    pub invulnerable: bool,
    pub facing_left: bool,
    /// Finish open
    pub active: bool,
    /// Blast end cap on this side
    pub tip: Option<Direction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sprite {
    pub kind: SpriteKind,
    /// Top-left, pixels
    pub pos: Vec2,
    pub size: Vec2,
    pub style: Style,
}

/// Heads-up display values
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Hud {
    pub level: u32,
    pub lives: u32,
    pub score: f64,
    pub time_left_ms: TimeMs,
    pub capacity: u32,
    pub power: u32,
    pub phase: GamePhase,
}

impl GameState {
    /// Everything to draw this frame, back to front
    pub fn sprites(&self) -> Vec<Sprite> {
        let cell = Vec2::splat(self.config.cell_size);
        let mut sprites = Vec::new();
        let mut push = |kind, pos, size, style| {
            sprites.push(Sprite {
                kind,
                pos,
                size,
                style,
            })
        };

        for pickup in self.pickups.iter().filter(|p| p.state != PickupState::Consumed) {
            push(
                SpriteKind::Pickup(pickup.kind),
                self.cell_origin(pickup.cell),
                cell,
                Style {
                    burning: pickup.state == PickupState::Burning,
                    ..Style::default()
                },
            );
        }
        push(
            SpriteKind::Finish,
            self.cell_origin(self.finish.cell),
            cell,
            Style {
                active: self.finish.active,
                ..Style::default()
            },
        );
        for pos in Grid::positions().filter(|pos| self.grid.cell(*pos) == Some(Cell::Solid)) {
            push(SpriteKind::SolidWall, self.cell_origin(pos), cell, Style::default());
        }
        for obstacle in self.obstacles.iter().filter(|o| o.state != ObstacleState::Removed) {
            push(
                SpriteKind::DestructibleWall,
                self.cell_origin(obstacle.cell),
                cell,
                Style {
                    burning: obstacle.state == ObstacleState::Collapsing,
                    ..Style::default()
                },
            );
        }
        for (_, device) in self.devices.iter_active() {
            push(
                SpriteKind::Device,
                device.bounds.pos,
                device.bounds.size,
                Style {
                    burning: device.state == DeviceState::Detonating,
                    ..Style::default()
                },
            );
        }
        for (id, segment) in self.segments.iter() {
            push(
                SpriteKind::Blast(id.orientation),
                segment.bounds.pos,
                segment.bounds.size,
                Style {
                    tip: segment.tip,
                    ..Style::default()
                },
            );
        }
        for enemy in &self.enemies {
            let bounds = enemy.bounds();
            push(
                SpriteKind::Enemy,
                bounds.pos,
                bounds.size,
                Style {
                    dead: !enemy.alive,
                    ..Style::default()
                },
            );
        }
        let bounds = self.player.bounds();
        push(
            SpriteKind::Player,
            bounds.pos,
            bounds.size,
            Style {
                dead: !self.player.alive && self.phase != GamePhase::LevelComplete,
                invulnerable: !self.player.vulnerable,
                facing_left: self.player.facing_left,
                ..Style::default()
            },
        );

        sprites
    }

    pub fn hud(&self, now: TimeMs) -> Hud {
        Hud {
            level: self.level,
            lives: self.player.lives,
            score: self.score,
            time_left_ms: self
                .clock
                .remaining(now, self.config.level_time_budget_ms),
            capacity: self.player.capacity,
            power: self.player.power,
            phase: self.phase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Layout;
    use crate::settings::SimConfig;
    use crate::sim::grid::GridPos;

    fn count(sprites: &[Sprite], kind: SpriteKind) -> usize {
        sprites.iter().filter(|s| s.kind == kind).count()
    }

    #[test]
    fn test_sprites_cover_world() {
        let layout = Layout {
            solids: vec![GridPos::new(1, 1), GridPos::new(1, 3)],
            destructibles: vec![GridPos::new(0, 4)],
            pickups: vec![(GridPos::new(0, 4), PickupKind::Capacity)],
            enemies: vec![GridPos::new(6, 6)],
        };
        let mut state = GameState::new(SimConfig::default(), 1);
        state.load_level(1, &layout, 0).unwrap();
        state.plant_device(GridPos::new(5, 5), 2, None).unwrap();

        let sprites = state.sprites();
        assert_eq!(count(&sprites, SpriteKind::SolidWall), 2);
        assert_eq!(count(&sprites, SpriteKind::DestructibleWall), 1);
        assert_eq!(count(&sprites, SpriteKind::Pickup(PickupKind::Capacity)), 1);
        assert_eq!(count(&sprites, SpriteKind::Device), 1);
        assert_eq!(count(&sprites, SpriteKind::Enemy), 1);
        assert_eq!(sprites.last().map(|s| s.kind), Some(SpriteKind::Player));
        assert!(sprites.last().unwrap().style.invulnerable);

        state.run_timers(2500);
        let sprites = state.sprites();
        let blasts = sprites
            .iter()
            .filter(|s| matches!(s.kind, SpriteKind::Blast(_)))
            .count();
        assert_eq!(blasts, 10);
        let tips = sprites.iter().filter(|s| s.style.tip.is_some()).count();
        assert_eq!(tips, 4);

        let json = serde_json::to_string(&sprites).unwrap();
        assert!(json.contains("Blast"));
    }

    #[test]
    fn test_hud_tracks_time() {
        let mut state = GameState::new(SimConfig::default(), 1);
        state.load_level(1, &Layout::default(), 1000).unwrap();
        let hud = state.hud(31_000);
        assert_eq!(hud.level, 1);
        assert_eq!(hud.lives, 5);
        assert_eq!(hud.time_left_ms, 90_000);
        assert_eq!(hud.phase, GamePhase::Playing);
    }
}
