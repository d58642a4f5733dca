//! Level-layout collaborator
//!
//! A `Layout` is everything the simulation needs to start a level. The
//! simulation only reads it once, in `GameState::load_level`.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::{GRID_COLS, GRID_ROWS};
use crate::sim::grid::{Grid, GridPos};
use crate::sim::state::PickupKind;

/// Initial contents of one level
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Layout {
    pub solids: Vec<GridPos>,
    pub destructibles: Vec<GridPos>,
    /// Pickups, normally hidden under destructibles
    pub pickups: Vec<(GridPos, PickupKind)>,
    /// Enemy spawn cells
    pub enemies: Vec<GridPos>,
}

/// Supplies a layout per level
pub trait LevelLayout {
    fn build(&mut self, level: u32) -> Layout;
}

/// Destructible walls per level
pub const DESTRUCTIBLE_COUNT: usize = 45;
/// Hidden pickups of each kind per level
pub const PICKUPS_PER_KIND: usize = 5;

/// Pillars on odd coordinates, random destructibles, pickups and enemies
#[derive(Debug, Clone)]
pub struct ClassicLayout {
    rng: Pcg32,
}

impl ClassicLayout {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Enemies for a level: ceil(1 + 1.5 * level)
    pub fn enemy_count(level: u32) -> usize {
        (1.0 + level as f64 * 1.5).ceil() as usize
    }

    fn sample(&mut self, mut candidates: Vec<GridPos>, count: usize) -> Vec<GridPos> {
        candidates.shuffle(&mut self.rng);
        candidates.truncate(count);
        candidates
    }
}

impl LevelLayout for ClassicLayout {
    fn build(&mut self, level: u32) -> Layout {
        let solids: Vec<GridPos> = (0..(GRID_COLS - 1) / 2)
            .flat_map(|i| (0..(GRID_ROWS - 1) / 2).map(move |j| GridPos::new(1 + j * 2, 1 + i * 2)))
            .collect();

        // Keep both corner spawn zones clear
        let free: Vec<GridPos> = Grid::positions()
            .filter(|pos| !solids.contains(pos))
            .filter(|pos| !(pos.col < 2 && pos.row < 2))
            .filter(|pos| !(pos.col > GRID_COLS - 3 && pos.row > GRID_ROWS - 3))
            .collect();
        let destructibles = self.sample(free, DESTRUCTIBLE_COUNT);

        let hidden = self.sample(destructibles.clone(), PICKUPS_PER_KIND * 2);
        let pickups = hidden
            .iter()
            .enumerate()
            .map(|(i, pos)| {
                let kind = if i < PICKUPS_PER_KIND {
                    PickupKind::Capacity
                } else {
                    PickupKind::Power
                };
                (*pos, kind)
            })
            .collect();

        let open: Vec<GridPos> = Grid::positions()
            .filter(|pos| !solids.contains(pos) && !destructibles.contains(pos))
            .filter(|pos| !(pos.col < 3 && pos.row < 3))
            .collect();
        let enemies = self.sample(open, Self::enemy_count(level));

        log::info!(
            "Level {} layout: {} solids, {} destructibles, {} enemies",
            level,
            solids.len(),
            destructibles.len(),
            enemies.len()
        );

        Layout {
            solids,
            destructibles,
            pickups,
            enemies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classic_layout_shape() {
        let layout = ClassicLayout::new(7).build(1);
        assert_eq!(layout.solids.len(), 30);
        assert!(layout.solids.contains(&GridPos::new(1, 1)));
        assert!(layout.solids.contains(&GridPos::new(9, 11)));
        assert_eq!(layout.destructibles.len(), DESTRUCTIBLE_COUNT);
        assert_eq!(layout.pickups.len(), PICKUPS_PER_KIND * 2);
        assert_eq!(layout.enemies.len(), 3);

        for pos in &layout.destructibles {
            assert!(!layout.solids.contains(pos));
            assert!(!(pos.row < 2 && pos.col < 2));
            assert!(!(pos.row > 8 && pos.col > 10));
        }
        for (pos, _) in &layout.pickups {
            assert!(layout.destructibles.contains(pos));
        }
        for pos in &layout.enemies {
            assert!(!layout.destructibles.contains(pos));
            assert!(!layout.solids.contains(pos));
            assert!(!(pos.row < 3 && pos.col < 3));
        }
    }

    #[test]
    fn test_same_seed_same_layout() {
        let a = ClassicLayout::new(42).build(2);
        let b = ClassicLayout::new(42).build(2);
        assert_eq!(a.destructibles, b.destructibles);
        assert_eq!(a.enemies, b.enemies);
    }

    #[test]
    fn test_enemy_count_grows_with_level() {
        assert_eq!(ClassicLayout::enemy_count(1), 3);
        assert_eq!(ClassicLayout::enemy_count(2), 4);
        assert_eq!(ClassicLayout::enemy_count(5), 9);
    }
}
