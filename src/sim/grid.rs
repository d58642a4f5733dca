//! Occupancy grid
//!
//! Authoritative "what occupies cell (r, c)" map plus a parallel pickup map.
//! Reads are bounds-checked and return a safe default outside the grid.
//! Writes are immediate; the only writers are device placement/removal,
//! obstacle removal, pickup removal and level loading.

use serde::{Deserialize, Serialize};

use super::state::{DeviceId, ObstacleId, PickupId};
use crate::consts::{GRID_COLS, GRID_ROWS};
use crate::error::SimError;

/// Grid coordinate. Signed so blast rays can step off the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridPos {
    pub row: i32,
    pub col: i32,
}

impl GridPos {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Cell `distance` steps away in `dir`
    pub fn step(self, dir: Direction, distance: i32) -> Self {
        let (dr, dc) = dir.delta();
        Self::new(self.row + dr * distance, self.col + dc * distance)
    }
}

/// Blast segment axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Right,
    Left,
    Down,
    Up,
}

impl Direction {
    /// Order in which a detonation checks each ring
    pub const BLAST_ORDER: [Direction; 4] = [
        Direction::Right,
        Direction::Left,
        Direction::Down,
        Direction::Up,
    ];

    /// (row, col) delta
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Right => (0, 1),
            Direction::Left => (0, -1),
            Direction::Down => (1, 0),
            Direction::Up => (-1, 0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Right => Direction::Left,
            Direction::Left => Direction::Right,
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
        }
    }

    pub fn orientation(self) -> Orientation {
        match self {
            Direction::Right | Direction::Left => Orientation::Horizontal,
            Direction::Down | Direction::Up => Orientation::Vertical,
        }
    }
}

/// Occupant of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Solid,
    Destructible(ObstacleId),
    Device(DeviceId),
}

#[derive(Debug, Clone)]
pub struct Grid {
    cells: Vec<Cell>,
    pickups: Vec<Option<PickupId>>,
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl Grid {
    pub fn new() -> Self {
        let len = (GRID_ROWS * GRID_COLS) as usize;
        Self {
            cells: vec![Cell::Empty; len],
            pickups: vec![None; len],
        }
    }

    #[inline]
    pub fn in_bounds(pos: GridPos) -> bool {
        (0..GRID_ROWS).contains(&pos.row) && (0..GRID_COLS).contains(&pos.col)
    }

    fn index(pos: GridPos) -> Option<usize> {
        Self::in_bounds(pos).then(|| (pos.row * GRID_COLS + pos.col) as usize)
    }

    fn checked_index(pos: GridPos) -> Result<usize, SimError> {
        Self::index(pos).ok_or(SimError::InvalidCell {
            row: pos.row,
            col: pos.col,
        })
    }

    // === Reads ===

    /// Outside the playfield
    pub fn is_edge(&self, pos: GridPos) -> bool {
        !Self::in_bounds(pos)
    }

    /// Occupant, `None` outside the grid
    pub fn cell(&self, pos: GridPos) -> Option<Cell> {
        Self::index(pos).map(|i| self.cells[i])
    }

    /// Solid or destructible
    pub fn is_obstacle(&self, pos: GridPos) -> bool {
        matches!(
            self.cell(pos),
            Some(Cell::Solid) | Some(Cell::Destructible(_))
        )
    }

    pub fn is_solid(&self, pos: GridPos) -> bool {
        self.cell(pos) == Some(Cell::Solid)
    }

    pub fn destructible_at(&self, pos: GridPos) -> Option<ObstacleId> {
        match self.cell(pos) {
            Some(Cell::Destructible(id)) => Some(id),
            _ => None,
        }
    }

    pub fn is_device(&self, pos: GridPos) -> bool {
        self.device_at(pos).is_some()
    }

    pub fn device_at(&self, pos: GridPos) -> Option<DeviceId> {
        match self.cell(pos) {
            Some(Cell::Device(id)) => Some(id),
            _ => None,
        }
    }

    pub fn is_pickup(&self, pos: GridPos) -> bool {
        self.pickup_at(pos).is_some()
    }

    pub fn pickup_at(&self, pos: GridPos) -> Option<PickupId> {
        Self::index(pos).and_then(|i| self.pickups[i])
    }

    /// In bounds and unoccupied
    pub fn is_empty(&self, pos: GridPos) -> bool {
        self.cell(pos) == Some(Cell::Empty)
    }

    // === Writes ===

    /// Level loading only
    pub fn set_solid(&mut self, pos: GridPos) -> Result<(), SimError> {
        let i = Self::checked_index(pos)?;
        self.cells[i] = Cell::Solid;
        Ok(())
    }

    /// Level loading only
    pub fn set_destructible(&mut self, pos: GridPos, id: ObstacleId) -> Result<(), SimError> {
        let i = Self::checked_index(pos)?;
        self.cells[i] = Cell::Destructible(id);
        Ok(())
    }

    /// Level loading only
    pub fn set_pickup(&mut self, pos: GridPos, id: PickupId) -> Result<(), SimError> {
        let i = Self::checked_index(pos)?;
        self.pickups[i] = Some(id);
        Ok(())
    }

    /// Occupy an empty cell with a device. Returns false if the cell is taken.
    pub fn place_device(&mut self, pos: GridPos, id: DeviceId) -> Result<bool, SimError> {
        let i = Self::checked_index(pos)?;
        if self.cells[i] != Cell::Empty {
            return Ok(false);
        }
        self.cells[i] = Cell::Device(id);
        Ok(true)
    }

    /// Clear the cell if it still holds this device
    pub fn clear_device(&mut self, pos: GridPos, id: DeviceId) -> bool {
        self.clear_if(pos, Cell::Device(id))
    }

    /// Clear whatever device sits at `pos` and return it
    pub fn take_device(&mut self, pos: GridPos) -> Option<DeviceId> {
        let i = Self::index(pos)?;
        match self.cells[i] {
            Cell::Device(id) => {
                self.cells[i] = Cell::Empty;
                Some(id)
            }
            _ => None,
        }
    }

    /// Clear the cell if it still holds this obstacle
    pub fn clear_obstacle(&mut self, pos: GridPos, id: ObstacleId) -> bool {
        self.clear_if(pos, Cell::Destructible(id))
    }

    /// Clear the pickup slot if it still holds this pickup
    pub fn clear_pickup(&mut self, pos: GridPos, id: PickupId) -> bool {
        match Self::index(pos) {
            Some(i) if self.pickups[i] == Some(id) => {
                self.pickups[i] = None;
                true
            }
            _ => false,
        }
    }

    fn clear_if(&mut self, pos: GridPos, expected: Cell) -> bool {
        match Self::index(pos) {
            Some(i) if self.cells[i] == expected => {
                self.cells[i] = Cell::Empty;
                true
            }
            _ => false,
        }
    }

    /// All in-bounds positions in row-major order
    pub fn positions() -> impl Iterator<Item = GridPos> {
        (0..GRID_ROWS).flat_map(|row| (0..GRID_COLS).map(move |col| GridPos::new(row, col)))
    }
}
