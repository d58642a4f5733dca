//! Device lifecycle and blast propagation
//!
//! A device is armed on an empty cell, detonates when its fuse runs out (or
//! shortly after another blast reaches it) and is torn down once its blast
//! has faded. Propagation walks rings 1..=power outwards, checking all four
//! directions of a ring before drawing any of them.

use glam::Vec2;

use super::collision::Aabb;
use super::grid::{Cell, Direction, GridPos, Orientation};
use super::state::{
    BlastSegment, Device, DeviceId, DeviceState, GameEvent, GameState, ObstacleId, ObstacleState,
    Owner, PickupId, PickupState, SegmentId,
};
use super::timer::TimerEvent;
use crate::audio::{AudioCue, AudioLoop, SoundEffect};
use crate::consts::DEVICE_SIZE;
use crate::error::{SimError, TriggerTarget};

impl GameState {
    /// Arm a device on an empty cell
    pub fn plant_device(
        &mut self,
        cell: GridPos,
        power: u32,
        owner: Option<Owner>,
    ) -> Result<DeviceId, SimError> {
        match self.grid.cell(cell) {
            None => {
                return Err(SimError::InvalidCell {
                    row: cell.row,
                    col: cell.col,
                });
            }
            Some(Cell::Empty) => {}
            Some(_) => {
                return Err(SimError::CellOccupied {
                    row: cell.row,
                    col: cell.col,
                });
            }
        }

        let handle = self.devices.acquire()?;
        let id = DeviceId(handle);
        self.grid.place_device(cell, id)?;
        let fuse = self.schedule(TimerEvent::Detonate(id), self.config.fuse_ms);

        let edge = DEVICE_SIZE * self.scale();
        let bounds = Aabb::square(self.cell_center(cell) - Vec2::splat(edge / 2.0), edge);
        if let Some(device) = self.devices.get_mut(handle) {
            *device = Device {
                cell,
                bounds,
                power,
                owner,
                state: DeviceState::Armed,
                fuse: Some(fuse),
                early: false,
            };
        }

        self.cue(AudioCue::Play(SoundEffect::PlaceDevice));
        self.cue(AudioCue::StartLoop(AudioLoop::Ticking));
        self.emit(GameEvent::DevicePlaced { cell });
        log::debug!("Device armed at ({}, {}) power {}", cell.row, cell.col, power);
        Ok(id)
    }

    /// Replace an armed device's fuse with the short chain-reaction fuse
    pub fn explode_early(&mut self, id: DeviceId) -> Result<(), SimError> {
        let double = SimError::DoubleTrigger(TriggerTarget::Device);
        let device = self.devices.get_mut(id.0).ok_or(double)?;
        if device.state != DeviceState::Armed || device.early {
            return Err(double);
        }
        device.early = true;
        if let Some(fuse) = device.fuse.take() {
            self.scheduler.cancel(fuse);
        }
        let fuse = self
            .scheduler
            .schedule(TimerEvent::Detonate(id), self.config.early_fuse_ms);
        if let Some(device) = self.devices.get_mut(id.0) {
            device.fuse = Some(fuse);
        }
        Ok(())
    }

    /// Fuse ran out. Stale or already detonated devices are ignored.
    pub(crate) fn detonate(&mut self, id: DeviceId) {
        let Some(device) = self.devices.get_mut(id.0) else {
            return;
        };
        if device.state != DeviceState::Armed {
            return;
        }
        device.state = DeviceState::Detonating;
        device.fuse = None;
        let (origin, power) = (device.cell, device.power);

        self.cue(AudioCue::Play(SoundEffect::Explosion));
        if self.armed_device_count() == 0 {
            self.cue(AudioCue::StopLoop(AudioLoop::Ticking));
        }
        self.emit(GameEvent::DeviceDetonated { cell: origin, power });
        log::debug!("Device at ({}, {}) detonated", origin.row, origin.col);

        self.propagate(origin, power);
        self.schedule(TimerEvent::DeviceTeardown(id), self.config.device_teardown_ms);
    }

    fn propagate(&mut self, origin: GridPos, power: u32) {
        self.emit_segment(origin, Orientation::Horizontal, None);
        self.emit_segment(origin, Orientation::Vertical, None);

        let mut going = [true; 4];
        let mut terminal: [Option<SegmentId>; 4] = [None; 4];
        let mut wall_cue = false;

        for ring in 1..=power as i32 {
            for (k, dir) in Direction::BLAST_ORDER.into_iter().enumerate() {
                if !going[k] {
                    continue;
                }
                let target = origin.step(dir, ring);
                let mut found_wall = false;
                match self.grid.cell(target) {
                    None | Some(Cell::Solid) => {
                        going[k] = false;
                        found_wall = true;
                    }
                    Some(Cell::Destructible(obstacle)) => {
                        going[k] = false;
                        found_wall = true;
                        if let Err(e) = self.collapse_obstacle(obstacle) {
                            log::trace!("{e}");
                        }
                        if !wall_cue {
                            wall_cue = true;
                            self.schedule(
                                TimerEvent::Cue(SoundEffect::WallBreak),
                                self.config.wall_break_cue_ms,
                            );
                        }
                    }
                    Some(Cell::Device(_)) => {
                        if let Some(other) = self.grid.take_device(target) {
                            if let Err(e) = self.explode_early(other) {
                                log::trace!("{e}");
                            }
                        }
                    }
                    Some(Cell::Empty) => {}
                }

                if !found_wall {
                    if let Some(pickup) = self.grid.pickup_at(target) {
                        going[k] = false;
                        if let Err(e) = self.burn_pickup(pickup) {
                            log::trace!("{e}");
                        }
                    }
                }
            }

            for (k, dir) in Direction::BLAST_ORDER.into_iter().enumerate() {
                if going[k] {
                    terminal[k] = self.emit_segment(origin.step(dir, ring), dir.orientation(), None);
                }
            }
        }

        // Rays that ran their full length get an end cap
        for (k, dir) in Direction::BLAST_ORDER.into_iter().enumerate() {
            if let (true, Some(id)) = (going[k], terminal[k]) {
                if let Some(segment) = self.segments.pool_mut(id.orientation).get_mut(id.handle) {
                    segment.tip = Some(dir);
                }
            }
        }
    }

    /// Acquire and place one segment. Exhaustion skips the segment.
    fn emit_segment(
        &mut self,
        cell: GridPos,
        orientation: Orientation,
        tip: Option<Direction>,
    ) -> Option<SegmentId> {
        let bounds = self.segment_bounds(cell, orientation);
        let pool = self.segments.pool_mut(orientation);
        let handle = match pool.acquire() {
            Ok(handle) => handle,
            Err(e) => {
                log::warn!("Blast segment at ({}, {}) skipped: {}", cell.row, cell.col, e);
                return None;
            }
        };
        if let Some(segment) = pool.get_mut(handle) {
            *segment = BlastSegment { cell, bounds, tip };
        }
        let id = SegmentId {
            orientation,
            handle,
        };
        self.schedule(TimerEvent::SegmentExpire(id), self.config.blast_lifetime_ms);
        Some(id)
    }

    /// Full cell along the segment's axis, half a cell across it
    pub fn segment_bounds(&self, cell: GridPos, orientation: Orientation) -> Aabb {
        let cell_size = self.config.cell_size;
        let size = match orientation {
            Orientation::Horizontal => Vec2::new(cell_size, cell_size / 2.0),
            Orientation::Vertical => Vec2::new(cell_size / 2.0, cell_size),
        };
        Aabb::new(self.cell_center(cell) - size / 2.0, size)
    }

    /// Start an intact obstacle collapsing. It keeps blocking until removed.
    pub fn collapse_obstacle(&mut self, id: ObstacleId) -> Result<(), SimError> {
        let double = SimError::DoubleTrigger(TriggerTarget::Obstacle(id.0));
        let obstacle = self.obstacles.get_mut(id.0 as usize).ok_or(double)?;
        if obstacle.state != ObstacleState::Intact {
            return Err(double);
        }
        obstacle.state = ObstacleState::Collapsing;
        let cell = obstacle.cell;
        self.schedule(TimerEvent::ObstacleRemove(id), self.config.collapse_delay_ms);
        self.emit(GameEvent::ObstacleCollapsing { cell });
        Ok(())
    }

    pub(crate) fn remove_obstacle(&mut self, id: ObstacleId) {
        let Some(obstacle) = self.obstacles.get_mut(id.0 as usize) else {
            return;
        };
        obstacle.state = ObstacleState::Removed;
        let cell = obstacle.cell;
        self.grid.clear_obstacle(cell, id);
        let revealed_pickup = self.grid.is_pickup(cell);
        self.emit(GameEvent::ObstacleRemoved {
            cell,
            revealed_pickup,
        });
    }

    /// Start a present pickup burning. It keeps stopping blasts until gone.
    pub fn burn_pickup(&mut self, id: PickupId) -> Result<(), SimError> {
        let double = SimError::DoubleTrigger(TriggerTarget::Pickup(id.0));
        let pickup = self.pickups.get_mut(id.0 as usize).ok_or(double)?;
        if pickup.state != PickupState::Present {
            return Err(double);
        }
        pickup.state = PickupState::Burning;
        self.schedule(TimerEvent::PickupBurnout(id), self.config.pickup_burn_ms);
        Ok(())
    }

    pub(crate) fn burn_out_pickup(&mut self, id: PickupId) {
        let Some(pickup) = self.pickups.get_mut(id.0 as usize) else {
            return;
        };
        pickup.state = PickupState::Consumed;
        let cell = pickup.cell;
        self.grid.clear_pickup(cell, id);
        self.emit(GameEvent::PickupBurnt { cell });
    }

    /// Free the device slot; its cell is cleared only if it still holds it
    pub(crate) fn teardown_device(&mut self, id: DeviceId) {
        let Some(device) = self.devices.get(id.0) else {
            return;
        };
        let cell = device.cell;
        self.grid.clear_device(cell, id);
        self.devices.release(id.0);
    }

    pub(crate) fn expire_segment(&mut self, id: SegmentId) {
        self.segments.release(id);
    }
}
