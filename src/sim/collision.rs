//! Axis-aligned collision and penetration resolution
//!
//! Every solid thing on the grid (pillar, destructible wall, device) is a box.
//! A mover overlapping a box is pushed out along the axis of least
//! penetration. The corner-slip refinement lets a mover glide round a corner
//! it only clips, instead of stopping dead.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A mover can touch at most this many wall boxes around one cell
pub const MAX_WALL_CONTACTS: usize = 3;
/// Devices sit on cell centres; only one can be in contact at a time
pub const MAX_DEVICE_CONTACTS: usize = 1;

/// Axis-aligned box (top-left + size, pixels, y down)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Aabb {
    pub pos: Vec2,
    pub size: Vec2,
}

impl Aabb {
    pub fn new(pos: Vec2, size: Vec2) -> Self {
        Self { pos, size }
    }

    pub fn square(pos: Vec2, edge: f32) -> Self {
        Self::new(pos, Vec2::splat(edge))
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.pos.x
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.pos.x + self.size.x
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.pos.y
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.pos.y + self.size.y
    }

    pub fn center(&self) -> Vec2 {
        self.pos + self.size / 2.0
    }

    pub fn with_pos(&self, pos: Vec2) -> Self {
        Self::new(pos, self.size)
    }

    /// Overlap test. Touching edges count as contact.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        !(self.right() < other.left()
            || self.left() > other.right()
            || self.bottom() < other.top()
            || self.top() > other.bottom())
    }

    /// Box shrunk by `amount` on every side
    pub fn shrink(&self, amount: f32) -> Self {
        let size = (self.size - Vec2::splat(2.0 * amount)).max(Vec2::ZERO);
        Self::new(self.pos + Vec2::splat(amount), size)
    }

    /// `inner` lies inside this box, allowing `slack` overhang per side
    pub fn contains(&self, inner: &Aabb, slack: f32) -> bool {
        inner.left() + slack >= self.left()
            && inner.right() - slack <= self.right()
            && inner.top() + slack >= self.top()
            && inner.bottom() - slack <= self.bottom()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// Signed translation that separates a mover from a box along one axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Separation {
    pub axis: Axis,
    pub delta: f32,
}

impl Separation {
    fn apply(&self, pos: Vec2) -> Vec2 {
        match self.axis {
            Axis::X => Vec2::new(pos.x + self.delta, pos.y),
            Axis::Y => Vec2::new(pos.x, pos.y + self.delta),
        }
    }
}

/// The four candidate separations, smallest magnitude first (stable order on ties:
/// push left, push right, push up, push down)
pub fn separations(mover: &Aabb, obstacle: &Aabb) -> [Separation; 4] {
    let mut candidates = [
        Separation {
            axis: Axis::X,
            delta: obstacle.left() - mover.right(),
        },
        Separation {
            axis: Axis::X,
            delta: obstacle.right() - mover.left(),
        },
        Separation {
            axis: Axis::Y,
            delta: obstacle.top() - mover.bottom(),
        },
        Separation {
            axis: Axis::Y,
            delta: obstacle.bottom() - mover.top(),
        },
    ];
    candidates.sort_by(|a, b| a.delta.abs().total_cmp(&b.delta.abs()));
    candidates
}

/// Corrected mover position: unchanged when clear, otherwise pushed out along
/// the minimum-penetration axis.
pub fn resolve(mover: &Aabb, obstacle: &Aabb) -> Vec2 {
    if !mover.overlaps(obstacle) {
        return mover.pos;
    }
    separations(mover, obstacle)[0].apply(mover.pos)
}

/// Corner-slip thresholds in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlipTuning {
    /// Second-smallest separation must be below this
    pub threshold: f32,
    /// Per-axis nudge applied instead of the full push-out
    pub nudge: f32,
}

impl SlipTuning {
    pub fn from_config(config: &crate::settings::SimConfig) -> Self {
        Self {
            threshold: config.cell_size * config.corner_slip.fraction,
            nudge: config.corner_slip.nudge * config.scale(),
        }
    }
}

/// What the mover is doing this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlipContext {
    /// Movement input on a single axis only
    pub single_axis: bool,
    /// Wall boxes hit this tick
    pub contacts: usize,
}

/// `resolve` with the corner-slip refinement
pub fn resolve_with_slip(
    mover: &Aabb,
    obstacle: &Aabb,
    ctx: SlipContext,
    tuning: SlipTuning,
) -> Vec2 {
    if !mover.overlaps(obstacle) {
        return mover.pos;
    }
    let [smallest, second, ..] = separations(mover, obstacle);

    if ctx.single_axis
        && ctx.contacts == 1
        && second.delta.abs() < tuning.threshold
        && smallest.axis != second.axis
    {
        let (dx, dy) = match smallest.axis {
            Axis::X => (smallest.delta, second.delta),
            Axis::Y => (second.delta, smallest.delta),
        };
        return mover.pos + Vec2::new(dx.signum(), dy.signum()) * tuning.nudge;
    }

    smallest.apply(mover.pos)
}

/// Anything with a box a mover can run into
pub trait Collider {
    fn bounds(&self) -> Aabb;

    /// Where `mover` ends up after being pushed out of this collider
    fn push_out(&self, mover: &Aabb) -> Vec2 {
        resolve(mover, &self.bounds())
    }

    /// The mover would be moved by this collider
    fn blocks(&self, mover: &Aabb) -> bool {
        self.push_out(mover) != mover.pos
    }
}

impl Collider for Aabb {
    fn bounds(&self) -> Aabb {
        *self
    }
}

/// Resolve a mover against wall boxes.
///
/// Contacts are gathered first: at most one solid, then destructibles up to
/// `MAX_WALL_CONTACTS` in total. Each contact is then resolved in turn
/// against the progressively corrected position.
pub fn resolve_walls(
    mover: Aabb,
    solids: &[Aabb],
    destructibles: &[Aabb],
    single_axis: bool,
    tuning: SlipTuning,
) -> Vec2 {
    let blocking = |wall: &&Aabb| {
        let ctx = SlipContext {
            single_axis,
            contacts: MAX_WALL_CONTACTS,
        };
        resolve_with_slip(&mover, wall, ctx, tuning) != mover.pos
    };

    let mut contacts: Vec<Aabb> = solids.iter().filter(&blocking).take(1).copied().collect();
    let room = MAX_WALL_CONTACTS - contacts.len();
    contacts.extend(destructibles.iter().filter(&blocking).take(room).copied());

    let ctx = SlipContext {
        single_axis,
        contacts: contacts.len(),
    };
    contacts.iter().fold(mover.pos, |pos, wall| {
        resolve_with_slip(&mover.with_pos(pos), wall, ctx, tuning)
    })
}

/// Resolve a mover against device boxes, honouring `MAX_DEVICE_CONTACTS`
pub fn resolve_devices<'a>(mover: Aabb, devices: impl IntoIterator<Item = &'a Aabb>) -> Vec2 {
    devices
        .into_iter()
        .filter(|device| device.blocks(&mover))
        .take(MAX_DEVICE_CONTACTS)
        .fold(mover.pos, |pos, device| device.push_out(&mover.with_pos(pos)))
}
