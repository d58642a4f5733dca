//! Fixed-capacity object pools
//!
//! Slots are created once at level load. `acquire` hands out the first
//! inactive slot and `release` returns it. Releasing bumps the slot's
//! generation so a handle held past release cannot reach the next occupant.

use serde::Serialize;

use crate::error::{PoolKind, SimError};

/// Index + generation of a pooled slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PoolHandle {
    index: u32,
    generation: u32,
}

impl PoolHandle {
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    item: T,
    active: bool,
    generation: u32,
}

#[derive(Debug, Clone)]
pub struct Pool<T> {
    kind: PoolKind,
    slots: Vec<Slot<T>>,
    active: usize,
}

impl<T: Default> Pool<T> {
    pub fn new(kind: PoolKind, capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot {
                item: T::default(),
                active: false,
                generation: 0,
            })
            .collect();
        Self {
            kind,
            slots,
            active: 0,
        }
    }

    /// Rebuild every slot at `capacity` (level transition)
    pub fn reset(&mut self, capacity: usize) {
        *self = Self::new(self.kind, capacity);
    }
}

impl<T> Pool<T> {
    /// Mark the first inactive slot active and return its handle
    pub fn acquire(&mut self) -> Result<PoolHandle, SimError> {
        let Some(index) = self.slots.iter().position(|slot| !slot.active) else {
            return Err(SimError::PoolExhausted {
                pool: self.kind,
                capacity: self.slots.len(),
            });
        };
        let slot = &mut self.slots[index];
        slot.active = true;
        self.active += 1;
        Ok(PoolHandle {
            index: index as u32,
            generation: slot.generation,
        })
    }

    /// Deactivate a slot. Returns false for stale or inactive handles.
    pub fn release(&mut self, handle: PoolHandle) -> bool {
        match self.slots.get_mut(handle.index()) {
            Some(slot) if slot.active && slot.generation == handle.generation => {
                slot.active = false;
                slot.generation = slot.generation.wrapping_add(1);
                self.active -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.active && slot.generation == handle.generation)
            .map(|slot| &slot.item)
    }

    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.active && slot.generation == handle.generation)
            .map(|slot| &mut slot.item)
    }

    /// Active slots in slot order
    pub fn iter_active(&self) -> impl Iterator<Item = (PoolHandle, &T)> {
        self.slots.iter().enumerate().filter(|(_, slot)| slot.active).map(
            |(index, slot)| {
                (
                    PoolHandle {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    &slot.item,
                )
            },
        )
    }

    pub fn active_count(&self) -> usize {
        self.active
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.active == self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_acquire_first_inactive() {
        let mut pool: Pool<u32> = Pool::new(PoolKind::Devices, 3);
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert_eq!((a.index(), b.index()), (0, 1));

        assert!(pool.release(a));
        let c = pool.acquire().unwrap();
        assert_eq!(c.index(), 0);
        assert_eq!(pool.active_count(), 2);
    }

    #[test]
    fn test_exhaustion_is_an_error() {
        let mut pool: Pool<u32> = Pool::new(PoolKind::VerticalSegments, 2);
        pool.acquire().unwrap();
        pool.acquire().unwrap();
        assert!(pool.is_exhausted());
        assert_eq!(
            pool.acquire(),
            Err(SimError::PoolExhausted {
                pool: PoolKind::VerticalSegments,
                capacity: 2
            })
        );
        assert_eq!(pool.active_count(), 2);
    }

    #[test]
    fn test_stale_handle_rejected() {
        let mut pool: Pool<u32> = Pool::new(PoolKind::Devices, 1);
        let first = pool.acquire().unwrap();
        *pool.get_mut(first).unwrap() = 7;
        assert!(pool.release(first));
        assert!(!pool.release(first));

        let second = pool.acquire().unwrap();
        assert_eq!(first.index(), second.index());
        assert!(pool.get(first).is_none());
        assert!(pool.get(second).is_some());
    }

    #[test]
    fn test_reset_restores_capacity() {
        let mut pool: Pool<u32> = Pool::new(PoolKind::Devices, 2);
        pool.acquire().unwrap();
        pool.reset(4);
        assert_eq!(pool.capacity(), 4);
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.iter_active().count(), 0);
    }

    proptest! {
        #[test]
        fn active_count_never_exceeds_capacity(
            capacity in 1usize..16,
            ops in proptest::collection::vec(any::<bool>(), 0..64),
        ) {
            let mut pool: Pool<u8> = Pool::new(PoolKind::Devices, capacity);
            let mut held = Vec::new();
            for acquire in ops {
                if acquire {
                    match pool.acquire() {
                        Ok(handle) => held.push(handle),
                        Err(_) => prop_assert_eq!(held.len(), capacity),
                    }
                } else if let Some(handle) = held.pop() {
                    prop_assert!(pool.release(handle));
                }
                prop_assert!(pool.active_count() <= pool.capacity());
                prop_assert_eq!(pool.active_count(), held.len());
                prop_assert_eq!(pool.iter_active().count(), held.len());
            }
        }
    }
}
