//! Pausable, cancelable delayed events
//!
//! The scheduler does not hold closures. Each timer carries a `TimerEvent`
//! and the simulation dispatches it when the timer falls due, so a fired
//! event can freely schedule, cancel or pause other timers.
//!
//! Time is wall-clock milliseconds supplied by the host. The live table only
//! ever holds timers that could still fire: `pop_due` and `cancel` remove
//! entries.

use std::collections::BTreeMap;

use serde::Serialize;

use super::state::{DeviceId, EnemyId, ObstacleId, PickupId, SegmentId};
use crate::audio::SoundEffect;

/// Wall-clock milliseconds
pub type TimeMs = u64;

/// Unique key of a scheduled timer (never reused within a level)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TimerId(u64);

/// What happens when a timer fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Fuse (normal or early) ran out
    Detonate(DeviceId),
    /// Detonated device returns to its pool
    DeviceTeardown(DeviceId),
    /// Blast segment returns to its pool
    SegmentExpire(SegmentId),
    /// Collapsing obstacle leaves the grid
    ObstacleRemove(ObstacleId),
    /// Burnt pickup leaves the pickup matrix
    PickupBurnout(PickupId),
    /// One device slot returns to the player
    CapacityRestore,
    PlayerRespawn,
    InvulnerabilityEnd,
    /// Start cell opens to enemies again
    SpawnGuardLift,
    /// Dead enemy leaves the level
    EnemyRemove(EnemyId),
    /// Finish animation done; score and request the next level
    LevelAdvance,
    /// Delayed audio cue
    Cue(SoundEffect),
}

#[derive(Debug, Clone)]
struct Timer {
    event: TimerEvent,
    /// Requested delay
    delay: TimeMs,
    /// Remaining delay as of `started_at` (or as of the pause)
    remaining: TimeMs,
    /// Set while counting down
    started_at: Option<TimeMs>,
}

impl Timer {
    fn deadline(&self) -> Option<TimeMs> {
        self.started_at.map(|start| start + self.remaining)
    }

    fn pause(&mut self, now: TimeMs) {
        if let Some(start) = self.started_at.take() {
            self.remaining = self.remaining.saturating_sub(now.saturating_sub(start));
        }
    }

    fn resume(&mut self, now: TimeMs) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    fn remaining_at(&self, now: TimeMs) -> TimeMs {
        match self.started_at {
            Some(start) => self.remaining.saturating_sub(now.saturating_sub(start)),
            None => self.remaining,
        }
    }
}

/// Live-timer registry and clock
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    now: TimeMs,
    next_id: u64,
    live: BTreeMap<TimerId, Timer>,
}

impl Scheduler {
    pub fn new(now: TimeMs) -> Self {
        Self {
            now,
            ..Self::default()
        }
    }

    /// Scheduler clock: the last time observed or the deadline being fired
    pub fn now(&self) -> TimeMs {
        self.now
    }

    /// Move the clock forward (never backward)
    pub fn advance_clock(&mut self, now: TimeMs) {
        self.now = self.now.max(now);
    }

    /// Start a countdown of `delay` ms from the scheduler clock
    pub fn schedule(&mut self, event: TimerEvent, delay: TimeMs) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.live.insert(
            id,
            Timer {
                event,
                delay,
                remaining: delay,
                started_at: Some(self.now),
            },
        );
        log::trace!("timer {:?} scheduled: {:?} in {}ms", id, event, delay);
        id
    }

    /// Stop the countdown, keeping the remaining delay. No-op if already paused.
    pub fn pause(&mut self, id: TimerId) -> bool {
        let now = self.now;
        match self.live.get_mut(&id) {
            Some(timer) => {
                timer.pause(now);
                true
            }
            None => false,
        }
    }

    /// Restart the countdown for the remaining delay. No-op if running.
    pub fn resume(&mut self, id: TimerId) -> bool {
        let now = self.now;
        match self.live.get_mut(&id) {
            Some(timer) => {
                timer.resume(now);
                true
            }
            None => false,
        }
    }

    /// Drop the timer; its event never fires
    pub fn cancel(&mut self, id: TimerId) -> Option<TimerEvent> {
        self.live.remove(&id).map(|timer| timer.event)
    }

    pub fn pause_all(&mut self) {
        let now = self.now;
        for timer in self.live.values_mut() {
            timer.pause(now);
        }
    }

    pub fn resume_all(&mut self) {
        let now = self.now;
        for timer in self.live.values_mut() {
            timer.resume(now);
        }
    }

    pub fn is_live(&self, id: TimerId) -> bool {
        self.live.contains_key(&id)
    }

    pub fn is_paused(&self, id: TimerId) -> bool {
        self.live
            .get(&id)
            .is_some_and(|timer| timer.started_at.is_none())
    }

    /// Remaining delay at the scheduler clock
    pub fn remaining(&self, id: TimerId) -> Option<TimeMs> {
        self.live.get(&id).map(|timer| timer.remaining_at(self.now))
    }

    pub fn requested_delay(&self, id: TimerId) -> Option<TimeMs> {
        self.live.get(&id).map(|timer| timer.delay)
    }

    /// Pending event of a live timer
    pub fn event(&self, id: TimerId) -> Option<TimerEvent> {
        self.live.get(&id).map(|timer| timer.event)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Remove and return the earliest running timer due at or before `until`.
    ///
    /// Ties fire in scheduling order. The clock moves to the fired deadline,
    /// so timers scheduled by the dispatched event count from the moment it
    /// fired and may themselves fall due before `until`.
    pub fn pop_due(&mut self, until: TimeMs) -> Option<(TimerId, TimerEvent)> {
        let (id, deadline) = self
            .live
            .iter()
            .filter_map(|(id, timer)| timer.deadline().map(|deadline| (*id, deadline)))
            .filter(|(_, deadline)| *deadline <= until)
            .min_by_key(|(id, deadline)| (*deadline, *id))?;

        let timer = self.live.remove(&id)?;
        self.now = self.now.max(deadline);
        log::trace!("timer {:?} fired at {}: {:?}", id, self.now, timer.event);
        Some((id, timer.event))
    }

    /// Drop every timer (level teardown)
    pub fn clear(&mut self) {
        self.live.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn drain(scheduler: &mut Scheduler, until: TimeMs) -> Vec<(TimeMs, TimerEvent)> {
        let mut fired = Vec::new();
        while let Some((_, event)) = scheduler.pop_due(until) {
            fired.push((scheduler.now(), event));
        }
        scheduler.advance_clock(until);
        fired
    }

    #[test]
    fn test_fires_at_deadline() {
        let mut scheduler = Scheduler::new(1000);
        scheduler.schedule(TimerEvent::CapacityRestore, 500);

        assert!(drain(&mut scheduler, 1499).is_empty());
        let fired = drain(&mut scheduler, 1500);
        assert_eq!(fired, vec![(1500, TimerEvent::CapacityRestore)]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_fires_in_deadline_then_creation_order() {
        let mut scheduler = Scheduler::new(0);
        scheduler.schedule(TimerEvent::PlayerRespawn, 300);
        scheduler.schedule(TimerEvent::CapacityRestore, 100);
        scheduler.schedule(TimerEvent::SpawnGuardLift, 100);

        let fired: Vec<_> = drain(&mut scheduler, 1000).into_iter().map(|(_, e)| e).collect();
        assert_eq!(
            fired,
            vec![
                TimerEvent::CapacityRestore,
                TimerEvent::SpawnGuardLift,
                TimerEvent::PlayerRespawn
            ]
        );
    }

    #[test]
    fn test_cancel_never_fires() {
        let mut scheduler = Scheduler::new(0);
        let id = scheduler.schedule(TimerEvent::LevelAdvance, 100);
        assert_eq!(scheduler.cancel(id), Some(TimerEvent::LevelAdvance));
        assert!(!scheduler.is_live(id));
        assert!(drain(&mut scheduler, 10_000).is_empty());
        assert_eq!(scheduler.cancel(id), None);
    }

    #[test]
    fn test_resume_while_running_is_noop() {
        let mut scheduler = Scheduler::new(0);
        let id = scheduler.schedule(TimerEvent::CapacityRestore, 100);
        scheduler.advance_clock(60);
        scheduler.resume(id);
        assert_eq!(scheduler.remaining(id), Some(40));
        assert_eq!(drain(&mut scheduler, 100).len(), 1);
    }

    #[test]
    fn test_double_pause_keeps_remaining() {
        let mut scheduler = Scheduler::new(0);
        let id = scheduler.schedule(TimerEvent::CapacityRestore, 100);
        scheduler.advance_clock(30);
        scheduler.pause(id);
        scheduler.advance_clock(80);
        scheduler.pause(id);
        assert!(scheduler.is_paused(id));
        assert_eq!(scheduler.remaining(id), Some(70));
        assert_eq!(scheduler.requested_delay(id), Some(100));
    }

    #[test]
    fn test_paused_timer_does_not_fire() {
        let mut scheduler = Scheduler::new(0);
        scheduler.schedule(TimerEvent::CapacityRestore, 100);
        scheduler.advance_clock(50);
        scheduler.pause_all();
        assert!(drain(&mut scheduler, 100_000).is_empty());
        scheduler.resume_all();
        let fired = drain(&mut scheduler, 100_050);
        assert_eq!(fired, vec![(100_050, TimerEvent::CapacityRestore)]);
    }

    #[test]
    fn test_timer_scheduled_during_drain_fires_in_same_pass() {
        let mut scheduler = Scheduler::new(0);
        scheduler.schedule(TimerEvent::CapacityRestore, 100);

        let mut fired = Vec::new();
        while let Some((_, event)) = scheduler.pop_due(1000) {
            if event == TimerEvent::CapacityRestore {
                scheduler.schedule(TimerEvent::PlayerRespawn, 80);
            }
            fired.push((scheduler.now(), event));
        }
        assert_eq!(
            fired,
            vec![
                (100, TimerEvent::CapacityRestore),
                (180, TimerEvent::PlayerRespawn)
            ]
        );
    }

    proptest! {
        #[test]
        fn pause_resume_round_trip(
            delay in 1u64..10_000,
            before_pause in 0u64..10_000,
            gap in 0u64..10_000_000,
        ) {
            let before_pause = before_pause % delay;
            let mut scheduler = Scheduler::new(0);
            let id = scheduler.schedule(TimerEvent::CapacityRestore, delay);

            prop_assert!(scheduler.pop_due(before_pause).is_none());
            scheduler.advance_clock(before_pause);
            scheduler.pause(id);
            let remaining = delay - before_pause;
            prop_assert_eq!(scheduler.remaining(id), Some(remaining));

            let resumed_at = before_pause + gap;
            prop_assert!(scheduler.pop_due(resumed_at).is_none());
            scheduler.advance_clock(resumed_at);
            scheduler.resume(id);

            prop_assert!(scheduler.pop_due(resumed_at + remaining - 1).is_none());
            let fired = scheduler.pop_due(resumed_at + remaining);
            prop_assert_eq!(fired.map(|(_, e)| e), Some(TimerEvent::CapacityRestore));
            prop_assert_eq!(scheduler.now(), resumed_at + remaining);
        }
    }
}
