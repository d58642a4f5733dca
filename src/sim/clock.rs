//! Level clock and scoring
//!
//! Paused time never counts towards the level time. The clock freezes when
//! the player reaches the finish so the score uses the finishing time.

use serde::Serialize;

use super::timer::TimeMs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelClock {
    started_at: TimeMs,
    paused_at: Option<TimeMs>,
    paused_total: TimeMs,
    frozen: Option<TimeMs>,
}

impl LevelClock {
    pub fn start(now: TimeMs) -> Self {
        Self {
            started_at: now,
            paused_at: None,
            paused_total: 0,
            frozen: None,
        }
    }

    pub fn pause(&mut self, now: TimeMs) {
        if self.paused_at.is_none() {
            self.paused_at = Some(now);
        }
    }

    /// Re-baseline so the paused span is skipped
    pub fn resume(&mut self, now: TimeMs) {
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_total += now.saturating_sub(paused_at);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    /// Stop counting; later reads return the time at `now`
    pub fn freeze(&mut self, now: TimeMs) {
        if self.frozen.is_none() {
            self.frozen = Some(self.elapsed(now));
        }
    }

    /// Unpaused time since the level started
    pub fn elapsed(&self, now: TimeMs) -> TimeMs {
        if let Some(frozen) = self.frozen {
            return frozen;
        }
        let end = self.paused_at.unwrap_or(now);
        end.saturating_sub(self.started_at)
            .saturating_sub(self.paused_total)
    }

    /// Time left of `budget`, floored at zero
    pub fn remaining(&self, now: TimeMs, budget: TimeMs) -> TimeMs {
        budget.saturating_sub(self.elapsed(now))
    }
}

/// Points for finishing `level` in `level_time_ms` with `lives` left.
///
/// Seconds under budget, times lives, times level. Overtime scores nothing.
pub fn level_score(budget_ms: TimeMs, level_time_ms: TimeMs, lives: u32, level: u32) -> f64 {
    let seconds_left = (budget_ms as f64 - level_time_ms as f64) / 1000.0;
    (seconds_left * lives as f64 * level as f64).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_elapsed_counts_from_start() {
        let clock = LevelClock::start(1000);
        assert_eq!(clock.elapsed(1000), 0);
        assert_eq!(clock.elapsed(4500), 3500);
        assert_eq!(clock.remaining(4500, 120_000), 116_500);
    }

    #[test]
    fn test_pause_is_excluded() {
        let mut clock = LevelClock::start(0);
        clock.pause(10_000);
        assert!(clock.is_paused());
        assert_eq!(clock.elapsed(50_000), 10_000);
        clock.resume(50_000);
        assert_eq!(clock.elapsed(55_000), 15_000);

        // Double pause keeps the first pause point
        clock.pause(60_000);
        clock.pause(70_000);
        clock.resume(80_000);
        assert_eq!(clock.elapsed(80_000), 20_000);
    }

    #[test]
    fn test_freeze_holds_finish_time() {
        let mut clock = LevelClock::start(0);
        clock.freeze(42_000);
        assert_eq!(clock.elapsed(90_000), 42_000);
        clock.freeze(95_000);
        assert_eq!(clock.elapsed(99_000), 42_000);
    }

    #[test]
    fn test_level_score() {
        // 60 s under budget, 3 lives, level 2
        assert_eq!(level_score(120_000, 60_000, 3, 2), 360.0);
        assert_eq!(level_score(120_000, 119_500, 1, 1), 0.5);
        assert_eq!(level_score(120_000, 150_000, 5, 5), 0.0);
    }

    proptest! {
        #[test]
        fn prop_pauses_never_count(
            spans in proptest::collection::vec((0u64..5_000, 0u64..5_000), 0..20),
        ) {
            let mut clock = LevelClock::start(0);
            let mut now = 0;
            let mut running = 0;
            for (run, pause) in spans {
                now += run;
                running += run;
                clock.pause(now);
                now += pause;
                clock.resume(now);
            }
            prop_assert_eq!(clock.elapsed(now), running);
        }
    }
}
