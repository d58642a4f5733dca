//! Frame tick
//!
//! The host calls `tick` once per rendered frame with the current wall-clock
//! time. Due timers fire first, in deadline order, then entities move by the
//! elapsed time expressed in reference frames.

use super::clock::level_score;
use super::player::MoveIntent;
use super::state::{GameEvent, GamePhase, GameState};
use super::timer::{TimeMs, TimerEvent};
use crate::audio::{AudioCue, SoundEffect};
use crate::consts::*;

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Held direction keys
    pub intent: MoveIntent,
    /// Drop a device (edge-triggered)
    pub drop_device: bool,
    /// Pause toggle
    pub pause: bool,
}

/// Advance the game to `now`
pub fn tick(state: &mut GameState, input: &TickInput, now: TimeMs) {
    if input.pause {
        state.toggle_pause(now);
    }

    match state.phase {
        GamePhase::Playing | GamePhase::LevelComplete => {}
        _ => {
            state.last_frame = Some(now);
            return;
        }
    }

    state.run_timers(now);
    let frames = state.frame_delta(now);

    if state.phase != GamePhase::Playing {
        return;
    }

    state.player.intent = input.intent;
    if input.drop_device {
        state.drop_device();
    }
    state.move_player(frames);
    state.move_enemies(frames);
}

impl GameState {
    /// Fire every timer due by `now`, then move the scheduler clock to `now`
    pub fn run_timers(&mut self, now: TimeMs) {
        while let Some((_, event)) = self.scheduler.pop_due(now) {
            self.dispatch(event);
        }
        self.scheduler.advance_clock(now);
    }

    fn dispatch(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::Detonate(id) => self.detonate(id),
            TimerEvent::DeviceTeardown(id) => self.teardown_device(id),
            TimerEvent::SegmentExpire(id) => self.expire_segment(id),
            TimerEvent::ObstacleRemove(id) => self.remove_obstacle(id),
            TimerEvent::PickupBurnout(id) => self.burn_out_pickup(id),
            TimerEvent::CapacityRestore => self.player.capacity += 1,
            TimerEvent::PlayerRespawn => self.respawn_player(),
            TimerEvent::InvulnerabilityEnd => self.player.vulnerable = true,
            TimerEvent::SpawnGuardLift => self.lift_spawn_guard(),
            TimerEvent::EnemyRemove(id) => self.remove_enemy(id),
            TimerEvent::LevelAdvance => self.advance_level(),
            TimerEvent::Cue(effect) => self.cue(AudioCue::Play(effect)),
        }
    }

    /// Reference frames since the previous tick, capped
    fn frame_delta(&mut self, now: TimeMs) -> f32 {
        let frames = self
            .last_frame
            .map(|last| now.saturating_sub(last) as f32 / FRAME_MS)
            .unwrap_or(0.0);
        self.last_frame = Some(now);
        frames.min(MAX_FRAME_STEP)
    }

    /// Pause or resume play. Timers, loops and the level clock all stop.
    pub fn toggle_pause(&mut self, now: TimeMs) {
        match self.phase {
            GamePhase::Playing | GamePhase::LevelComplete => {
                self.run_timers(now);
                self.scheduler.pause_all();
                self.clock.pause(now);
                self.resume_phase = self.phase;
                self.phase = GamePhase::Paused;
                self.cue(AudioCue::PauseLoops);
                self.emit(GameEvent::Paused);
                log::info!("Paused at level time {} ms", self.clock.elapsed(now));
            }
            GamePhase::Paused => {
                self.scheduler.advance_clock(now);
                self.scheduler.resume_all();
                self.clock.resume(now);
                self.phase = self.resume_phase;
                self.last_frame = Some(now);
                self.cue(AudioCue::ResumeLoops);
                self.emit(GameEvent::Resumed);
                log::info!("Resumed");
            }
            _ => {}
        }
    }

    /// Transition timer after the finish: score, then next level or victory
    fn advance_level(&mut self) {
        let now = self.scheduler.now();
        let level_time = self.clock.elapsed(now);
        let added = level_score(
            self.config.level_time_budget_ms,
            level_time,
            self.player.lives,
            self.level,
        );
        self.score += added;
        self.emit(GameEvent::LevelScored {
            level: self.level,
            added,
            total: self.score,
        });

        if self.level >= self.config.max_level {
            self.phase = GamePhase::Victory;
            self.cue(AudioCue::Play(SoundEffect::Victory));
            self.emit(GameEvent::Victory { score: self.score });
            log::info!("Victory with score {:.0}", self.score);
        } else {
            self.phase = GamePhase::AwaitingLevel;
            self.emit(GameEvent::LevelRequested {
                level: self.level + 1,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{ClassicLayout, Layout};
    use crate::settings::SimConfig;
    use crate::sim::grid::GridPos;
    use crate::sim::state::DeviceState;
    use glam::Vec2;

    fn playing(layout: Layout, config: SimConfig) -> GameState {
        let mut state = GameState::new(config, 12345);
        state.load_level(1, &layout, 0).unwrap();
        state.drain_events();
        state
    }

    fn pause() -> TickInput {
        TickInput {
            pause: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_tick_moves_player() {
        let mut state = playing(Layout::default(), SimConfig::default());
        let input = TickInput {
            intent: MoveIntent {
                down: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let start = state.player.pos;
        tick(&mut state, &input, 167);
        assert!(state.player.pos.y > start.y);
        assert_eq!(state.player.pos.x, start.x);
    }

    #[test]
    fn test_long_stall_is_capped() {
        let mut state = playing(Layout::default(), SimConfig::default());
        let input = TickInput {
            intent: MoveIntent {
                down: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let start = state.player.pos;
        tick(&mut state, &input, 60_000);
        let moved = state.player.pos.y - start.y;
        assert!(moved <= state.player.speed * MAX_FRAME_STEP + 1e-3);
    }

    #[test]
    fn test_tick_pause() {
        let mut state = playing(Layout::default(), SimConfig::default());
        tick(&mut state, &pause(), 100);
        assert_eq!(state.phase, GamePhase::Paused);

        // Input is ignored while paused
        let input = TickInput {
            intent: MoveIntent {
                right: true,
                ..Default::default()
            },
            drop_device: true,
            ..Default::default()
        };
        let pos = state.player.pos;
        tick(&mut state, &input, 500);
        assert_eq!(state.player.pos, pos);
        assert_eq!(state.devices.active_count(), 0);

        tick(&mut state, &pause(), 600);
        assert_eq!(state.phase, GamePhase::Playing);
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::Audio(AudioCue::PauseLoops)));
        assert!(events.contains(&GameEvent::Audio(AudioCue::ResumeLoops)));
    }

    #[test]
    fn test_pause_holds_fuse_and_level_clock() {
        let mut state = playing(Layout::default(), SimConfig::default());
        let id = state.plant_device(GridPos::new(5, 5), 1, None).unwrap();

        tick(&mut state, &TickInput::default(), 1000);
        tick(&mut state, &pause(), 1000);
        tick(&mut state, &TickInput::default(), 30_000);
        assert_eq!(state.device(id).map(|d| d.state), Some(DeviceState::Armed));
        tick(&mut state, &pause(), 31_000);

        tick(&mut state, &TickInput::default(), 32_499);
        assert_eq!(state.device(id).map(|d| d.state), Some(DeviceState::Armed));
        tick(&mut state, &TickInput::default(), 32_500);
        assert_eq!(state.device(id).map(|d| d.state), Some(DeviceState::Detonating));

        assert_eq!(state.clock.elapsed(32_500), 2500);
    }

    #[test]
    fn test_pause_keeps_blast_alive() {
        let mut state = playing(Layout::default(), SimConfig::default());
        state.plant_device(GridPos::new(5, 5), 1, None).unwrap();
        tick(&mut state, &TickInput::default(), 2600);
        assert!(state.segments.active_count() > 0);

        tick(&mut state, &pause(), 2600);
        tick(&mut state, &pause(), 20_000);
        tick(&mut state, &TickInput::default(), 20_399);
        assert!(state.segments.active_count() > 0);
        tick(&mut state, &TickInput::default(), 20_400);
        assert_eq!(state.segments.active_count(), 0);
    }

    fn at_finish(state: &mut GameState) {
        state.player.pos = state.cell_origin(state.finish.cell) + Vec2::splat(4.0);
    }

    #[test]
    fn test_finish_scores_and_requests_next_level() {
        let mut state = playing(Layout::default(), SimConfig::default());
        at_finish(&mut state);
        tick(&mut state, &TickInput::default(), 30_000);
        assert_eq!(state.phase, GamePhase::LevelComplete);

        tick(&mut state, &TickInput::default(), 33_999);
        assert_eq!(state.phase, GamePhase::LevelComplete);
        tick(&mut state, &TickInput::default(), 34_000);
        assert_eq!(state.phase, GamePhase::AwaitingLevel);
        // (120 - 30) s * 5 lives * level 1
        assert_eq!(state.score, 450.0);
        assert!(
            state
                .drain_events()
                .contains(&GameEvent::LevelRequested { level: 2 })
        );

        let mut layouts = ClassicLayout::new(1);
        assert!(state.next_level(&mut layouts, 35_000).unwrap());
        assert_eq!(state.level, 2);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.enemies.len(), 4);
        assert_eq!(state.player.lives, 5);
        assert!(!state.next_level(&mut layouts, 35_000).unwrap());
    }

    #[test]
    fn test_last_level_ends_in_victory() {
        let config = SimConfig {
            max_level: 1,
            ..SimConfig::default()
        };
        let mut state = playing(Layout::default(), config);
        at_finish(&mut state);
        tick(&mut state, &TickInput::default(), 60_000);
        tick(&mut state, &TickInput::default(), 64_000);
        assert_eq!(state.phase, GamePhase::Victory);
        assert_eq!(state.score, 300.0);

        // Nothing moves once the game is over
        tick(&mut state, &TickInput::default(), 90_000);
        assert_eq!(state.phase, GamePhase::Victory);
    }

    #[test]
    fn test_determinism() {
        let mut layouts1 = ClassicLayout::new(99);
        let mut layouts2 = ClassicLayout::new(99);
        let mut state1 = GameState::new(SimConfig::default(), 99);
        let mut state2 = GameState::new(SimConfig::default(), 99);
        state1.next_level(&mut layouts1, 0).unwrap();
        state2.next_level(&mut layouts2, 0).unwrap();

        let inputs = [
            TickInput {
                intent: MoveIntent {
                    right: true,
                    ..Default::default()
                },
                ..Default::default()
            },
            TickInput {
                drop_device: true,
                ..Default::default()
            },
            TickInput {
                intent: MoveIntent {
                    down: true,
                    ..Default::default()
                },
                ..Default::default()
            },
            TickInput::default(),
        ];

        for (i, input) in inputs.iter().cycle().take(400).enumerate() {
            let now = i as u64 * 17;
            tick(&mut state1, input, now);
            tick(&mut state2, input, now);
        }

        assert_eq!(state1.player.pos, state2.player.pos);
        assert_eq!(state1.enemies.len(), state2.enemies.len());
        for (a, b) in state1.enemies.iter().zip(&state2.enemies) {
            assert_eq!(a.pos, b.pos);
        }
        assert_eq!(state1.drain_events(), state2.drain_events());
    }
}
