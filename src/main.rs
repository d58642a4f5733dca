//! Blast Grid headless runner
//!
//! Plays a scripted session against the classic level generator and prints
//! a JSON summary. Usage: `blast-grid [config.json] [seed]`.

#[cfg(not(target_arch = "wasm32"))]
mod session {
    use std::collections::BTreeMap;

    use serde::Serialize;

    use blast_grid::audio::{AudioSink, LogAudio};
    use blast_grid::layout::ClassicLayout;
    use blast_grid::sim::{GameEvent, GamePhase, GameState, Hud, MoveIntent, TickInput, tick};
    use blast_grid::{SimConfig, SimError};

    /// Host frame period in milliseconds
    const FRAME_MS: u64 = 16;
    /// Session length cap (10 minutes of game time)
    const MAX_FRAMES: u64 = 10 * 60 * 1000 / FRAME_MS;

    /// Session holding the game and its collaborators
    pub struct Session {
        state: GameState,
        layouts: ClassicLayout,
        audio: LogAudio,
        now: u64,
        frame: u64,
        last_phase: GamePhase,
        event_counts: BTreeMap<String, u32>,
    }

    #[derive(Serialize)]
    pub struct Summary {
        pub seed: u64,
        pub frames: u64,
        pub elapsed_ms: u64,
        pub hud: Hud,
        pub sprites_on_screen: usize,
        pub events: BTreeMap<String, u32>,
    }

    impl Session {
        pub fn new(config: SimConfig, seed: u64) -> Result<Self, SimError> {
            let mut state = GameState::new(config, seed);
            let mut layouts = ClassicLayout::new(seed);
            state.next_level(&mut layouts, 0)?;
            Ok(Self {
                last_phase: state.phase,
                state,
                layouts,
                audio: LogAudio::new(),
                now: 0,
                frame: 0,
                event_counts: BTreeMap::new(),
            })
        }

        /// Scripted input: wander in a square, drop a device every few
        /// seconds and pause once for a while
        fn script(&self) -> TickInput {
            let second = self.frame * FRAME_MS / 1000;
            let leg = (second / 2) % 4;
            let intent = MoveIntent {
                right: leg == 0,
                down: leg == 1,
                left: leg == 2,
                up: leg == 3,
            };
            TickInput {
                intent,
                drop_device: self.frame % 180 == 90,
                pause: self.frame == 600 || self.frame == 780,
            }
        }

        /// Advance one host frame
        fn update(&mut self) -> Result<(), SimError> {
            let input = self.script();
            tick(&mut self.state, &input, self.now);

            if self.state.phase == GamePhase::AwaitingLevel {
                self.state.next_level(&mut self.layouts, self.now)?;
            }

            for event in self.state.drain_events() {
                if let GameEvent::Audio(cue) = event {
                    self.audio.handle(cue);
                }
                *self.event_counts.entry(event_name(&event)).or_default() += 1;
            }

            if self.state.phase != self.last_phase {
                log::info!("Phase {:?} -> {:?}", self.last_phase, self.state.phase);
                self.last_phase = self.state.phase;
            }

            self.frame += 1;
            self.now += FRAME_MS;
            Ok(())
        }

        fn finished(&self) -> bool {
            matches!(self.state.phase, GamePhase::GameOver | GamePhase::Victory)
        }

        pub fn run(mut self) -> Result<Summary, SimError> {
            while !self.finished() && self.frame < MAX_FRAMES {
                self.update()?;
            }
            Ok(Summary {
                seed: self.state.seed,
                frames: self.frame,
                elapsed_ms: self.now,
                hud: self.state.hud(self.now),
                sprites_on_screen: self.state.sprites().len(),
                events: self.event_counts,
            })
        }
    }

    fn event_name(event: &GameEvent) -> String {
        let debug = format!("{:?}", event);
        debug
            .split(|c: char| !c.is_alphanumeric())
            .next()
            .unwrap_or_default()
            .to_string()
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use blast_grid::SimConfig;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Blast Grid (headless) starting...");

    let args: Vec<String> = std::env::args().collect();
    let config = match args.get(1) {
        Some(path) => match SimConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("{e}");
                std::process::exit(1);
            }
        },
        None => SimConfig::default(),
    };
    let seed = args
        .get(2)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0x5eed);

    let summary = session::Session::new(config, seed).and_then(|session| session.run());
    match summary {
        Ok(summary) => match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{json}"),
            Err(e) => log::error!("Failed to serialize summary: {e}"),
        },
        Err(e) => {
            log::error!("Session failed: {e}");
            std::process::exit(1);
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The simulation library is the wasm surface; there is no wasm binary
}
