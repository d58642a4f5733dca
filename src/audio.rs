//! Audio collaborator boundary
//!
//! The core never plays sound. It emits fire-and-forget cues; a host-side
//! `AudioSink` owns playback state (volume, looping) and must not block.

use serde::{Deserialize, Serialize};

/// One-shot sound effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundEffect {
    /// Device placed
    PlaceDevice,
    /// Device detonated
    Explosion,
    /// Destructible wall hit by a blast
    WallBreak,
    /// Player killed by a blast
    PlayerBlastDeath,
    /// Player caught by an enemy (two variants, alternated)
    PlayerDeath,
    PlayerDeathAlt,
    EnemyDeath,
    /// Capacity pickup collected
    CapacityUp,
    /// Power pickup collected
    PowerUp,
    /// Player reached the active finish tile
    FinishLevel,
    GameLost,
    Victory,
}

/// Looping sounds; the host pauses them with the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioLoop {
    /// At least one armed device
    Ticking,
    /// Player moving
    Walking,
    /// Level music
    Music,
}

/// Audio signal emitted by the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioCue {
    Play(SoundEffect),
    StartLoop(AudioLoop),
    StopLoop(AudioLoop),
    /// Game paused: pause every loop without rewinding
    PauseLoops,
    /// Game resumed: resume loops that were running
    ResumeLoops,
}

/// Host-side audio player
pub trait AudioSink {
    fn play(&mut self, effect: SoundEffect);
    fn start_loop(&mut self, sound: AudioLoop);
    fn stop_loop(&mut self, sound: AudioLoop);
    fn pause_loops(&mut self);
    fn resume_loops(&mut self);

    /// Route a cue to the matching method
    fn handle(&mut self, cue: AudioCue) {
        match cue {
            AudioCue::Play(effect) => self.play(effect),
            AudioCue::StartLoop(sound) => self.start_loop(sound),
            AudioCue::StopLoop(sound) => self.stop_loop(sound),
            AudioCue::PauseLoops => self.pause_loops(),
            AudioCue::ResumeLoops => self.resume_loops(),
        }
    }
}

/// Sink that logs cues and tracks which loops would be audible
#[derive(Debug, Default)]
pub struct LogAudio {
    looping: Vec<AudioLoop>,
    paused: bool,
    muted: bool,
}

impl LogAudio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mute/unmute all audio
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Loops currently playing
    pub fn audible_loops(&self) -> &[AudioLoop] {
        if self.paused || self.muted {
            &[]
        } else {
            &self.looping
        }
    }
}

impl AudioSink for LogAudio {
    fn play(&mut self, effect: SoundEffect) {
        if !self.muted {
            log::debug!("sfx: {:?}", effect);
        }
    }

    fn start_loop(&mut self, sound: AudioLoop) {
        if !self.looping.contains(&sound) {
            self.looping.push(sound);
            log::debug!("loop start: {:?}", sound);
        }
    }

    fn stop_loop(&mut self, sound: AudioLoop) {
        self.looping.retain(|s| *s != sound);
        log::debug!("loop stop: {:?}", sound);
    }

    fn pause_loops(&mut self) {
        self.paused = true;
    }

    fn resume_loops(&mut self) {
        self.paused = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loops_follow_cues() {
        let mut audio = LogAudio::new();
        audio.handle(AudioCue::StartLoop(AudioLoop::Ticking));
        audio.handle(AudioCue::StartLoop(AudioLoop::Ticking));
        audio.handle(AudioCue::StartLoop(AudioLoop::Music));
        assert_eq!(audio.audible_loops(), &[AudioLoop::Ticking, AudioLoop::Music]);

        audio.handle(AudioCue::PauseLoops);
        assert!(audio.audible_loops().is_empty());
        audio.handle(AudioCue::ResumeLoops);
        audio.handle(AudioCue::StopLoop(AudioLoop::Ticking));
        assert_eq!(audio.audible_loops(), &[AudioLoop::Music]);

        audio.set_muted(true);
        audio.handle(AudioCue::Play(SoundEffect::Explosion));
        assert!(audio.audible_loops().is_empty());
    }
}
