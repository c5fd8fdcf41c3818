//! # Audio Engine
//!
//! Schedules reference tones (tine sounds) for a host synthesizer.
//!
//! The engine is an ordinary value: construct it, `init()` it, hand it to
//! whatever owns playback, `dispose()` it when done. Two engines never share
//! state. It does not produce samples itself; it emits [`ToneEvent`]s which
//! the host drains each frame and feeds to its synth.
//!
//! ```rust
//! use kalimba::audio::{AudioConfig, AudioEngine};
//! use kalimba::layout::{generate_layout, ScaleKind};
//!
//! let layout = generate_layout(17, "C", ScaleKind::Major, 4).unwrap();
//! let mut engine = AudioEngine::new(AudioConfig::default());
//! assert!(engine.play_key(layout.key(8).unwrap(), 0.0, 0.5).is_err());
//!
//! engine.init();
//! engine.play_key(layout.key(8).unwrap(), 0.0, 0.5).unwrap();
//! assert_eq!(engine.drain().len(), 1);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{KalimbaError, Result};
use crate::layout::{Key, Layout};
use crate::song::Song;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AudioConfig {
    /// Output gain, 0-1
    pub volume: f64,
    /// Extra ring time added after each note, seconds
    pub release: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            volume: 0.8,
            release: 1.2,
        }
    }
}

/// One tone for the host synth
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToneEvent {
    pub frequency: f64,
    /// Seconds, relative to whatever clock the host schedules against
    pub start: f64,
    pub duration: f64,
    pub velocity: f64,
}

#[derive(Debug)]
pub struct AudioEngine {
    config: AudioConfig,
    initialized: bool,
    pending: Vec<ToneEvent>,
}

impl AudioEngine {
    pub fn new(config: AudioConfig) -> Self {
        Self {
            config,
            initialized: false,
            pending: Vec::new(),
        }
    }

    pub fn init(&mut self) {
        if !self.initialized {
            log::debug!("Audio engine initialized (volume {:.2})", self.config.volume);
        }
        self.initialized = true;
    }

    /// Stop and drop anything not yet drained
    pub fn dispose(&mut self) {
        if self.initialized {
            log::debug!("Audio engine disposed, {} tones dropped", self.pending.len());
        }
        self.initialized = false;
        self.pending.clear();
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(KalimbaError::AudioNotInitialized)
        }
    }

    pub fn play_key(&mut self, key: &Key, start: f64, duration: f64) -> Result<()> {
        self.ensure_ready()?;
        self.pending.push(ToneEvent {
            frequency: key.frequency,
            start,
            duration: duration.max(0.0) + self.config.release,
            velocity: self.config.volume.clamp(0.0, 1.0),
        });
        Ok(())
    }

    /// Queue every note of a song, shifted by `offset` seconds. Notes on keys
    /// missing from the layout are skipped. Returns the number queued.
    pub fn schedule_song(&mut self, song: &Song, layout: &Layout, offset: f64) -> Result<usize> {
        self.ensure_ready()?;
        let mut queued = 0;
        for note in &song.notes {
            match layout.key(note.key_index) {
                Some(key) => {
                    self.play_key(key, note.time + offset, note.duration)?;
                    queued += 1;
                }
                None => log::warn!(
                    "Song note on key {} has no tine in layout '{}'",
                    note.key_index,
                    layout.name()
                ),
            }
        }
        Ok(queued)
    }

    /// Hand pending tones to the host
    pub fn drain(&mut self) -> Vec<ToneEvent> {
        std::mem::take(&mut self.pending)
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}
