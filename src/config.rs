//! # Game Configuration
//!
//! Tunables for a play session, read from YAML. Every field has a default, so
//! an empty file (or none at all) is valid.
//!
//! ```yaml
//! layout:
//!   tines: 17
//!   root: C
//!   scale: major
//! judgment:
//!   perfect-ms: 40
//!   good-ms: 90
//!   okay-ms: 140
//! session:
//!   lead-in: 2.0
//!   scoring:
//!     perfect: 300
//!     combo-steps:
//!       - { min-combo: 10, multiplier: 2 }
//! pitch:
//!   tolerance-cents: 40
//!   min-clarity: 0.85
//! audio:
//!   release: 1.5
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::audio::AudioConfig;
use crate::error::{KalimbaError, Result};
use crate::judgment::{Judge, JudgmentWindows, SessionConfig};
use crate::layout::LayoutSpec;
use crate::pitch::PitchMatcher;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GameConfig {
    pub layout: LayoutSpec,
    pub judgment: JudgmentWindows,
    pub session: SessionConfig,
    pub pitch: PitchMatcher,
    pub audio: AudioConfig,
}

impl GameConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: GameConfig =
            serde_yaml::from_str(yaml).map_err(|e| KalimbaError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&contents)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let w = &self.judgment;
        let ordered = 0.0 <= w.perfect_ms && w.perfect_ms <= w.good_ms && w.good_ms <= w.okay_ms;
        if !ordered {
            return Err(KalimbaError::ConfigError(format!(
                "judgment windows must nest (perfect {} <= good {} <= okay {})",
                w.perfect_ms, w.good_ms, w.okay_ms
            )));
        }
        if !(self.pitch.tolerance_cents >= 0.0) {
            return Err(KalimbaError::ConfigError(format!(
                "pitch tolerance must be non-negative, got {}",
                self.pitch.tolerance_cents
            )));
        }
        if !(self.session.lead_in >= 0.0) {
            return Err(KalimbaError::ConfigError(format!(
                "lead-in must be non-negative, got {}",
                self.session.lead_in
            )));
        }
        Ok(())
    }

    pub fn judge(&self) -> Judge {
        Judge::new(self.judgment, self.pitch)
    }
}
