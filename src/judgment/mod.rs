//! # Judgment Module
//!
//! Timing judgment and scoring for a play session.
//!
//! ## Pieces
//! - [`HitAccuracy`] / [`JudgmentWindows`] - tier classification of a signed
//!   timing delta (input time minus scheduled time)
//! - [`ScoreState`] / [`ScoringConfig`] - score, combo and weighted accuracy
//! - [`GameSession`] - the session state machine; owns the score and the set
//!   of note ids already judged
//! - [`PitchSlot`] - last-write-wins mailbox the pitch detector writes into
//! - [`Judge`] - per-tick glue: latest pitch → key → nearest open note →
//!   tier → `GameSession::register_judgment`
//!
//! ## Session Lifecycle
//! ```text
//! Idle ──start──▶ Countdown ──clock ≥ 0──▶ Playing ──clock ≥ end──▶ Finished
//!                     │  ▲                   │  ▲
//!                   pause resume           pause resume
//!                     ▼  │                   ▼  │
//!                     Paused                 Paused
//! ```
//! The clock starts at `-lead_in` so the first note's judgment window is
//! reachable. Judgment is accepted in Countdown and Playing only. `end` is
//! the song duration plus the okay window when started through
//! [`Judge::start`], so the last note can still be hit; finishing then
//! records every note nobody judged as a miss.
//!
//! ## Scoring
//! Non-miss: combo + 1. Miss: combo = 0. Each judgment earns
//! `base_value(tier) * multiplier(new combo)`. Each note id is judged once.

mod judge;
mod score;
mod session;

pub use judge::Judge;
pub use score::{ComboStep, ScoreState, ScoringConfig};
pub use session::{GameSession, PitchSlot, SessionConfig, SessionState};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Accuracy tier of one judged note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HitAccuracy {
    Perfect,
    Good,
    Okay,
    Miss,
}

impl fmt::Display for HitAccuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HitAccuracy::Perfect => "perfect",
            HitAccuracy::Good => "good",
            HitAccuracy::Okay => "okay",
            HitAccuracy::Miss => "miss",
        };
        f.write_str(name)
    }
}

/// Result of judging one note
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteHit {
    pub note_id: String,
    pub accuracy: HitAccuracy,
    /// Input time minus scheduled time, ms. None when no input arrived.
    pub time_delta_ms: Option<f64>,
}

/// Nested tolerance windows, in milliseconds either side of the note
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct JudgmentWindows {
    pub perfect_ms: f64,
    pub good_ms: f64,
    pub okay_ms: f64,
}

impl Default for JudgmentWindows {
    fn default() -> Self {
        Self {
            perfect_ms: 50.0,
            good_ms: 100.0,
            okay_ms: 150.0,
        }
    }
}

impl JudgmentWindows {
    /// Tier for a signed delta; anything outside the okay window is a miss
    pub fn classify(&self, delta_ms: f64) -> HitAccuracy {
        let magnitude = delta_ms.abs();
        if magnitude <= self.perfect_ms {
            HitAccuracy::Perfect
        } else if magnitude <= self.good_ms {
            HitAccuracy::Good
        } else if magnitude <= self.okay_ms {
            HitAccuracy::Okay
        } else {
            // NaN lands here too
            HitAccuracy::Miss
        }
    }

    /// Outermost window in seconds
    pub fn reach(&self) -> f64 {
        self.okay_ms / 1000.0
    }
}
