//! # Pitch Matching
//!
//! Maps a detected frequency onto the nearest tine.
//!
//! Deviation is measured in cents, `1200 * log2(f / key_f)`. The nearest key
//! wins; it is only reported if it is within the tolerance, so a caller never
//! gets a guess. The signed deviation is kept for tuner-style feedback
//! (positive = sharp).
//!
//! Everything here is pure and allocation-free; it runs on every game tick.

use serde::{Deserialize, Serialize};

use crate::layout::{Key, Layout};

/// Slack for floating-point error at the tolerance boundary
const BOUNDARY_EPSILON_CENTS: f64 = 1e-9;

/// One pitch estimate from the audio collaborator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectedPitch {
    pub frequency: f64,
    /// Confidence, 0-1
    pub clarity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

/// The tine a frequency matched
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyMatch {
    pub key_index: usize,
    /// Frequency of the matched key, Hz
    pub frequency: f64,
    /// Signed deviation of the input from the key, cents
    pub cents: f64,
}

/// Signed cents from `reference` to `frequency`
pub fn cents_between(frequency: f64, reference: f64) -> f64 {
    1200.0 * (frequency / reference).log2()
}

/// Find the key nearest to `frequency`, if it lies within `tolerance_cents`.
///
/// # Example
/// ```rust
/// use kalimba::layout::{generate_layout, ScaleKind};
/// use kalimba::pitch::find_closest_key;
///
/// let layout = generate_layout(17, "C", ScaleKind::Major, 4).unwrap();
/// let hit = find_closest_key(262.5, &layout, 50.0).unwrap();
/// assert_eq!(layout.key(hit.key_index).unwrap().display_note, "C4");
/// assert!(hit.cents > 0.0);
/// assert!(find_closest_key(277.18, &layout, 30.0).is_none()); // C#4
/// ```
pub fn find_closest_key(frequency: f64, layout: &Layout, tolerance_cents: f64) -> Option<KeyMatch> {
    if !(frequency.is_finite() && frequency > 0.0) {
        return None;
    }

    let (key, cents) = layout
        .keys()
        .iter()
        .filter(|k| k.frequency > 0.0)
        .map(|k: &Key| (k, cents_between(frequency, k.frequency)))
        .min_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))?;

    if cents.abs() <= tolerance_cents + BOUNDARY_EPSILON_CENTS {
        Some(KeyMatch {
            key_index: key.index,
            frequency: key.frequency,
            cents,
        })
    } else {
        None
    }
}

/// Tolerance and confidence gate applied to live pitch estimates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PitchMatcher {
    pub tolerance_cents: f64,
    /// Estimates below this clarity are ignored
    pub min_clarity: f64,
}

impl Default for PitchMatcher {
    fn default() -> Self {
        Self {
            tolerance_cents: 50.0,
            min_clarity: 0.8,
        }
    }
}

impl PitchMatcher {
    pub fn match_pitch(&self, pitch: &DetectedPitch, layout: &Layout) -> Option<KeyMatch> {
        if pitch.clarity < self.min_clarity {
            return None;
        }
        find_closest_key(pitch.frequency, layout, self.tolerance_cents)
    }
}
