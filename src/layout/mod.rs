//! # Layout Module
//!
//! Builds the ordered set of playable keys (tines) for an instrument.
//!
//! ## Two Sources
//!
//! ### Generated layouts
//! [`generate_layout()`] derives every key from a root note, a tine count and a
//! scale. Pitches ascend in scale-step order (step 0 = root) and are then
//! placed physically center-outward: the root sits in the middle, each next
//! step goes to the immediate left, then the immediate right of the growing
//! block. The result is the familiar "V" of a kalimba where the hands move
//! outward as the scale climbs.
//!
//! ```text
//! 17 tines, C major:  2°° 7° 5° 3° 1° 6 4 2 [1] 3 5 7 2° 4° 6° 1°° 3°°
//! ```
//!
//! ### Fixed layouts
//! [`FixedLayout`] tables are measured from real instruments and used
//! verbatim; see `fixed.rs`.
//!
//! ## Label Lookup
//! Every key with a scale degree gets a label (`5`, `3°`, `1°°`). The reverse
//! table `(degree, markers) -> index` used by the notation compiler is built
//! from the keys themselves when a [`Layout`] is constructed.

mod fixed;
mod scale;

pub use fixed::FixedLayout;
pub use scale::{midi_to_frequency, midi_to_name, pitch_class, ScaleKind, A4_FREQUENCY};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{KalimbaError, Result};
use scale::midi_note;

/// Canonical octave-marker glyph used in every label the crate produces
pub const MARKER: char = '°';

/// One physical tine
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Key {
    pub index: usize,
    pub frequency: f64,
    pub midi: u8,
    pub scale_degree: u8,
    pub octave_marker: u8,
    pub display_degree: String,
    pub display_note: String,
}

impl Key {
    pub(crate) fn new(
        index: usize,
        midi: u8,
        scale_degree: u8,
        octave_marker: u8,
        display_degree: String,
    ) -> Self {
        Self {
            index,
            frequency: midi_to_frequency(midi),
            midi,
            scale_degree,
            octave_marker,
            display_degree,
            display_note: midi_to_name(midi),
        }
    }

    /// True when the tine can be written in tablature
    pub fn is_diatonic(&self) -> bool {
        (1..=7).contains(&self.scale_degree)
    }
}

/// Build a degree label like `5°°`
pub fn degree_label(degree: u8, markers: u8) -> String {
    let mut label = degree.to_string();
    for _ in 0..markers {
        label.push(MARKER);
    }
    label
}

/// A complete, validated instrument layout
#[derive(Debug, Clone)]
pub struct Layout {
    name: String,
    keys: Vec<Key>,
    by_label: HashMap<(u8, u8), usize>,
}

impl Layout {
    /// Build a layout from keys in any order.
    ///
    /// Keys are sorted by physical index, which must then run 0..N-1 with no
    /// gaps. An empty key set is a configuration error.
    pub fn from_keys(name: impl Into<String>, mut keys: Vec<Key>) -> Result<Self> {
        let name = name.into();
        if keys.is_empty() {
            return Err(KalimbaError::LayoutError(format!("Layout '{}' has no keys", name)));
        }
        keys.sort_by_key(|k| k.index);
        for (expected, key) in keys.iter().enumerate() {
            if key.index != expected {
                return Err(KalimbaError::LayoutError(format!(
                    "Layout '{}' has non-contiguous key index {} (expected {})",
                    name, key.index, expected
                )));
            }
        }

        let mut by_label = HashMap::new();
        for key in keys.iter().filter(|k| k.is_diatonic()) {
            let slot = (key.scale_degree, key.octave_marker);
            if let Some(existing) = by_label.get(&slot) {
                log::debug!(
                    "Layout '{}': label {} on key {} shadowed by key {}",
                    name,
                    key.display_degree,
                    key.index,
                    existing
                );
                continue;
            }
            by_label.insert(slot, key.index);
        }

        Ok(Self { name, keys, by_label })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn key(&self, index: usize) -> Option<&Key> {
        self.keys.get(index)
    }

    /// Key index for a scale degree and octave-marker count
    pub fn resolve(&self, degree: u8, markers: u8) -> Option<usize> {
        self.by_label.get(&(degree, markers)).copied()
    }

    /// Tablature label for a key, if the key can be written
    pub fn label(&self, index: usize) -> Option<&str> {
        self.key(index)
            .filter(|k| k.is_diatonic())
            .map(|k| k.display_degree.as_str())
    }

    /// Keys sorted from lowest to highest pitch
    pub fn keys_by_pitch(&self) -> Vec<&Key> {
        let mut sorted: Vec<&Key> = self.keys.iter().collect();
        sorted.sort_by(|a, b| a.frequency.total_cmp(&b.frequency).then(a.index.cmp(&b.index)));
        sorted
    }
}

/// Physical position of scale step `step` in a center-outward layout of `count` tines
fn center_outward_position(step: usize, count: usize) -> usize {
    let center = count / 2;
    if step == 0 {
        center
    } else if step % 2 == 1 {
        center - (step + 1) / 2
    } else {
        center + step / 2
    }
}

/// Generate a layout from tuning parameters.
///
/// An unrecognized `root_note` is logged and treated as C. Zero tines, or a
/// range that runs past MIDI 127, is an error.
///
/// # Example
/// ```rust
/// use kalimba::layout::{generate_layout, ScaleKind};
///
/// let layout = generate_layout(17, "C", ScaleKind::Major, 4).unwrap();
/// assert_eq!(layout.len(), 17);
/// assert_eq!(layout.key(8).unwrap().display_note, "C4");
/// assert_eq!(layout.key(7).unwrap().display_degree, "2");
/// ```
pub fn generate_layout(
    tine_count: usize,
    root_note: &str,
    scale: ScaleKind,
    root_octave: i8,
) -> Result<Layout> {
    if tine_count == 0 {
        return Err(KalimbaError::LayoutError("Tine count must be at least 1".to_string()));
    }

    let root_pc = pitch_class(root_note).unwrap_or_else(|| {
        log::warn!("Unknown root note '{}', falling back to C", root_note);
        0
    });
    let root_midi = midi_note(root_pc, root_octave).ok_or_else(|| {
        KalimbaError::LayoutError(format!(
            "Root {}{} is outside the MIDI range",
            root_note, root_octave
        ))
    })?;

    let intervals = scale.intervals();
    let degrees = scale.degrees();
    let len = scale.len();

    let mut keys = Vec::with_capacity(tine_count);
    for step in 0..tine_count {
        let octave = step / len;
        let semitones = intervals[step % len] as usize + 12 * octave;
        let midi = u8::try_from(root_midi as usize + semitones)
            .ok()
            .filter(|m| *m <= 127)
            .ok_or_else(|| {
                KalimbaError::LayoutError(format!(
                    "{} tines from {}{} run past the MIDI range",
                    tine_count, root_note, root_octave
                ))
            })?;
        let degree = degrees[step % len];
        let markers = octave as u8;
        keys.push(Key::new(
            center_outward_position(step, tine_count),
            midi,
            degree,
            markers,
            degree_label(degree, markers),
        ));
    }

    let name = format!("{}-{}{}-{}", tine_count, root_note.trim(), root_octave, scale);
    Layout::from_keys(name, keys)
}

/// Serializable description of a layout, as found in config files and
/// notation frontmatter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayoutSpec {
    Fixed {
        fixed: FixedLayout,
    },
    Generated {
        #[serde(default = "default_tines")]
        tines: usize,
        #[serde(default = "default_root")]
        root: String,
        #[serde(default)]
        scale: ScaleKind,
        #[serde(default = "default_octave")]
        octave: i8,
    },
}

fn default_tines() -> usize {
    17
}

fn default_root() -> String {
    "C".to_string()
}

fn default_octave() -> i8 {
    4
}

impl Default for LayoutSpec {
    fn default() -> Self {
        LayoutSpec::Generated {
            tines: default_tines(),
            root: default_root(),
            scale: ScaleKind::default(),
            octave: default_octave(),
        }
    }
}

impl LayoutSpec {
    pub fn build(&self) -> Result<Layout> {
        match self {
            LayoutSpec::Fixed { fixed } => fixed.build(),
            LayoutSpec::Generated { tines, root, scale, octave } => {
                generate_layout(*tines, root, *scale, *octave)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn labels(layout: &Layout) -> Vec<&str> {
        layout.keys().iter().map(|k| k.display_degree.as_str()).collect()
    }

    #[test]
    fn test_seventeen_key_c_major_shape() {
        let layout = generate_layout(17, "C", ScaleKind::Major, 4).unwrap();
        assert_eq!(
            labels(&layout),
            vec![
                "2°°", "7°", "5°", "3°", "1°", "6", "4", "2", "1", "3", "5", "7", "2°", "4°", "6°",
                "1°°", "3°°"
            ]
        );
        assert_eq!(layout.key(0).unwrap().display_note, "D6");
        assert_eq!(layout.key(16).unwrap().display_note, "E6");
    }

    #[test]
    fn test_indices_contiguous_for_any_count() {
        for count in 1..=40 {
            let layout = generate_layout(count, "G", ScaleKind::Minor, 3).unwrap();
            let indices: Vec<usize> = layout.keys().iter().map(|k| k.index).collect();
            assert_eq!(indices, (0..count).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_step_order_is_monotonic_and_root_centered() {
        let layout = generate_layout(12, "A", ScaleKind::MajorPentatonic, 3).unwrap();
        let by_pitch = layout.keys_by_pitch();
        assert_eq!(by_pitch[0].index, 6);
        assert_eq!(by_pitch[0].display_note, "A3");
        for pair in by_pitch.windows(2) {
            assert!(pair[0].frequency <= pair[1].frequency);
        }
        assert_eq!(labels(&layout)[6], "1");
        assert_eq!(by_pitch[5].display_degree, "1°");
    }

    #[test]
    fn test_pentatonic_degrees() {
        let layout = generate_layout(5, "C", ScaleKind::MajorPentatonic, 4).unwrap();
        assert!(layout.resolve(4, 0).is_none());
        assert!(layout.resolve(5, 0).is_some());
    }

    #[test]
    fn test_unknown_root_falls_back_to_c() {
        let layout = generate_layout(7, "X#", ScaleKind::Major, 4).unwrap();
        assert_eq!(layout.keys_by_pitch()[0].display_note, "C4");
    }

    #[test]
    fn test_zero_tines_is_an_error() {
        assert!(matches!(
            generate_layout(0, "C", ScaleKind::Major, 4),
            Err(KalimbaError::LayoutError(_))
        ));
        assert!(Layout::from_keys("empty", vec![]).is_err());
    }

    #[test]
    fn test_out_of_midi_range_is_an_error() {
        assert!(generate_layout(40, "C", ScaleKind::Major, 8).is_err());
    }

    #[test]
    fn test_from_keys_rejects_gaps() {
        let keys = vec![
            Key::new(0, 60, 1, 0, "1".to_string()),
            Key::new(2, 62, 2, 0, "2".to_string()),
        ];
        assert!(Layout::from_keys("gappy", keys).is_err());
    }

    #[test]
    fn test_layout_spec_yaml() {
        let spec: LayoutSpec = serde_yaml::from_str("fixed: calibrated-21").unwrap();
        assert_eq!(spec, LayoutSpec::Fixed { fixed: FixedLayout::Calibrated21 });

        let spec: LayoutSpec = serde_yaml::from_str("tines: 10\nroot: D\nscale: minor").unwrap();
        let layout = spec.build().unwrap();
        assert_eq!(layout.len(), 10);
        assert_eq!(layout.keys_by_pitch()[0].display_note, "D4");
    }
}
