//! Scales, note names and equal-temperament pitch math.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::KalimbaError;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Reference pitch for A4 (MIDI 69)
pub const A4_FREQUENCY: f64 = 440.0;

/// Scale used to generate a layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScaleKind {
    #[default]
    Major,
    Minor,
    MajorPentatonic,
    MinorPentatonic,
}

impl ScaleKind {
    /// Semitone offsets from the root, one per scale step
    pub fn intervals(&self) -> &'static [u8] {
        match self {
            ScaleKind::Major => &[0, 2, 4, 5, 7, 9, 11],
            ScaleKind::Minor => &[0, 2, 3, 5, 7, 8, 10],
            ScaleKind::MajorPentatonic => &[0, 2, 4, 7, 9],
            ScaleKind::MinorPentatonic => &[0, 3, 5, 7, 10],
        }
    }

    /// Numbered-notation degree (1-7) written for each scale step.
    ///
    /// Pentatonic scales keep the degree numbers of their parent diatonic
    /// scale, so major pentatonic reads `1 2 3 5 6`.
    pub fn degrees(&self) -> &'static [u8] {
        match self {
            ScaleKind::Major | ScaleKind::Minor => &[1, 2, 3, 4, 5, 6, 7],
            ScaleKind::MajorPentatonic => &[1, 2, 3, 5, 6],
            ScaleKind::MinorPentatonic => &[1, 3, 4, 5, 7],
        }
    }

    pub fn len(&self) -> usize {
        self.intervals().len()
    }
}

impl FromStr for ScaleKind {
    type Err = KalimbaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "major" | "ionian" => Ok(ScaleKind::Major),
            "minor" | "natural-minor" | "aeolian" => Ok(ScaleKind::Minor),
            "major-pentatonic" | "pentatonic" => Ok(ScaleKind::MajorPentatonic),
            "minor-pentatonic" => Ok(ScaleKind::MinorPentatonic),
            other => Err(KalimbaError::LayoutError(format!("Unknown scale: {}", other))),
        }
    }
}

impl fmt::Display for ScaleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScaleKind::Major => "major",
            ScaleKind::Minor => "minor",
            ScaleKind::MajorPentatonic => "major-pentatonic",
            ScaleKind::MinorPentatonic => "minor-pentatonic",
        };
        f.write_str(name)
    }
}

/// Parse a note name like "C", "F#", "Bb", "Cs" or "Ef" into a pitch class (0 = C).
pub fn pitch_class(name: &str) -> Option<u8> {
    let trimmed = name.trim();
    let mut chars = trimmed.chars();
    let base: i8 = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let accidental: i8 = match chars.as_str() {
        "" => 0,
        "#" | "s" => 1,
        "b" | "f" => -1,
        _ => return None,
    };
    Some((base + accidental).rem_euclid(12) as u8)
}

/// MIDI note number for a pitch class in a scientific-pitch octave (C4 = 60)
pub fn midi_note(pitch_class: u8, octave: i8) -> Option<u8> {
    let midi = 12 * (octave as i16 + 1) + pitch_class as i16;
    u8::try_from(midi).ok().filter(|m| *m <= 127)
}

/// Equal-temperament frequency relative to A4 = 440 Hz
pub fn midi_to_frequency(midi: u8) -> f64 {
    A4_FREQUENCY * 2f64.powf((midi as f64 - 69.0) / 12.0)
}

/// Scientific pitch name with sharps, e.g. 61 -> "C#4"
pub fn midi_to_name(midi: u8) -> String {
    let octave = midi as i16 / 12 - 1;
    format!("{}{}", pitch_class_name(midi), octave)
}

/// Pitch class name with sharps, e.g. 61 -> "C#"
fn pitch_class_name(midi: u8) -> &'static str {
    NOTE_NAMES[(midi % 12) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_class_spellings() {
        assert_eq!(pitch_class("C"), Some(0));
        assert_eq!(pitch_class("C#"), Some(1));
        assert_eq!(pitch_class("Db"), Some(1));
        assert_eq!(pitch_class("Ef"), Some(3));
        assert_eq!(pitch_class("Cb"), Some(11));
        assert_eq!(pitch_class("H"), None);
        assert_eq!(pitch_class("C##"), None);
    }

    #[test]
    fn test_midi_and_frequency() {
        assert_eq!(midi_note(0, 4), Some(60));
        assert_eq!(midi_note(9, 4), Some(69));
        assert_eq!(midi_note(0, 10), None);
        assert!((midi_to_frequency(69) - 440.0).abs() < 1e-9);
        assert!((midi_to_frequency(60) - 261.6256).abs() < 1e-3);
        assert_eq!(midi_to_name(61), "C#4");
    }

    #[test]
    fn test_scale_from_str() {
        assert_eq!("Major".parse::<ScaleKind>().unwrap(), ScaleKind::Major);
        assert_eq!("pentatonic".parse::<ScaleKind>().unwrap(), ScaleKind::MajorPentatonic);
        assert!("lydian-dominant".parse::<ScaleKind>().is_err());
    }
}
