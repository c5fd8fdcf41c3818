//! Hand-calibrated layouts for specific instruments.
//!
//! These tables are measured from real hardware and are used verbatim. The
//! physical order follows the instrument, not the center-outward formula, and
//! the 34-key model adds a chromatic upper row. Labels are the numbered
//! notation printed on the tines; keys whose label is not a plain degree
//! (`#4`, `#1°`) are chromatic and cannot be addressed from tablature.

use serde::{Deserialize, Serialize};

use super::scale::{midi_note, pitch_class};
use super::{Key, Layout};
use crate::error::{KalimbaError, Result};

/// One row of a calibration table
#[derive(Debug, Clone, Copy)]
pub(crate) struct FixedKey {
    pub position: usize,
    pub note: &'static str,
    pub octave: i8,
    pub label: &'static str,
}

const fn fk(position: usize, note: &'static str, octave: i8, label: &'static str) -> FixedKey {
    FixedKey { position, note, octave, label }
}

/// 21 tines in C, C4 in the middle, D4 to its right
const CALIBRATED_21: &[FixedKey] = &[
    fk(0, "B", 6, "7°°"),
    fk(1, "G", 6, "5°°"),
    fk(2, "E", 6, "3°°"),
    fk(3, "C", 6, "1°°"),
    fk(4, "A", 5, "6°"),
    fk(5, "F", 5, "4°"),
    fk(6, "D", 5, "2°"),
    fk(7, "B", 4, "7"),
    fk(8, "G", 4, "5"),
    fk(9, "E", 4, "3"),
    fk(10, "C", 4, "1"),
    fk(11, "D", 4, "2"),
    fk(12, "F", 4, "4"),
    fk(13, "A", 4, "6"),
    fk(14, "C", 5, "1°"),
    fk(15, "E", 5, "3°"),
    fk(16, "G", 5, "5°"),
    fk(17, "B", 5, "7°"),
    fk(18, "D", 6, "2°°"),
    fk(19, "F", 6, "4°°"),
    fk(20, "A", 6, "6°°"),
];

/// Two-row chromatic model: the 21-tine diatonic row plus 13 sharps above it
const CHROMATIC_34: &[FixedKey] = &[
    fk(0, "B", 6, "7°°"),
    fk(1, "G", 6, "5°°"),
    fk(2, "E", 6, "3°°"),
    fk(3, "C", 6, "1°°"),
    fk(4, "A", 5, "6°"),
    fk(5, "F", 5, "4°"),
    fk(6, "D", 5, "2°"),
    fk(7, "B", 4, "7"),
    fk(8, "G", 4, "5"),
    fk(9, "E", 4, "3"),
    fk(10, "C", 4, "1"),
    fk(11, "D", 4, "2"),
    fk(12, "F", 4, "4"),
    fk(13, "A", 4, "6"),
    fk(14, "C", 5, "1°"),
    fk(15, "E", 5, "3°"),
    fk(16, "G", 5, "5°"),
    fk(17, "B", 5, "7°"),
    fk(18, "D", 6, "2°°"),
    fk(19, "F", 6, "4°°"),
    fk(20, "A", 6, "6°°"),
    fk(21, "D#", 6, "#2°°"),
    fk(22, "A#", 5, "#6°"),
    fk(23, "F#", 5, "#4°"),
    fk(24, "C#", 5, "#1°"),
    fk(25, "G#", 4, "#5"),
    fk(26, "D#", 4, "#2"),
    fk(27, "C#", 4, "#1"),
    fk(28, "F#", 4, "#4"),
    fk(29, "A#", 4, "#6"),
    fk(30, "D#", 5, "#2°"),
    fk(31, "G#", 5, "#5°"),
    fk(32, "C#", 6, "#1°°"),
    fk(33, "F#", 6, "#4°°"),
];

/// Well-known instruments that bypass the layout formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixedLayout {
    Calibrated21,
    Chromatic34,
}

impl FixedLayout {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "calibrated-21" | "21" => Some(FixedLayout::Calibrated21),
            "chromatic-34" | "34" => Some(FixedLayout::Chromatic34),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FixedLayout::Calibrated21 => "calibrated-21",
            FixedLayout::Chromatic34 => "chromatic-34",
        }
    }

    pub(crate) fn table(&self) -> &'static [FixedKey] {
        match self {
            FixedLayout::Calibrated21 => CALIBRATED_21,
            FixedLayout::Chromatic34 => CHROMATIC_34,
        }
    }

    pub fn build(&self) -> Result<Layout> {
        let keys = self
            .table()
            .iter()
            .map(key_from_row)
            .collect::<Result<Vec<_>>>()?;
        Layout::from_keys(self.name(), keys)
    }
}

fn key_from_row(row: &FixedKey) -> Result<Key> {
    let pc = pitch_class(row.note).ok_or_else(|| {
        KalimbaError::LayoutError(format!(
            "Bad note name '{}' at position {}",
            row.note, row.position
        ))
    })?;
    let midi = midi_note(pc, row.octave).ok_or_else(|| {
        KalimbaError::LayoutError(format!("{}{} is outside the MIDI range", row.note, row.octave))
    })?;
    let (scale_degree, octave_marker) = split_label(row.label);
    Ok(Key::new(row.position, midi, scale_degree, octave_marker, row.label.to_string()))
}

/// Split a printed label into (degree, marker count). Anything that is not
/// a bare 1-7 digit followed by markers is chromatic (degree 0).
fn split_label(label: &str) -> (u8, u8) {
    let markers = label.chars().filter(|c| *c == '°').count() as u8;
    let mut chars = label.chars();
    match chars.next() {
        Some(c @ '1'..='7') if chars.all(|rest| rest == '°') => (c as u8 - b'0', markers),
        _ => (0, markers),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_label() {
        assert_eq!(split_label("5"), (5, 0));
        assert_eq!(split_label("3°°"), (3, 2));
        assert_eq!(split_label("#4°"), (0, 1));
    }

    #[test]
    fn test_calibrated_21_is_verbatim() {
        let layout = FixedLayout::Calibrated21.build().unwrap();
        assert_eq!(layout.len(), 21);
        let center = layout.key(10).unwrap();
        assert_eq!(center.display_note, "C4");
        assert_eq!(center.display_degree, "1");
        // D4 sits right of center on this instrument
        assert_eq!(layout.key(11).unwrap().display_note, "D4");
        assert_eq!(layout.resolve(2, 0), Some(11));
    }

    #[test]
    fn test_chromatic_34_rows() {
        let layout = FixedLayout::Chromatic34.build().unwrap();
        assert_eq!(layout.len(), 34);
        let sharps: Vec<_> = layout.keys().iter().filter(|k| k.scale_degree == 0).collect();
        assert_eq!(sharps.len(), 13);
        assert!(sharps.iter().all(|k| k.display_note.contains('#')));
        // Chromatic keys never shadow the diatonic lookup
        assert_eq!(layout.resolve(4, 0), Some(12));
    }
}
