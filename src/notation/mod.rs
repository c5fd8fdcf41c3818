//! # Notation Module
//!
//! Compiles kalimba tablature into timed note events, and back.
//!
//! ## Grammar
//! ```text
//! 1 2 3        single notes, one grid step each
//! 1° 3** 5''   octave markers; ° * ' are synonyms, doubled = two octaves
//! (1 3 5)      chord: all members at the same time, one grid step total
//! 467          compact run: 4, 6, 7 on three successive grid steps
//! - _ r R      rest: one grid step of silence
//! ```
//! Newlines are cosmetic (the serializer starts one per measure).
//!
//! ## Timing
//! The grid step is the time signature's note value at the given tempo:
//! `60 / bpm * 4 / denominator`. In 4/4 at 90 bpm that is a quarter note,
//! 0.667 s. Every note lasts exactly one grid step.
//!
//! ## Tolerance
//! Tokens that cannot be compiled never fail the parse. They are logged and
//! returned as [`ParseWarning`]s from [`parse_with_report()`]. A note-shaped
//! token whose label is missing from the layout still takes its grid step; a
//! token that is not notation at all takes none.
//!
//! ## Related Modules
//! - `layout` - label → key index lookup
//! - `song` - `NoteEvent`, `TimeSignature`

pub mod frontmatter;
pub mod lexer;
mod parser;
mod serializer;

pub use parser::parse_with_report;
pub use serializer::serialize;

use serde::Serialize;
use std::fmt;

use crate::error::{KalimbaError, Result};
use crate::layout::Layout;
use crate::song::{NoteEvent, TimeSignature};

/// Tempo and meter used to place tokens on the grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParseOptions {
    pub bpm: f64,
    pub time_signature: TimeSignature,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            time_signature: TimeSignature::default(),
        }
    }
}

impl ParseOptions {
    pub fn new(bpm: f64, time_signature: TimeSignature) -> Self {
        Self { bpm, time_signature }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.bpm.is_finite() && self.bpm > 0.0) {
            return Err(KalimbaError::MetadataError(format!(
                "bpm must be a positive number, got {}",
                self.bpm
            )));
        }
        self.time_signature.validate()
    }

    pub fn grid_step(&self) -> f64 {
        grid_step(self.bpm, self.time_signature)
    }
}

/// Seconds per grid step
pub fn grid_step(bpm: f64, time_signature: TimeSignature) -> f64 {
    60.0 / bpm * 4.0 / time_signature.beat_type as f64
}

/// Nearest grid index for a time; negative times clamp to 0
pub(crate) fn quantize_index(time: f64, step: f64) -> u64 {
    (time / step).round().max(0.0) as u64
}

/// Snap a time to the nearest grid step. Quantizing twice changes nothing.
pub fn quantize(time: f64, step: f64) -> f64 {
    (time / step).round() * step
}

/// A token the compiler skipped
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseWarning {
    pub line: usize,
    pub column: usize,
    pub token: String,
    pub message: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}, column {}: '{}' {}",
            self.line, self.column, self.token, self.message
        )
    }
}

/// Notes plus everything that was dropped on the way
#[derive(Debug, Clone, Default)]
pub struct ParseReport {
    pub notes: Vec<NoteEvent>,
    pub warnings: Vec<ParseWarning>,
    /// Grid steps covered, including trailing rests
    pub steps: u64,
}

/// Compile tablature into timed note events.
///
/// # Example
/// ```rust
/// use kalimba::layout::{generate_layout, ScaleKind};
/// use kalimba::notation::{parse, ParseOptions};
///
/// let layout = generate_layout(17, "C", ScaleKind::Major, 4).unwrap();
/// let notes = parse("(1 3 5) 1°", &layout, &ParseOptions::default()).unwrap();
/// assert_eq!(notes.len(), 4);
/// assert_eq!(notes[3].time, 0.5);
/// ```
pub fn parse(source: &str, layout: &Layout, options: &ParseOptions) -> Result<Vec<NoteEvent>> {
    Ok(parse_with_report(source, layout, options)?.notes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{generate_layout, FixedLayout, ScaleKind};
    use pretty_assertions::assert_eq;

    fn c_major() -> Layout {
        generate_layout(17, "C", ScaleKind::Major, 4).unwrap()
    }

    fn at(bpm: f64) -> ParseOptions {
        ParseOptions::new(bpm, TimeSignature::default())
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// (key_index, time, duration) with times rounded to microseconds, sorted
    fn multiset(notes: &[NoteEvent]) -> Vec<(usize, i64, i64)> {
        let mut out: Vec<_> = notes
            .iter()
            .map(|n| {
                (
                    n.key_index,
                    (n.time * 1e6).round() as i64,
                    (n.duration * 1e6).round() as i64,
                )
            })
            .collect();
        out.sort();
        out
    }

    #[test]
    fn test_chord_members_share_time() {
        let layout = c_major();
        let notes = parse("(1 3 5) 2", &layout, &at(60.0)).unwrap();
        assert_eq!(notes.len(), 4);
        assert!(notes[..3].iter().all(|n| n.time == 0.0));
        // bpm 60, 4/4: one grid step = 1 s
        assert!(close(notes[3].time, 1.0));
    }

    #[test]
    fn test_compact_run_is_not_a_chord() {
        let layout = c_major();
        let notes = parse("467", &layout, &at(60.0)).unwrap();
        let times: Vec<f64> = notes.iter().map(|n| n.time).collect();
        assert_eq!(times, vec![0.0, 1.0, 2.0]);
        let keys: Vec<usize> = notes.iter().map(|n| n.key_index).collect();
        let expected: Vec<usize> =
            [4, 6, 7].iter().map(|d| layout.resolve(*d, 0).unwrap()).collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_rest_advances_without_notes() {
        let layout = c_major();
        let notes = parse("1 - 2", &layout, &at(60.0)).unwrap();
        assert_eq!(notes.len(), 2);
        let step = grid_step(60.0, TimeSignature::default());
        assert!(close(notes[1].time - notes[0].time, 2.0 * step));
    }

    #[test]
    fn test_twinkle_at_ninety() {
        let layout = c_major();
        let notes = parse("1 1 5 5", &layout, &at(90.0)).unwrap();
        let expected = [0.0, 2.0 / 3.0, 4.0 / 3.0, 2.0];
        assert_eq!(notes.len(), 4);
        for (note, time) in notes.iter().zip(expected) {
            assert!(close(note.time, time), "{} != {}", note.time, time);
            assert!(close(note.duration, 2.0 / 3.0));
            let key = layout.key(note.key_index).unwrap();
            assert_eq!(key.octave_marker, 0);
            assert!(key.scale_degree == 1 || key.scale_degree == 5);
        }
    }

    #[test]
    fn test_six_eight_uses_eighth_steps() {
        let layout = c_major();
        let options = ParseOptions::new(60.0, "6/8".parse().unwrap());
        let notes = parse("1 2", &layout, &options).unwrap();
        assert!(close(notes[1].time, 0.5));
    }

    #[test]
    fn test_ids_are_unique_and_ordered() {
        let layout = c_major();
        let notes = parse("1 (2 3) 45", &layout, &at(120.0)).unwrap();
        let ids: Vec<_> = notes.iter().map(|n| n.id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["n0", "n1", "n2", "n3", "n4"]);
    }

    #[test]
    fn test_unresolvable_tokens_are_reported_not_fatal() {
        let layout = generate_layout(7, "C", ScaleKind::Major, 4).unwrap();
        let report = parse_with_report("1 1°° x 2\n(3 q)", &layout, &at(60.0)).unwrap();
        assert_eq!(report.notes.len(), 3);
        // 1°° keeps its slot, x does not
        assert!(close(report.notes[1].time, 2.0));
        assert_eq!(report.warnings.len(), 3);
        assert_eq!(report.warnings[0].token, "1°°");
        assert_eq!(report.warnings[1].token, "x");
        assert_eq!(report.warnings[2].token, "q");
        assert_eq!(report.warnings[2].line, 2);
        assert_eq!(report.steps, 4);
    }

    #[test]
    fn test_invalid_options() {
        let layout = c_major();
        assert!(parse("1", &layout, &at(0.0)).is_err());
        assert!(parse("1", &layout, &at(f64::NAN)).is_err());
        let zero = ParseOptions::new(60.0, TimeSignature { beats: 4, beat_type: 0 });
        assert!(parse("1", &layout, &zero).is_err());
    }

    #[test]
    fn test_quantize_is_idempotent() {
        let step = grid_step(93.0, TimeSignature::default());
        for raw in [0.0, 0.1, 0.37, 1.9, 12.345, 100.001] {
            let once = quantize(raw, step);
            assert_eq!(quantize(once, step), once);
        }
    }

    #[test]
    fn test_round_trip() {
        let layout = c_major();
        let options = ParseOptions::new(97.0, "3/4".parse().unwrap());
        let source = "1 2 3 (1 3 5) - - 4°5°6° 7\n_ r (2° 4° 6°) 1°° 3** 2'' (1 1) R 5";
        let first = parse(source, &layout, &options).unwrap();
        let text = serialize(&first, &layout, &options).unwrap();
        let second = parse(&text, &layout, &options).unwrap();
        assert_eq!(multiset(&first), multiset(&second));
    }

    #[test]
    fn test_round_trip_on_fixed_layout() {
        let layout = FixedLayout::Chromatic34.build().unwrap();
        let options = ParseOptions::new(140.0, TimeSignature::default());
        let source = "1 3 5 1° (5° 7°) - 2°° 7°°";
        let first = parse(source, &layout, &options).unwrap();
        let text = serialize(&first, &layout, &options).unwrap();
        assert_eq!(multiset(&first), multiset(&parse(&text, &layout, &options).unwrap()));
    }

    #[test]
    fn test_serializer_measures_and_rests() {
        let layout = c_major();
        let options = at(60.0);
        let notes = parse("1 - - - - 2", &layout, &options).unwrap();
        assert_eq!(serialize(&notes, &layout, &options).unwrap(), "1 - - -\n- 2");
    }

    #[test]
    fn test_serializer_snaps_off_grid_times() {
        let layout = c_major();
        let options = at(60.0);
        let notes = vec![
            NoteEvent { key_index: 8, time: 0.02, duration: 1.0, id: None },
            NoteEvent { key_index: 10, time: -0.01, duration: 1.0, id: None },
            NoteEvent { key_index: 9, time: 1.1, duration: 1.0, id: None },
        ];
        assert_eq!(serialize(&notes, &layout, &options).unwrap(), "(1 5) 3");
    }

    #[test]
    fn test_serializer_skips_chromatic_keys() {
        let layout = FixedLayout::Chromatic34.build().unwrap();
        let options = at(60.0);
        let notes = vec![
            NoteEvent { key_index: 27, time: 0.0, duration: 1.0, id: None },
            NoteEvent { key_index: 10, time: 1.0, duration: 1.0, id: None },
        ];
        assert_eq!(serialize(&notes, &layout, &options).unwrap(), "- 1");
    }

    #[test]
    fn test_empty_input() {
        let layout = c_major();
        assert!(parse("   \n\n", &layout, &at(60.0)).unwrap().is_empty());
        assert_eq!(serialize(&[], &layout, &at(60.0)).unwrap(), "");
    }

    #[test]
    fn test_leading_dash_rest_is_not_frontmatter() {
        let layout = c_major();
        let report = parse_with_report("---\n1 2 3\n5 6", &layout, &at(60.0)).unwrap();
        assert_eq!(report.notes.len(), 5);
        assert!(report.warnings.is_empty());
        assert!(close(report.notes[0].time, 3.0));
        assert!(close(report.notes[4].time, 7.0));
    }
}
