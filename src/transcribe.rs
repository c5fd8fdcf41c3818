//! # Transcription
//!
//! Boundary to an external note-extraction service (an AI model, a DSP
//! onset tracker, anything that hears a recording and reports notes).
//!
//! An empty result gets one retry with relaxed thresholds. If that is empty
//! too the caller gets [`KalimbaError::NoNotesDetected`]; an empty song is
//! never returned silently.

use serde::{Deserialize, Serialize};

use crate::error::{KalimbaError, Result};
use crate::layout::Layout;
use crate::notation::{quantize, ParseOptions};
use crate::pitch::find_closest_key;
use crate::song::NoteEvent;

/// Detection thresholds passed to the transcriber
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sensitivity {
    /// Minimum onset strength, 0-1
    pub onset_threshold: f64,
    /// Minimum per-frame note confidence, 0-1
    pub frame_threshold: f64,
}

impl Default for Sensitivity {
    fn default() -> Self {
        Self {
            onset_threshold: 0.5,
            frame_threshold: 0.3,
        }
    }
}

impl Sensitivity {
    /// Thresholds for the second attempt
    pub fn relaxed() -> Self {
        Self {
            onset_threshold: 0.3,
            frame_threshold: 0.15,
        }
    }
}

/// One note as heard by the transcriber
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TranscribedNote {
    pub frequency: f64,
    pub start: f64,
    pub duration: f64,
}

pub trait Transcriber {
    fn transcribe(
        &self,
        samples: &[f32],
        sample_rate: u32,
        sensitivity: Sensitivity,
    ) -> Result<Vec<TranscribedNote>>;
}

/// Run the transcriber (retrying once) and turn its output into grid-aligned
/// notes on `layout`. Notes that match no key within `tolerance_cents` are
/// dropped.
pub fn transcribe_to_notes(
    transcriber: &dyn Transcriber,
    samples: &[f32],
    sample_rate: u32,
    layout: &Layout,
    options: &ParseOptions,
    tolerance_cents: f64,
) -> Result<Vec<NoteEvent>> {
    options.validate()?;

    let mut heard = transcriber.transcribe(samples, sample_rate, Sensitivity::default())?;
    if heard.is_empty() {
        log::info!("No notes at default sensitivity, retrying relaxed");
        heard = transcriber.transcribe(samples, sample_rate, Sensitivity::relaxed())?;
    }
    if heard.is_empty() {
        return Err(KalimbaError::NoNotesDetected);
    }

    let step = options.grid_step();
    let mut notes = Vec::with_capacity(heard.len());
    for note in &heard {
        match find_closest_key(note.frequency, layout, tolerance_cents) {
            Some(hit) => notes.push(NoteEvent {
                key_index: hit.key_index,
                time: quantize(note.start.max(0.0), step),
                duration: quantize(note.duration, step).max(step),
                id: None,
            }),
            None => log::warn!(
                "Transcribed {:.1} Hz at {:.3}s matches no key on '{}'",
                note.frequency,
                note.start,
                layout.name()
            ),
        }
    }
    if notes.is_empty() {
        return Err(KalimbaError::NoNotesDetected);
    }

    notes.sort_by(|a, b| a.time.total_cmp(&b.time).then(a.key_index.cmp(&b.key_index)));
    for (i, note) in notes.iter_mut().enumerate() {
        note.id = Some(format!("n{}", i));
    }
    Ok(notes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{generate_layout, ScaleKind};
    use std::cell::RefCell;

    /// Returns canned results per attempt and records the thresholds it saw
    struct Scripted {
        attempts: RefCell<Vec<Sensitivity>>,
        results: Vec<Vec<TranscribedNote>>,
    }

    impl Scripted {
        fn new(results: Vec<Vec<TranscribedNote>>) -> Self {
            Self {
                attempts: RefCell::new(Vec::new()),
                results,
            }
        }
    }

    impl Transcriber for Scripted {
        fn transcribe(
            &self,
            _: &[f32],
            _: u32,
            sensitivity: Sensitivity,
        ) -> Result<Vec<TranscribedNote>> {
            let mut attempts = self.attempts.borrow_mut();
            let result = self.results.get(attempts.len()).cloned().unwrap_or_default();
            attempts.push(sensitivity);
            Ok(result)
        }
    }

    fn heard(frequency: f64, start: f64) -> TranscribedNote {
        TranscribedNote { frequency, start, duration: 0.4 }
    }

    #[test]
    fn test_first_attempt_succeeds() {
        let layout = generate_layout(17, "C", ScaleKind::Major, 4).unwrap();
        let oracle = Scripted::new(vec![vec![heard(392.0, 1.02), heard(261.6, 0.01)]]);
        let options = ParseOptions::default();
        let notes = transcribe_to_notes(&oracle, &[], 44_100, &layout, &options, 50.0).unwrap();
        assert_eq!(oracle.attempts.borrow().len(), 1);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].time, 0.0);
        assert_eq!(layout.key(notes[0].key_index).unwrap().display_note, "C4");
        assert_eq!(notes[1].time, 1.0);
        assert_eq!(notes[1].duration, 0.5);
        assert_eq!(notes[1].id.as_deref(), Some("n1"));
    }

    #[test]
    fn test_retries_once_relaxed() {
        let layout = generate_layout(17, "C", ScaleKind::Major, 4).unwrap();
        let oracle = Scripted::new(vec![vec![], vec![heard(329.6, 0.0)]]);
        let options = ParseOptions::default();
        let notes = transcribe_to_notes(&oracle, &[], 44_100, &layout, &options, 50.0).unwrap();
        assert_eq!(notes.len(), 1);
        let attempts = oracle.attempts.borrow();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[1], Sensitivity::relaxed());
    }

    #[test]
    fn test_empty_twice_is_an_error() {
        let layout = generate_layout(17, "C", ScaleKind::Major, 4).unwrap();
        let oracle = Scripted::new(vec![]);
        let options = ParseOptions::default();
        let result = transcribe_to_notes(&oracle, &[], 44_100, &layout, &options, 50.0);
        assert!(matches!(result, Err(KalimbaError::NoNotesDetected)));
        assert_eq!(oracle.attempts.borrow().len(), 2);
    }

    #[test]
    fn test_nothing_on_the_layout_is_an_error() {
        let layout = generate_layout(17, "C", ScaleKind::Major, 4).unwrap();
        // C#4, between two tines
        let oracle = Scripted::new(vec![vec![heard(277.18, 0.0)]]);
        let options = ParseOptions::default();
        let result = transcribe_to_notes(&oracle, &[], 44_100, &layout, &options, 30.0);
        assert!(matches!(result, Err(KalimbaError::NoNotesDetected)));
    }
}
