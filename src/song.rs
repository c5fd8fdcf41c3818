//! # Song Model
//!
//! Timed note events and the persisted Song JSON shape.
//!
//! A [`Song`] carries both the compiled `notes` (so playback never has to
//! re-parse) and the original `notation` text (so edits stay re-parseable).
//!
//! ## Song JSON
//! ```json
//! {
//!   "id": "twinkle",
//!   "title": "Twinkle",
//!   "artist": "Trad.",
//!   "bpm": 90.0,
//!   "timeSignature": "4/4",
//!   "difficulty": "easy",
//!   "duration": 2.667,
//!   "notes": [{ "keyIndex": 8, "time": 0.0, "duration": 0.667, "id": "n0" }],
//!   "notation": "1 1 5 5"
//! }
//! ```
//!
//! `difficulty` is accepted as a string or a number and normalized into
//! [`Difficulty`] at the boundary.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{KalimbaError, Result};

/// Events closer than this are considered simultaneous
pub const TIME_EPSILON: f64 = 1e-6;

/// Time signature (e.g., 4/4, 3/4, 6/8)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignature {
    pub beats: u8,
    pub beat_type: u8,
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self {
            beats: 4,
            beat_type: 4,
        }
    }
}

impl FromStr for TimeSignature {
    type Err = KalimbaError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        if parts.len() != 2 {
            return Err(KalimbaError::MetadataError(format!(
                "Invalid time signature: {}",
                s
            )));
        }
        let beats: u8 = parts[0].trim().parse().map_err(|_| {
            KalimbaError::MetadataError(format!("Invalid time signature beats: {}", s))
        })?;
        let beat_type: u8 = parts[1].trim().parse().map_err(|_| {
            KalimbaError::MetadataError(format!("Invalid time signature beat type: {}", s))
        })?;
        let ts = TimeSignature { beats, beat_type };
        ts.validate()?;
        Ok(ts)
    }
}

impl TimeSignature {
    pub fn validate(&self) -> Result<()> {
        if self.beats == 0 || self.beat_type == 0 {
            return Err(KalimbaError::MetadataError(format!(
                "Time signature {} must have a non-zero numerator and denominator",
                self
            )));
        }
        Ok(())
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats, self.beat_type)
    }
}

impl Serialize for TimeSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One note (or one member of a chord)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEvent {
    pub key_index: usize,
    /// Seconds from song start
    pub time: f64,
    /// Seconds, always positive
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl NoteEvent {
    pub fn end_time(&self) -> f64 {
        self.time + self.duration
    }
}

/// Song difficulty, normalized from whatever the JSON carried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Expert => "expert",
        }
    }

    /// Numeric levels 1-4; anything below clamps to easy, above to expert
    pub fn from_level(level: i64) -> Self {
        match level {
            i64::MIN..=1 => Difficulty::Easy,
            2 => Difficulty::Medium,
            3 => Difficulty::Hard,
            _ => Difficulty::Expert,
        }
    }
}

impl FromStr for Difficulty {
    type Err = KalimbaError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Ok(level) = trimmed.parse::<i64>() {
            return Ok(Difficulty::from_level(level));
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "easy" | "beginner" => Ok(Difficulty::Easy),
            "medium" | "normal" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            "expert" => Ok(Difficulty::Expert),
            other => Err(KalimbaError::MetadataError(format!("Unknown difficulty: {}", other))),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Difficulty {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Wire shape of `difficulty`: a label or a level
#[derive(Deserialize)]
#[serde(untagged)]
enum RawDifficulty {
    Level(i64),
    Fractional(f64),
    Label(String),
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match RawDifficulty::deserialize(deserializer)? {
            RawDifficulty::Level(level) => Ok(Difficulty::from_level(level)),
            RawDifficulty::Fractional(level) => Ok(Difficulty::from_level(level.round() as i64)),
            RawDifficulty::Label(label) => label.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// A compiled song
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub artist: String,
    pub bpm: f64,
    #[serde(default)]
    pub time_signature: TimeSignature,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub duration: f64,
    pub notes: Vec<NoteEvent>,
    #[serde(default)]
    pub notation: String,
}

impl Song {
    /// Build a song from already-timed notes. Notes are sorted by time and the
    /// duration is the end of the last note.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        bpm: f64,
        time_signature: TimeSignature,
        mut notes: Vec<NoteEvent>,
    ) -> Self {
        notes.sort_by(|a, b| a.time.total_cmp(&b.time).then(a.key_index.cmp(&b.key_index)));
        let duration = notes.iter().map(NoteEvent::end_time).fold(0.0, f64::max);
        Self {
            id: id.into(),
            title: title.into(),
            artist: String::new(),
            bpm,
            time_signature,
            difficulty: Difficulty::default(),
            duration,
            notes,
            notation: String::new(),
        }
    }

    /// Load Song JSON. Notes are re-sorted and any note without an id gets one.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut song: Song =
            serde_json::from_str(json).map_err(|e| KalimbaError::SongError(e.to_string()))?;
        song.time_signature.validate()?;
        if !(song.bpm.is_finite() && song.bpm > 0.0) {
            return Err(KalimbaError::SongError(format!("bpm must be positive, got {}", song.bpm)));
        }
        if let Some(bad) = song.notes.iter().find(|n| !(n.time >= 0.0 && n.duration > 0.0)) {
            return Err(KalimbaError::SongError(format!(
                "note on key {} has time {} and duration {}",
                bad.key_index, bad.time, bad.duration
            )));
        }
        song.notes
            .sort_by(|a, b| a.time.total_cmp(&b.time).then(a.key_index.cmp(&b.key_index)));
        song.ensure_ids();
        Ok(song)
    }

    /// Make every note id unique. Id-less notes, and every repeat of an id
    /// after its first note, get `n<position>` (suffixed if taken).
    pub fn ensure_ids(&mut self) {
        let mut taken: HashSet<String> = self.notes.iter().filter_map(|n| n.id.clone()).collect();
        let mut kept = HashSet::new();
        for (position, note) in self.notes.iter_mut().enumerate() {
            if let Some(id) = &note.id {
                if kept.insert(id.clone()) {
                    continue;
                }
                log::warn!("Duplicate note id '{}' at position {}, reassigning", id, position);
            }
            let mut candidate = format!("n{}", position);
            let mut suffix = 1;
            while taken.contains(&candidate) {
                candidate = format!("n{}-{}", position, suffix);
                suffix += 1;
            }
            taken.insert(candidate.clone());
            kept.insert(candidate.clone());
            note.id = Some(candidate);
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| KalimbaError::SongError(e.to_string()))
    }

    pub fn note(&self, id: &str) -> Option<&NoteEvent> {
        self.notes.iter().find(|n| n.id.as_deref() == Some(id))
    }

    /// Notes grouped by identical start time
    pub fn chord_groups(&self) -> Vec<&[NoteEvent]> {
        let mut groups = Vec::new();
        let mut start = 0;
        for i in 1..=self.notes.len() {
            let split = i == self.notes.len()
                || (self.notes[i].time - self.notes[start].time).abs() > TIME_EPSILON;
            if split {
                groups.push(&self.notes[start..i]);
                start = i;
            }
        }
        groups
    }
}
