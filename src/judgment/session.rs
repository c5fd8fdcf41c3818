//! Session state machine and the shared pitch slot.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use super::score::{ScoreState, ScoringConfig};
use super::{HitAccuracy, NoteHit};
use crate::pitch::DetectedPitch;
use crate::song::Song;

/// Latest pitch estimate, shared between the detector and the game loop.
///
/// Writes overwrite; there is no queue. Clones share the same slot, so the
/// detector can hold one half on its own thread.
#[derive(Debug, Clone, Default)]
pub struct PitchSlot {
    inner: Arc<Mutex<Option<DetectedPitch>>>,
}

impl PitchSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&self, pitch: DetectedPitch) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = Some(pitch);
    }

    /// Read without consuming
    pub fn latest(&self) -> Option<DetectedPitch> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read and clear, so a sample is only acted on once
    pub fn take(&self) -> Option<DetectedPitch> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    pub fn clear(&self) {
        self.take();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Countdown,
    Playing,
    Paused,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SessionConfig {
    /// Seconds of countdown before the song clock reaches 0
    pub lead_in: f64,
    pub scoring: ScoringConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lead_in: 3.0,
            scoring: ScoringConfig::default(),
        }
    }
}

/// One play-through of a song.
///
/// Owns the score and the set of judged note ids. `start_game` replaces all
/// per-session state wholesale; nothing from an earlier run survives.
///
/// Sessions started with [`start_song`](Self::start_song) know their note
/// ids, so finishing records every note still unjudged as a miss.
#[derive(Debug)]
pub struct GameSession {
    config: SessionConfig,
    state: SessionState,
    paused_from: Option<SessionState>,
    clock: f64,
    song_duration: f64,
    /// Playing continues this long past the song's end
    tail: f64,
    expected: Vec<String>,
    score: ScoreState,
    judged: HashSet<String>,
    hits: Vec<NoteHit>,
}

impl GameSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: SessionState::Idle,
            paused_from: None,
            clock: 0.0,
            song_duration: 0.0,
            tail: 0.0,
            expected: Vec::new(),
            score: ScoreState::default(),
            judged: HashSet::new(),
            hits: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Song time in seconds; negative during the countdown
    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn song_duration(&self) -> f64 {
        self.song_duration
    }

    pub fn score(&self) -> &ScoreState {
        &self.score
    }

    pub fn hits(&self) -> &[NoteHit] {
        &self.hits
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Countdown or Playing: the clock runs and hits are accepted
    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Countdown | SessionState::Playing)
    }

    pub fn is_judged(&self, note_id: &str) -> bool {
        self.judged.contains(note_id)
    }

    /// Start a fresh run of a song lasting `song_duration` seconds
    pub fn start_game(&mut self, song_duration: f64) {
        let config = self.config.clone();
        *self = GameSession {
            state: SessionState::Countdown,
            clock: -config.lead_in.max(0.0),
            song_duration: song_duration.max(0.0),
            ..GameSession::new(config)
        };
        log::debug!("Session started: {:.3}s song, clock at {:.3}", self.song_duration, self.clock);
    }

    /// Start a run of `song`. The session stays in Playing for `tail`
    /// seconds after the last note ends (the outermost judgment window, so
    /// the last note can still be hit late), and finishing records every
    /// note never judged as a miss.
    pub fn start_song(&mut self, song: &Song, tail: f64) {
        self.start_game(song.duration);
        self.tail = if tail.is_finite() { tail.max(0.0) } else { 0.0 };
        self.expected = song.notes.iter().filter_map(|n| n.id.clone()).collect();
    }

    /// Back to Idle with nothing retained
    pub fn reset(&mut self) {
        let config = self.config.clone();
        *self = GameSession::new(config);
    }

    pub fn pause(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.paused_from = Some(self.state);
        self.state = SessionState::Paused;
        log::debug!("Session paused at {:.3}", self.clock);
        true
    }

    pub fn resume(&mut self) -> bool {
        match (self.state, self.paused_from.take()) {
            (SessionState::Paused, Some(previous)) => {
                self.state = previous;
                log::debug!("Session resumed at {:.3}", self.clock);
                true
            }
            _ => false,
        }
    }

    /// Move the song clock forward by `dt` seconds and apply any transitions
    pub fn advance(&mut self, dt: f64) -> SessionState {
        if !self.is_active() || !dt.is_finite() || dt <= 0.0 {
            return self.state;
        }
        self.clock += dt;
        if self.state == SessionState::Countdown && self.clock >= 0.0 {
            self.state = SessionState::Playing;
            log::debug!("Countdown over, playing");
        }
        if self.state == SessionState::Playing && self.clock >= self.song_duration + self.tail {
            self.finish();
        }
        self.state
    }

    /// End the run. Known notes never judged count as misses, then the score
    /// is frozen and the judged-id set released.
    pub fn finish(&mut self) {
        if self.state == SessionState::Idle || self.state == SessionState::Finished {
            return;
        }
        for id in std::mem::take(&mut self.expected) {
            if self.judged.insert(id.clone()) {
                self.score.apply(HitAccuracy::Miss, &self.config.scoring);
                self.hits.push(NoteHit {
                    note_id: id,
                    accuracy: HitAccuracy::Miss,
                    time_delta_ms: None,
                });
            }
        }
        self.state = SessionState::Finished;
        self.paused_from = None;
        self.judged = HashSet::new();
        log::info!(
            "Session finished: score {}, max combo {}, accuracy {:.1}%",
            self.score.score,
            self.score.max_combo,
            self.score.accuracy
        );
    }

    /// Record a tier for a note. Returns false (and changes nothing) if the
    /// note was already judged or the session is not accepting hits.
    pub fn register_hit(&mut self, note_id: &str, accuracy: HitAccuracy) -> bool {
        self.register_judgment(NoteHit {
            note_id: note_id.to_string(),
            accuracy,
            time_delta_ms: None,
        })
    }

    /// Like [`register_hit`](Self::register_hit), keeping the timing delta
    pub fn register_judgment(&mut self, hit: NoteHit) -> bool {
        if !self.is_active() {
            log::debug!(
                "Ignoring {} for {}: session is {:?}",
                hit.accuracy,
                hit.note_id,
                self.state
            );
            return false;
        }
        if self.judged.contains(&hit.note_id) {
            return false;
        }
        let points = self.score.apply(hit.accuracy, &self.config.scoring);
        log::trace!("{} {} (+{}), combo {}", hit.note_id, hit.accuracy, points, self.score.combo);
        self.judged.insert(hit.note_id.clone());
        self.hits.push(hit);
        true
    }
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::{NoteEvent, TimeSignature};
    use pretty_assertions::assert_eq;

    fn playing(duration: f64) -> GameSession {
        let mut session = GameSession::default();
        session.start_game(duration);
        session.advance(3.0);
        assert_eq!(session.state(), SessionState::Playing);
        session
    }

    #[test]
    fn test_lifecycle() {
        let mut session = GameSession::default();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.advance(1.0), SessionState::Idle);

        session.start_game(10.0);
        assert_eq!(session.state(), SessionState::Countdown);
        assert_eq!(session.clock(), -3.0);
        assert_eq!(session.advance(2.0), SessionState::Countdown);
        assert_eq!(session.advance(1.0), SessionState::Playing);
        assert_eq!(session.advance(9.5), SessionState::Playing);
        assert_eq!(session.advance(0.5), SessionState::Finished);
        assert_eq!(session.advance(1.0), SessionState::Finished);
        assert!(!session.pause());
    }

    #[test]
    fn test_pause_freezes_clock_and_judgment() {
        let mut session = playing(10.0);
        session.register_hit("a", HitAccuracy::Perfect);
        assert!(session.pause());
        let clock = session.clock();
        session.advance(5.0);
        assert_eq!(session.clock(), clock);
        assert!(!session.register_hit("b", HitAccuracy::Perfect));
        assert!(session.resume());
        assert_eq!(session.state(), SessionState::Playing);
        assert_eq!(session.score().perfect, 1);
        assert!(session.is_judged("a"));
        assert!(!session.resume());
    }

    #[test]
    fn test_pause_during_countdown_resumes_countdown() {
        let mut session = GameSession::default();
        session.start_game(5.0);
        session.pause();
        session.resume();
        assert_eq!(session.state(), SessionState::Countdown);
    }

    #[test]
    fn test_register_hit_is_idempotent() {
        let mut session = playing(10.0);
        assert!(session.register_hit("n0", HitAccuracy::Good));
        let after_first = session.score().clone();
        assert!(!session.register_hit("n0", HitAccuracy::Perfect));
        assert!(!session.register_hit("n0", HitAccuracy::Miss));
        assert_eq!(session.score(), &after_first);
        assert_eq!(session.hits().len(), 1);
    }

    #[test]
    fn test_miss_always_resets_combo() {
        let mut session = playing(10.0);
        let tiers = [HitAccuracy::Perfect, HitAccuracy::Good, HitAccuracy::Okay];
        for (i, tier) in tiers.iter().enumerate() {
            session.register_hit(&format!("n{}", i), *tier);
        }
        assert_eq!(session.score().combo, 3);
        session.register_hit("n3", HitAccuracy::Miss);
        assert_eq!(session.score().combo, 0);
        session.register_hit("n4", HitAccuracy::Miss);
        assert_eq!(session.score().combo, 0);
        assert_eq!(session.score().miss, 2);
        assert_eq!(session.score().max_combo, 3);
    }

    #[test]
    fn test_countdown_accepts_early_hits() {
        let mut session = GameSession::default();
        session.start_game(10.0);
        session.advance(2.95);
        assert!(session.register_hit("n0", HitAccuracy::Good));
    }

    #[test]
    fn test_restart_forgets_previous_run() {
        let mut session = playing(1.0);
        session.register_hit("n0", HitAccuracy::Perfect);
        session.advance(2.0);
        assert_eq!(session.state(), SessionState::Finished);
        assert!(!session.is_judged("n0"));
        assert_eq!(session.score().perfect, 1);

        session.start_game(1.0);
        assert_eq!(session.score(), &ScoreState::default());
        assert!(session.hits().is_empty());
        session.advance(3.0);
        assert!(session.register_hit("n0", HitAccuracy::Okay));
    }

    fn two_note_song() -> Song {
        let notes = ["a", "b"]
            .iter()
            .enumerate()
            .map(|(i, id)| NoteEvent {
                key_index: i,
                time: i as f64,
                duration: 1.0,
                id: Some(id.to_string()),
            })
            .collect();
        Song::new("s", "S", 60.0, TimeSignature::default(), notes)
    }

    #[test]
    fn test_finishing_records_unjudged_notes_as_misses() {
        let song = two_note_song();
        let mut session = GameSession::default();
        session.start_song(&song, 0.15);
        session.advance(3.0);
        assert!(session.register_hit("a", HitAccuracy::Perfect));

        // One jump past the end; "b" never got a tick
        assert_eq!(session.advance(60.0), SessionState::Finished);
        assert_eq!(session.score().judged(), 2);
        assert_eq!(session.score().miss, 1);
        assert_eq!(session.score().combo, 0);
        assert_eq!(session.hits().last().map(|h| h.note_id.as_str()), Some("b"));
    }

    #[test]
    fn test_tail_keeps_last_note_open() {
        let song = two_note_song();
        let mut session = GameSession::default();
        session.start_song(&song, 0.15);
        session.advance(3.0 + 2.1);
        assert_eq!(session.state(), SessionState::Playing);
        assert!(session.register_hit("b", HitAccuracy::Okay));
        assert_eq!(session.advance(0.1), SessionState::Finished);
        // "a" swept at the end, "b" kept its okay
        assert_eq!(session.score().okay, 1);
        assert_eq!(session.score().miss, 1);
    }

    #[test]
    fn test_finishing_while_paused_still_sweeps() {
        let song = two_note_song();
        let mut session = GameSession::default();
        session.start_song(&song, 0.0);
        session.advance(3.5);
        session.pause();
        session.finish();
        assert_eq!(session.state(), SessionState::Finished);
        assert_eq!(session.score().miss, 2);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut session = playing(10.0);
        session.register_hit("n0", HitAccuracy::Perfect);
        session.reset();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.score().score, 0);
    }

    #[test]
    fn test_pitch_slot_last_write_wins() {
        let slot = PitchSlot::new();
        let producer = slot.clone();
        producer.write(DetectedPitch { frequency: 200.0, clarity: 0.9, volume: None });
        producer.write(DetectedPitch { frequency: 300.0, clarity: 0.9, volume: None });
        assert_eq!(slot.latest().unwrap().frequency, 300.0);
        assert_eq!(slot.take().unwrap().frequency, 300.0);
        assert!(slot.take().is_none());
    }

    #[test]
    fn test_pitch_slot_across_threads() {
        let slot = PitchSlot::new();
        let producer = slot.clone();
        std::thread::spawn(move || {
            for i in 1..=100 {
                producer.write(DetectedPitch {
                    frequency: i as f64,
                    clarity: 1.0,
                    volume: Some(0.5),
                });
            }
        })
        .join()
        .unwrap();
        assert_eq!(slot.latest().unwrap().frequency, 100.0);
    }
}
