//! Per-tick judgment: turns the latest pitch into at most one hit and
//! sweeps notes whose window has passed into misses.

use serde::{Deserialize, Serialize};

use super::session::{GameSession, PitchSlot};
use super::{HitAccuracy, JudgmentWindows, NoteHit};
use crate::layout::Layout;
use crate::pitch::{KeyMatch, PitchMatcher};
use crate::song::Song;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Judge {
    pub windows: JudgmentWindows,
    pub matcher: PitchMatcher,
}

impl Judge {
    pub fn new(windows: JudgmentWindows, matcher: PitchMatcher) -> Self {
        Self { windows, matcher }
    }

    /// Start a run of `song`, keeping the session open until the last
    /// note's okay window has closed
    pub fn start(&self, session: &mut GameSession, song: &Song) {
        session.start_song(song, self.windows.reach());
    }

    /// One game-loop tick.
    ///
    /// Consumes the slot's latest pitch (older samples are already gone) and
    /// returns the judgments made this tick. Does nothing unless the session
    /// is active.
    pub fn tick(
        &self,
        session: &mut GameSession,
        song: &Song,
        layout: &Layout,
        slot: &PitchSlot,
    ) -> Vec<NoteHit> {
        if !session.is_active() {
            return Vec::new();
        }
        let matched = slot
            .take()
            .and_then(|pitch| self.matcher.match_pitch(&pitch, layout));
        self.judge(session, song, matched)
    }

    /// Judge against an already-matched key (or none)
    pub fn judge(
        &self,
        session: &mut GameSession,
        song: &Song,
        matched: Option<KeyMatch>,
    ) -> Vec<NoteHit> {
        let mut made = Vec::new();
        if !session.is_active() {
            return made;
        }
        let now = session.clock();
        let reach = self.windows.reach();

        if let Some(hit) = matched {
            let candidate = song
                .notes
                .iter()
                .filter(|n| n.key_index == hit.key_index)
                .filter_map(|n| n.id.as_deref().map(|id| (id, now - n.time)))
                .filter(|(id, delta)| delta.abs() <= reach && !session.is_judged(id))
                .min_by(|a, b| a.1.abs().total_cmp(&b.1.abs()));

            if let Some((id, delta)) = candidate {
                let delta_ms = delta * 1000.0;
                let judgment = NoteHit {
                    note_id: id.to_string(),
                    accuracy: self.windows.classify(delta_ms),
                    time_delta_ms: Some(delta_ms),
                };
                if session.register_judgment(judgment.clone()) {
                    made.push(judgment);
                }
            }
        }

        // Windows that closed without a matching pitch
        let expired: Vec<&str> = song
            .notes
            .iter()
            .filter(|n| now - n.time > reach)
            .filter_map(|n| n.id.as_deref())
            .filter(|id| !session.is_judged(id))
            .collect();
        for id in expired {
            let miss = NoteHit {
                note_id: id.to_string(),
                accuracy: HitAccuracy::Miss,
                time_delta_ms: None,
            };
            if session.register_judgment(miss.clone()) {
                made.push(miss);
            }
        }

        made
    }
}
