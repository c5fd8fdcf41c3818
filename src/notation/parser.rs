//! Tablature → timeline.
//!
//! Walks the lexer's tokens with a grid cursor that only moves forward:
//! - rest: cursor += 1 per glyph
//! - note: one event at the cursor, cursor += 1
//! - run: one event per note on successive steps
//! - chord: every member at the cursor, cursor += 1
//!
//! Event times are computed as `step_index * grid_step` rather than by
//! accumulation, so every time is an exact multiple of the grid step.

use super::lexer::{Lexer, LocatedToken, NoteToken, Token};
use super::{ParseOptions, ParseReport, ParseWarning};
use crate::error::Result;
use crate::layout::{degree_label, Layout};
use crate::song::NoteEvent;

struct Parser<'a> {
    layout: &'a Layout,
    step: f64,
    cursor: u64,
    notes: Vec<NoteEvent>,
    warnings: Vec<ParseWarning>,
}

impl<'a> Parser<'a> {
    fn new(layout: &'a Layout, step: f64) -> Self {
        Self {
            layout,
            step,
            cursor: 0,
            notes: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, located: &LocatedToken, token: String, message: String) {
        log::warn!(
            "Skipping '{}' at line {}, column {}: {}",
            token, located.line, located.column, message
        );
        self.warnings.push(ParseWarning {
            line: located.line,
            column: located.column,
            token,
            message,
        });
    }

    /// Emit one note at the current cursor. Does not advance.
    fn emit(&mut self, note: NoteToken, located: &LocatedToken) {
        match self.layout.resolve(note.degree, note.markers) {
            Some(key_index) => {
                let id = format!("n{}", self.notes.len());
                self.notes.push(NoteEvent {
                    key_index,
                    time: self.cursor as f64 * self.step,
                    duration: self.step,
                    id: Some(id),
                });
            }
            None => {
                let label = degree_label(note.degree, note.markers);
                let message =
                    format!("no key labelled {} on layout '{}'", label, self.layout.name());
                self.warn(located, label, message);
            }
        }
    }

    fn token(&mut self, located: &LocatedToken) {
        match &located.token {
            Token::Rest(count) => self.cursor += *count as u64,
            Token::Note(note) => {
                self.emit(*note, located);
                self.cursor += 1;
            }
            Token::Run(notes) => {
                for note in notes {
                    self.emit(*note, located);
                    self.cursor += 1;
                }
            }
            Token::Chord { notes, rejected } => {
                for member in rejected {
                    self.warn(located, member.clone(), "not a note inside chord".to_string());
                }
                for note in notes {
                    self.emit(*note, located);
                }
                self.cursor += 1;
            }
            Token::Unknown(word) => {
                self.warn(located, word.clone(), "not tablature notation".to_string());
            }
        }
    }
}

/// Compile tablature into timed note events plus any skipped-token warnings.
pub fn parse_with_report(
    source: &str,
    layout: &Layout,
    options: &ParseOptions,
) -> Result<ParseReport> {
    options.validate()?;
    let tokens = Lexer::new(source).tokenize();

    let mut parser = Parser::new(layout, options.grid_step());
    for located in &tokens {
        parser.token(located);
    }

    log::debug!(
        "Parsed {} tokens into {} notes over {} grid steps ({} skipped)",
        tokens.len(),
        parser.notes.len(),
        parser.cursor,
        parser.warnings.len()
    );

    Ok(ParseReport {
        notes: parser.notes,
        warnings: parser.warnings,
        steps: parser.cursor,
    })
}
