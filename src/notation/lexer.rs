//! Tokenizer for kalimba tablature.
//!
//! Lines split on whitespace, except that a parenthesized group is always one
//! token (`(1 3 5)`), and `(` / `)` end the surrounding word. Octave-marker
//! glyphs are folded into a count here, so nothing past the lexer ever sees
//! `°`, `*` or `'`.

use super::frontmatter::split;

/// True for every octave-marker glyph family
pub fn is_marker(c: char) -> bool {
    matches!(c, '°' | '*' | '\'')
}

fn is_rest(c: char) -> bool {
    matches!(c, '-' | '_')
}

/// A scale degree plus its octave-marker count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteToken {
    pub degree: u8,
    pub markers: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// One or more rest glyphs (`-`, `--`, `_`, `r`, `R`)
    Rest(usize),
    Note(NoteToken),
    /// Several notes written without spaces, each on its own grid step
    Run(Vec<NoteToken>),
    /// Simultaneous notes; `rejected` holds members that are not notation
    Chord {
        notes: Vec<NoteToken>,
        rejected: Vec<String>,
    },
    /// Anything else; dropped by the parser without moving the cursor
    Unknown(String),
}

/// A token with its position in the source
#[derive(Debug, Clone)]
pub struct LocatedToken {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

/// Split a word into notes. Returns None if any character is not a 1-7
/// digit or a marker following one.
fn lex_notes(word: &str) -> Option<Vec<NoteToken>> {
    let mut notes: Vec<NoteToken> = Vec::new();
    for c in word.chars() {
        match c {
            '1'..='7' => notes.push(NoteToken {
                degree: c as u8 - b'0',
                markers: 0,
            }),
            c if is_marker(c) => {
                let last = notes.last_mut()?;
                last.markers = last.markers.saturating_add(1);
            }
            _ => return None,
        }
    }
    Some(notes)
}

fn classify_word(word: &str) -> Token {
    if matches!(word, "r" | "R") {
        return Token::Rest(1);
    }
    if word.chars().all(is_rest) {
        return Token::Rest(word.chars().count());
    }
    match lex_notes(word) {
        Some(mut notes) if notes.len() == 1 => Token::Note(notes.remove(0)),
        Some(notes) if !notes.is_empty() => Token::Run(notes),
        _ => Token::Unknown(word.to_string()),
    }
}

fn classify_chord(inner: &str) -> Token {
    let mut notes = Vec::new();
    let mut rejected = Vec::new();
    for member in inner.split_whitespace() {
        // `(135)` is shorthand for `(1 3 5)` inside a chord
        match lex_notes(member) {
            Some(found) if !found.is_empty() => notes.extend(found),
            _ => rejected.push(member.to_string()),
        }
    }
    Token::Chord { notes, rejected }
}

/// Lexer for tablature source
pub struct Lexer<'a> {
    input: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input }
    }

    /// Tokenize the whole input. A leading frontmatter block (`---` ... `---`)
    /// is skipped; line numbers still count it. An opening `---` that is
    /// never closed is an ordinary three-step rest.
    pub fn tokenize(&self) -> Vec<LocatedToken> {
        let (header, body) = split(self.input);
        let first_line = header.matches('\n').count() + 1;

        let mut tokens = Vec::new();
        for (index, line) in body.lines().enumerate() {
            self.tokenize_line(line, first_line + index, &mut tokens);
        }
        tokens
    }

    fn tokenize_line(&self, line: &str, line_number: usize, tokens: &mut Vec<LocatedToken>) {
        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            if c.is_whitespace() || c == ')' {
                i += 1;
                continue;
            }

            let column = i + 1;
            if c == '(' {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end] != ')' {
                    end += 1;
                }
                let inner: String = chars[start..end].iter().collect();
                tokens.push(LocatedToken {
                    token: classify_chord(&inner),
                    line: line_number,
                    column,
                });
                i = end + 1;
                continue;
            }

            let start = i;
            while i < chars.len()
                && !chars[i].is_whitespace()
                && chars[i] != '('
                && chars[i] != ')'
            {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            tokens.push(LocatedToken {
                token: classify_word(&word),
                line: line_number,
                column,
            });
        }
    }
}
