//! # Error Types
//!
//! All fallible operations in the crate return [`KalimbaError`].
//!
//! Most notation problems are *not* errors: an unresolvable tab token is
//! logged and reported as a [`ParseWarning`](crate::notation::ParseWarning)
//! so a hand-typed tab still compiles. Errors are reserved for things nothing
//! downstream can work around:
//! - `ParseError` - malformed frontmatter or structure, with line/column
//! - `MetadataError` - invalid bpm, time signature or difficulty
//! - `LayoutError` - zero-key layouts, unknown scales, bad fixed tables
//! - `ConfigError` - unreadable or invalid game configuration
//! - `SongError` - Song JSON that does not deserialize
//! - `AudioNotInitialized` - tone scheduling before `AudioEngine::init`
//! - `NoNotesDetected` - transcription came back empty twice
//!
//! ## Usage
//! ```rust
//! use kalimba::{compile_document, KalimbaError};
//!
//! match compile_document("---\nbpm: 0\n---\n1 2 3") {
//!     Ok(song) => println!("{} notes", song.notes.len()),
//!     Err(KalimbaError::MetadataError(msg)) => eprintln!("bad header: {}", msg),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

pub type Result<T> = std::result::Result<T, KalimbaError>;

#[derive(Error, Debug)]
pub enum KalimbaError {
    /// Parse error with location information.
    ///
    /// # Example
    /// ```
    /// # use kalimba::KalimbaError;
    /// let err = KalimbaError::ParseError {
    ///     line: 2,
    ///     column: 1,
    ///     message: "Unterminated frontmatter block".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Parse error at line 2, column 1: Unterminated frontmatter block");
    /// ```
    #[error("Parse error at line {line}, column {column}: {message}")]
    ParseError {
        line: usize,
        column: usize,
        message: String,
    },

    /// Invalid song metadata (bpm, time signature, difficulty, frontmatter YAML).
    ///
    /// # Example
    /// ```
    /// # use kalimba::KalimbaError;
    /// let err = KalimbaError::MetadataError("time-signature must be in format N/D".to_string());
    /// assert_eq!(err.to_string(), "Invalid metadata: time-signature must be in format N/D");
    /// ```
    #[error("Invalid metadata: {0}")]
    MetadataError(String),

    /// The layout cannot be built; nothing downstream can run without one.
    #[error("Invalid layout: {0}")]
    LayoutError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Invalid song data: {0}")]
    SongError(String),

    #[error("Audio engine used before init()")]
    AudioNotInitialized,

    /// Transcription produced no notes, even after a relaxed retry.
    #[error("No notes detected in recording")]
    NoNotesDetected,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
