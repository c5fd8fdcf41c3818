pub mod api;
pub mod audio;
pub mod config;
pub mod error;
pub mod judgment;
pub mod layout;
pub mod musicxml;
pub mod notation;
pub mod pitch;
pub mod song;
pub mod transcribe;

pub use api::{compile, compile_document, compile_with_layout, format_notation, Compilation};
pub use config::GameConfig;
pub use error::*;
pub use layout::{generate_layout, FixedLayout, Key, Layout, LayoutSpec, ScaleKind};
pub use musicxml::to_musicxml;
pub use notation::{parse, serialize, ParseOptions};
pub use pitch::find_closest_key;
pub use song::{Difficulty, NoteEvent, Song, TimeSignature};

/// Compile a document and render it as MusicXML
pub fn compile_to_musicxml(source: &str) -> Result<String> {
    let compiled = compile(source)?;
    Ok(to_musicxml(&compiled.song, &compiled.layout))
}
