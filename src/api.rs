//! # Public API
//!
//! Entry points that take a whole tablature document (optional frontmatter
//! plus tab) to a [`Song`].
//!
//! ## Compilation Functions
//!
//! - [`compile()`] - song, resolved layout and skipped-token warnings
//! - [`compile_document()`] - just the song
//! - [`compile_with_layout()`] - ignore the document's layout, use this one
//! - [`format_notation()`] - re-emit the tab in canonical form
//!
//! ## Typical Usage
//!
//! ```rust
//! use kalimba::compile_document;
//!
//! let source = r#"---
//! title: Twinkle Twinkle
//! bpm: 90
//! layout:
//!   tines: 7
//! ---
//! 1 1 5 5
//! "#;
//!
//! let song = compile_document(source)?;
//! assert_eq!(song.id, "twinkle-twinkle");
//! assert_eq!(song.notes.len(), 4);
//! # Ok::<(), kalimba::KalimbaError>(())
//! ```

use crate::error::Result;
use crate::layout::Layout;
use crate::notation::frontmatter::{self, Frontmatter};
use crate::notation::{parse_with_report, serialize, ParseOptions, ParseWarning};
use crate::song::{Song, TimeSignature};

/// Everything a compile produces
#[derive(Debug, Clone)]
pub struct Compilation {
    pub song: Song,
    pub layout: Layout,
    pub warnings: Vec<ParseWarning>,
}

/// Compile a document using the layout named in its frontmatter (or the
/// default 17-tine C major layout).
///
/// # Errors
/// `ParseError` for an unclosed frontmatter block, `MetadataError` for bad
/// YAML, bpm or time signature, `LayoutError` for an unbuildable layout.
pub fn compile(source: &str) -> Result<Compilation> {
    let meta = frontmatter::extract(source)?.unwrap_or_default();
    let layout = meta.layout.clone().unwrap_or_default().build()?;
    compile_parts(source, meta, layout)
}

/// Compile a document straight to a [`Song`], discarding warnings
pub fn compile_document(source: &str) -> Result<Song> {
    Ok(compile(source)?.song)
}

/// Compile against a caller-supplied layout. A `layout` entry in the
/// frontmatter is ignored.
pub fn compile_with_layout(source: &str, layout: &Layout) -> Result<Compilation> {
    let meta = frontmatter::extract(source)?.unwrap_or_default();
    compile_parts(source, meta, layout.clone())
}

/// Parse a document and serialize its notes back to canonical tab: `°`
/// markers, one measure per line, `-` for silent steps. Frontmatter is not
/// included in the output.
pub fn format_notation(source: &str) -> Result<String> {
    let compiled = compile(source)?;
    let options = ParseOptions::new(compiled.song.bpm, compiled.song.time_signature);
    serialize(&compiled.song.notes, &compiled.layout, &options)
}

fn compile_parts(source: &str, meta: Frontmatter, layout: Layout) -> Result<Compilation> {
    let time_signature = match meta.time_signature.as_deref() {
        Some(ts) => ts.parse::<TimeSignature>()?,
        None => TimeSignature::default(),
    };
    let defaults = ParseOptions::default();
    let options = ParseOptions::new(meta.bpm.unwrap_or(defaults.bpm), time_signature);

    let report = parse_with_report(source, &layout, &options)?;
    for warning in &report.warnings {
        log::warn!("{}", warning);
    }

    let title = meta.title.unwrap_or_else(|| "Untitled".to_string());
    let id = meta.id.unwrap_or_else(|| slugify(&title));
    let mut song = Song::new(id, title, options.bpm, options.time_signature, report.notes);
    song.artist = meta.artist.unwrap_or_default();
    song.difficulty = meta.difficulty.unwrap_or_default();
    song.notation = frontmatter::split(source).1.trim().to_string();
    song.ensure_ids();

    log::info!(
        "Compiled '{}': {} notes, {:.3}s on {} ({} warnings)",
        song.title,
        song.notes.len(),
        song.duration,
        layout.name(),
        report.warnings.len()
    );

    Ok(Compilation {
        song,
        layout,
        warnings: report.warnings,
    })
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KalimbaError;
    use crate::layout::{generate_layout, ScaleKind};
    use crate::song::Difficulty;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_compile_with_frontmatter() {
        let source = "---\ntitle: Ode to Joy\nartist: Beethoven\nbpm: 60\ntime-signature: 3/4\ndifficulty: 3\n---\n3 3 4 5\n5 4 3 2\n";
        let song = compile_document(source).unwrap();
        assert_eq!(song.id, "ode-to-joy");
        assert_eq!(song.artist, "Beethoven");
        assert_eq!(song.bpm, 60.0);
        assert_eq!(song.time_signature, TimeSignature { beats: 3, beat_type: 4 });
        assert_eq!(song.difficulty, Difficulty::Hard);
        assert_eq!(song.notes.len(), 8);
        assert_eq!(song.notes[1].time, 1.0);
        assert_eq!(song.notation, "3 3 4 5\n5 4 3 2");
        assert!(song.notes.iter().all(|n| n.id.is_some()));
    }

    #[test]
    fn test_compile_without_frontmatter_uses_defaults() {
        let compiled = compile("1 2 3").unwrap();
        assert_eq!(compiled.song.title, "Untitled");
        assert_eq!(compiled.song.id, "untitled");
        assert_eq!(compiled.song.bpm, 120.0);
        assert_eq!(compiled.layout.len(), 17);
        assert_eq!(compiled.song.notation, "1 2 3");
    }

    #[test]
    fn test_warnings_are_returned() {
        let compiled = compile("1 x 9 3").unwrap();
        assert_eq!(compiled.song.notes.len(), 2);
        assert_eq!(compiled.warnings.len(), 2);
    }

    #[test]
    fn test_invalid_metadata() {
        assert!(matches!(
            compile_document("---\nbpm: 0\n---\n1"),
            Err(KalimbaError::MetadataError(_))
        ));
        assert!(matches!(
            compile_document("---\ntime-signature: 4/0\n---\n1"),
            Err(KalimbaError::MetadataError(_))
        ));
        assert!(matches!(
            compile_document("---\ntitle: never closed\n1 2 3"),
            Err(KalimbaError::ParseError { line: 1, .. })
        ));
    }

    #[test]
    fn test_compile_with_layout_overrides_frontmatter() {
        let layout = generate_layout(9, "G", ScaleKind::Major, 4).unwrap();
        let source = "---\nlayout:\n  fixed: chromatic-34\n---\n1";
        let compiled = compile_with_layout(source, &layout).unwrap();
        assert_eq!(compiled.layout.len(), 9);
        let key = compiled.layout.key(compiled.song.notes[0].key_index).unwrap();
        assert_eq!(key.display_note, "G4");
    }

    #[test]
    fn test_format_notation() {
        let formatted = format_notation("---\ntitle: x\n---\n1  (5 3) -\n1' 2* 3 4 5").unwrap();
        assert_eq!(formatted, "1 (3 5) - 1°\n2° 3 4 5");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Twinkle, Twinkle  Little Star!"), "twinkle-twinkle-little-star");
        assert_eq!(slugify("???"), "untitled");
    }
}
