//! YAML frontmatter at the top of a tablature document.
//!
//! ```text
//! ---
//! title: Twinkle
//! bpm: 90
//! time-signature: 4/4
//! difficulty: easy
//! layout:
//!   tines: 17
//!   root: C
//! ---
//! 1 1 5 5 6 6 5 -
//! ```

use serde::Deserialize;

use crate::error::{KalimbaError, Result};
use crate::layout::LayoutSpec;
use crate::song::Difficulty;

/// Raw frontmatter fields, before validation
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Frontmatter {
    pub id: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub bpm: Option<f64>,
    pub time_signature: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub layout: Option<LayoutSpec>,
}

/// Read the frontmatter block, if the document opens with one.
///
/// The block must start on the first non-blank line and be closed by a
/// second `---` line.
pub fn extract(source: &str) -> Result<Option<Frontmatter>> {
    let mut lines = source.lines().enumerate().skip_while(|(_, l)| l.trim().is_empty());

    let opening_line = match lines.next() {
        Some((index, line)) if line.trim() == "---" => index + 1,
        _ => return Ok(None),
    };

    let mut content = String::new();
    for (_, line) in lines {
        if line.trim() == "---" {
            if content.trim().is_empty() {
                return Ok(Some(Frontmatter::default()));
            }
            let raw: Frontmatter = serde_yaml::from_str(&content)
                .map_err(|e| KalimbaError::MetadataError(e.to_string()))?;
            return Ok(Some(raw));
        }
        content.push_str(line);
        content.push('\n');
    }

    Err(KalimbaError::ParseError {
        line: opening_line,
        column: 1,
        message: "Frontmatter block opened with '---' is never closed".to_string(),
    })
}

/// Split a document into its frontmatter block (delimiters included,
/// verbatim) and the rest. The block is empty if the document has none or
/// never closes it.
pub fn split(source: &str) -> (&str, &str) {
    let mut offset = 0;
    let mut opened = false;
    for line in source.split_inclusive('\n') {
        offset += line.len();
        let trimmed = line.trim();
        if !opened {
            if trimmed.is_empty() {
                continue;
            }
            if trimmed != "---" {
                break;
            }
            opened = true;
        } else if trimmed == "---" {
            return source.split_at(offset);
        }
    }
    ("", source)
}
