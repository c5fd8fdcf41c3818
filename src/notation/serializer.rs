//! Timeline → tablature.
//!
//! Best-effort inverse of the parser: times are snapped to the grid, so
//! the text may differ from what was typed, but re-parsing it yields the same
//! `(key_index, time, duration)` multiset for anything the parser produced.

use std::collections::BTreeMap;

use super::{quantize_index, ParseOptions};
use crate::error::Result;
use crate::layout::Layout;
use crate::song::NoteEvent;

/// Render notes as tablature, one measure per line.
///
/// # Example
/// ```rust
/// use kalimba::layout::{generate_layout, ScaleKind};
/// use kalimba::notation::{parse, serialize, ParseOptions};
///
/// let layout = generate_layout(17, "C", ScaleKind::Major, 4).unwrap();
/// let options = ParseOptions::new(120.0, "4/4".parse().unwrap());
/// let notes = parse("1 (3 5) - 1° 2 3", &layout, &options).unwrap();
/// let text = serialize(&notes, &layout, &options).unwrap();
/// assert_eq!(text, "1 (3 5) - 1°\n2 3");
/// ```
pub fn serialize(notes: &[NoteEvent], layout: &Layout, options: &ParseOptions) -> Result<String> {
    options.validate()?;
    let step = options.grid_step();
    let beats_per_measure = options.time_signature.beats as u64;

    // (grid index, key index): members of a chord come out in physical order
    let mut placed: Vec<(u64, usize)> = notes
        .iter()
        .map(|n| (quantize_index(n.time, step), n.key_index))
        .collect();
    placed.sort_unstable();

    let mut groups: BTreeMap<u64, Vec<&str>> = BTreeMap::new();
    let mut skipped = 0usize;
    for (index, key_index) in placed {
        match layout.label(key_index) {
            Some(label) => groups.entry(index).or_default().push(label),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        log::warn!(
            "{} notes on keys without a tablature label were left out of the serialized text",
            skipped
        );
    }

    let last = match groups.keys().next_back() {
        Some(last) => *last,
        None => return Ok(String::new()),
    };

    let mut out = String::new();
    for index in 0..=last {
        if index > 0 {
            out.push(if index % beats_per_measure == 0 { '\n' } else { ' ' });
        }
        match groups.get(&index).map(Vec::as_slice) {
            None | Some([]) => out.push('-'),
            Some([single]) => out.push_str(single),
            Some(many) => {
                out.push('(');
                out.push_str(&many.join(" "));
                out.push(')');
            }
        }
    }
    Ok(out)
}
