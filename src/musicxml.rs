//! # MusicXML Export
//!
//! Writes a [`Song`] as a single-part MusicXML 4.0 score so it can be opened
//! in notation software.
//!
//! Every grid step becomes one beat-length note, chord or rest, and steps are
//! grouped into measures of `beats` steps. The last measure is padded with
//! rests. Pitches come from the tine each note is played on.

use std::collections::BTreeMap;

use quick_xml::escape::escape;

use crate::layout::Layout;
use crate::notation::{grid_step, quantize_index};
use crate::song::{NoteEvent, Song};

/// (step, alter) per pitch class, sharps only
const SPELLING: [(&str, i8); 12] = [
    ("C", 0),
    ("C", 1),
    ("D", 0),
    ("D", 1),
    ("E", 0),
    ("F", 0),
    ("F", 1),
    ("G", 0),
    ("G", 1),
    ("A", 0),
    ("A", 1),
    ("B", 0),
];

/// Convert a song to MusicXML
pub fn to_musicxml(song: &Song, layout: &Layout) -> String {
    let ts = song.time_signature;
    let step = grid_step(song.bpm, ts);
    let beats = u64::from(ts.beats.max(1));

    let mut grid: BTreeMap<u64, Vec<u8>> = BTreeMap::new();
    for note in &song.notes {
        match midi_of(note, layout) {
            Some(midi) => grid.entry(quantize_index(note.time, step)).or_default().push(midi),
            None => log::warn!(
                "Skipping note on key {}: not in layout '{}'",
                note.key_index,
                layout.name()
            ),
        }
    }
    for chord in grid.values_mut() {
        chord.sort_unstable();
        chord.dedup();
    }

    let total_steps = grid.keys().next_back().map_or(0, |last| last + 1);
    let measures = total_steps.div_ceil(beats).max(1);

    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(r#"<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 4.0 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd">"#);
    xml.push('\n');
    xml.push_str(r#"<score-partwise version="4.0">"#);
    xml.push('\n');

    if !song.title.is_empty() {
        xml.push_str("  <work>\n");
        xml.push_str(&format!("    <work-title>{}</work-title>\n", escape(song.title.as_str())));
        xml.push_str("  </work>\n");
    }
    if !song.artist.is_empty() {
        xml.push_str("  <identification>\n");
        xml.push_str(&format!(
            "    <creator type=\"composer\">{}</creator>\n",
            escape(song.artist.as_str())
        ));
        xml.push_str("  </identification>\n");
    }

    xml.push_str("  <part-list>\n");
    xml.push_str("    <score-part id=\"P1\">\n");
    xml.push_str(&format!("      <part-name>{}</part-name>\n", escape(layout.name())));
    xml.push_str("    </score-part>\n");
    xml.push_str("  </part-list>\n");

    xml.push_str("  <part id=\"P1\">\n");
    for measure in 0..measures {
        xml.push_str(&format!("    <measure number=\"{}\">\n", measure + 1));
        if measure == 0 {
            xml.push_str(&attributes_xml(song));
        }
        for index in measure * beats..(measure + 1) * beats {
            match grid.get(&index) {
                Some(chord) => {
                    for (i, midi) in chord.iter().enumerate() {
                        xml.push_str(&note_xml(*midi, i > 0, ts.beat_type));
                    }
                }
                None => xml.push_str(&rest_xml(ts.beat_type)),
            }
        }
        xml.push_str("    </measure>\n");
    }
    xml.push_str("  </part>\n");
    xml.push_str("</score-partwise>\n");

    xml
}

fn midi_of(note: &NoteEvent, layout: &Layout) -> Option<u8> {
    layout.key(note.key_index).map(|k| k.midi)
}

/// Divisions per quarter equal the beat type, so one beat is always 4
const BEAT_DIVISIONS: u32 = 4;

fn attributes_xml(song: &Song) -> String {
    let ts = song.time_signature;
    let mut xml = String::new();
    xml.push_str("      <attributes>\n");
    xml.push_str(&format!("        <divisions>{}</divisions>\n", ts.beat_type));
    xml.push_str("        <time>\n");
    xml.push_str(&format!("          <beats>{}</beats>\n", ts.beats));
    xml.push_str(&format!("          <beat-type>{}</beat-type>\n", ts.beat_type));
    xml.push_str("        </time>\n");
    xml.push_str("        <clef>\n");
    xml.push_str("          <sign>G</sign>\n");
    xml.push_str("          <line>2</line>\n");
    xml.push_str("        </clef>\n");
    xml.push_str("      </attributes>\n");
    xml.push_str("      <direction placement=\"above\">\n");
    xml.push_str("        <direction-type>\n");
    xml.push_str(&format!(
        "          <metronome><beat-unit>quarter</beat-unit><per-minute>{}</per-minute></metronome>\n",
        (song.bpm * 4.0 / f64::from(ts.beat_type)).round()
    ));
    xml.push_str("        </direction-type>\n");
    xml.push_str("      </direction>\n");
    xml
}

fn note_xml(midi: u8, in_chord: bool, beat_type: u8) -> String {
    let (step, alter) = SPELLING[usize::from(midi % 12)];
    let octave = i32::from(midi / 12) - 1;

    let mut xml = String::new();
    xml.push_str("      <note>\n");
    if in_chord {
        xml.push_str("        <chord/>\n");
    }
    xml.push_str("        <pitch>\n");
    xml.push_str(&format!("          <step>{}</step>\n", step));
    if alter != 0 {
        xml.push_str(&format!("          <alter>{}</alter>\n", alter));
    }
    xml.push_str(&format!("          <octave>{}</octave>\n", octave));
    xml.push_str("        </pitch>\n");
    xml.push_str(&format!("        <duration>{}</duration>\n", BEAT_DIVISIONS));
    if let Some(kind) = note_type(beat_type) {
        xml.push_str(&format!("        <type>{}</type>\n", kind));
    }
    if alter > 0 {
        xml.push_str("        <accidental>sharp</accidental>\n");
    }
    xml.push_str("      </note>\n");
    xml
}

fn rest_xml(beat_type: u8) -> String {
    let mut xml = String::new();
    xml.push_str("      <note>\n");
    xml.push_str("        <rest/>\n");
    xml.push_str(&format!("        <duration>{}</duration>\n", BEAT_DIVISIONS));
    if let Some(kind) = note_type(beat_type) {
        xml.push_str(&format!("        <type>{}</type>\n", kind));
    }
    xml.push_str("      </note>\n");
    xml
}

fn note_type(beat_type: u8) -> Option<&'static str> {
    match beat_type {
        1 => Some("whole"),
        2 => Some("half"),
        4 => Some("quarter"),
        8 => Some("eighth"),
        16 => Some("16th"),
        32 => Some("32nd"),
        _ => None,
    }
}
