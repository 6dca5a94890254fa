//! Speaker-attributed dialogue assembly.
//!
//! Joins diarization turns with transcript segments and merges adjacent
//! same-speaker segments into dialogue turns.

pub mod align;
pub mod label;

pub use align::{AlignedSegment, UNKNOWN_SPEAKER, align_segments, coalesce_dialogue};
pub use label::speaker_label;

use serde::{Deserialize, Serialize};
use std::fmt::Write as FmtWrite;

/// One turn of the final dialogue: a speaker label and everything they said
/// before the speaker changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueTurn {
    /// Letter label ("A", "B", ...), "Unknown", or the raw diarization id
    /// when labels ran out
    pub speaker: String,
    /// Concatenated segment text
    pub text: String,
}

/// Render a dialogue as plain text, one turn per line.
pub fn render_dialogue(dialogue: &[DialogueTurn]) -> String {
    let mut output = String::new();
    for turn in dialogue {
        let _ = writeln!(output, "{}: {}", turn.speaker, turn.text);
    }
    output
}
