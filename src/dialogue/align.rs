//! Temporal alignment of transcript segments to diarization turns.
//!
//! Each segment is attributed to the first diarization turn (in ascending
//! start order) whose interval contains the segment's midpoint. Consecutive
//! segments from the same speaker are then coalesced into dialogue turns.

use super::DialogueTurn;
use crate::diarize::DiarizationTurn;
use crate::transcribe::TranscriptSegment;

/// Sentinel speaker for segments whose midpoint falls outside every turn.
pub const UNKNOWN_SPEAKER: &str = "Unknown";

/// A transcript segment with its assigned speaker, ready for coalescing.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSegment {
    pub speaker: String,
    pub text: String,
}

/// Assign a speaker to every transcript segment, preserving segment order.
///
/// `turns` must be sorted ascending by start. The containment test is
/// inclusive-start, exclusive-end: a midpoint exactly on a boundary belongs
/// to the turn that starts there, never to the turn that ends there. When
/// overlapping turns both contain a midpoint, the earlier-starting turn wins
/// (first match, not best match).
pub fn align_segments<F>(
    segments: &[TranscriptSegment],
    turns: &[DiarizationTurn],
    labeler: F,
) -> Vec<AlignedSegment>
where
    F: Fn(&str) -> String,
{
    segments
        .iter()
        .map(|segment| {
            let midpoint = segment.start + (segment.end - segment.start) / 2.0;
            let speaker = turns
                .iter()
                .find(|turn| turn.start <= midpoint && midpoint < turn.end)
                .map(|turn| labeler(&turn.speaker_id))
                .unwrap_or_else(|| UNKNOWN_SPEAKER.to_string());

            AlignedSegment {
                speaker,
                text: segment.text.trim().to_string(),
            }
        })
        .collect()
}

/// Merge consecutive same-speaker segments into dialogue turns.
///
/// Text from a continuing speaker is appended with a single space. A turn is
/// flushed when the speaker changes, and only when its accumulated text is
/// non-empty, so runs of empty segments never produce empty turns.
pub fn coalesce_dialogue(aligned: &[AlignedSegment]) -> Vec<DialogueTurn> {
    let mut dialogue = Vec::new();
    let mut current_speaker: Option<String> = None;
    let mut current_text = String::new();

    for segment in aligned {
        if current_speaker.as_deref() == Some(segment.speaker.as_str()) {
            current_text.push(' ');
            current_text.push_str(&segment.text);
        } else {
            if let Some(speaker) = current_speaker.take() {
                if !current_text.is_empty() {
                    dialogue.push(DialogueTurn {
                        speaker,
                        text: current_text.clone(),
                    });
                }
            }
            current_speaker = Some(segment.speaker.clone());
            current_text = segment.text.clone();
        }
    }

    if let Some(speaker) = current_speaker {
        if !current_text.is_empty() {
            dialogue.push(DialogueTurn {
                speaker,
                text: current_text,
            });
        }
    }

    dialogue
}
