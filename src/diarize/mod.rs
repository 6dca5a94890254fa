//! Speaker diarization collaborator.
//!
//! The pipeline consumes diarization through the [`Diarizer`] trait; the
//! shipped implementation uses `pyannote-rs` (segmentation + speaker
//! embedding, ONNX).

mod pyannote;

pub use pyannote::{DiarizeError, PyannoteDiarizer, download_diarization_models};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One diarization interval: who spoke, when.
///
/// Invariant: `start < end`. A turn set for a recording need not be
/// contiguous or non-overlapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiarizationTurn {
    /// Opaque speaker identifier (e.g. "SPEAKER_00")
    pub speaker_id: String,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
}

/// Black-box diarization collaborator.
pub trait Diarizer {
    /// Diarize 16-bit PCM samples; returned turns are sorted ascending by
    /// start time.
    fn diarize(&mut self, samples: &[i16], sample_rate: u32)
    -> anyhow::Result<Vec<DiarizationTurn>>;
}

/// The lexicographically sorted set of unique speaker ids in a turn set.
///
/// Label assignment depends only on this list, never on the order turns
/// appear in the diarization output.
pub fn unique_speaker_ids(turns: &[DiarizationTurn]) -> Vec<String> {
    turns
        .iter()
        .map(|t| t.speaker_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(speaker_id: &str, start: f64) -> DiarizationTurn {
        DiarizationTurn {
            speaker_id: speaker_id.to_string(),
            start,
            end: start + 1.0,
        }
    }

    #[test]
    fn test_unique_speaker_ids_sorted_and_deduped() {
        let turns = vec![turn("S2", 0.0), turn("S1", 1.0), turn("S2", 2.0)];

        assert_eq!(unique_speaker_ids(&turns), vec!["S1", "S2"]);
    }

    #[test]
    fn test_unique_speaker_ids_ignores_turn_order() {
        let forward = vec![turn("S1", 0.0), turn("S3", 1.0), turn("S2", 2.0)];
        let reversed: Vec<_> = forward.iter().rev().cloned().collect();

        assert_eq!(unique_speaker_ids(&forward), unique_speaker_ids(&reversed));
    }

    #[test]
    fn test_unique_speaker_ids_empty() {
        assert!(unique_speaker_ids(&[]).is_empty());
    }
}
