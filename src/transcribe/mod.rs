//! Speech-to-text collaborator.
//!
//! The pipeline consumes transcription through the [`SpeechToText`] trait;
//! the shipped implementation wraps whisper.cpp via `whisper-rs`.

mod whisper;

pub use whisper::{WhisperError, WhisperModel, WhisperTranscriber, download_model, model_path};

use serde::{Deserialize, Serialize};

/// A transcribed span with absolute timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Transcribed text (may be empty after trimming)
    pub text: String,
}

/// Full transcription output for one recording.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcription {
    /// Aggregate transcript text
    pub text: String,
    /// Chronological, non-overlapping segments
    pub segments: Vec<TranscriptSegment>,
}

/// Black-box transcription collaborator.
pub trait SpeechToText {
    /// Transcribe 16 kHz mono samples normalized to [-1.0, 1.0].
    fn transcribe(&mut self, samples: &[f32]) -> anyhow::Result<Transcription>;
}
