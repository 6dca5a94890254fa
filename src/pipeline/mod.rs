//! Request orchestration.
//!
//! Sequences transcode -> diarize -> transcribe -> normalize -> align ->
//! coalesce over a single recording, converting collaborator failures into
//! the result's `error` field instead of propagating them to the caller.

mod registry;

pub use registry::{DiarizerFactory, ModelRegistry, TranscriberFactory};

use anyhow::Context as _;
use serde::Serialize;
use std::path::Path;
use tracing::{error, info, warn};

use crate::audio::{self, AudioBuffer};
use crate::dialogue::{
    DialogueTurn, UNKNOWN_SPEAKER, align_segments, coalesce_dialogue, speaker_label,
};
use crate::diarize::{self, DiarizationTurn};
use crate::normalize::{Normalized, RuleNormalizer, TextNormalizer};
use crate::transcribe::{TranscriptSegment, WhisperModel};

/// Top-level pipeline output, always returned even on failure.
///
/// When `error` is set the other fields hold whatever was populated before
/// the failing stage and are best-effort only.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessingResult {
    /// Speaker-attributed dialogue turns
    pub dialogue: Vec<DialogueTurn>,
    /// Aggregate transcript text
    pub full_transcript: Option<String>,
    /// Normalized transcript text, or a diagnostic placeholder when the
    /// normalization pass degraded
    pub processed_text: Option<String>,
    /// Human-readable cause of a fatal stage failure
    pub error: Option<String>,
}

/// Synchronous single-request pipeline over injected model collaborators.
pub struct Pipeline {
    registry: ModelRegistry,
    normalizer: Box<dyn TextNormalizer>,
}

impl Pipeline {
    pub fn new(registry: ModelRegistry) -> Self {
        Self {
            registry,
            normalizer: Box::new(RuleNormalizer::default()),
        }
    }

    pub fn with_normalizer(mut self, normalizer: Box<dyn TextNormalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Process one recording into a [`ProcessingResult`].
    ///
    /// Never fails across this boundary: stage errors land in the result's
    /// `error` field so callers can persist a failed-state record.
    pub fn process(&mut self, input: &Path, requested_model: &str) -> ProcessingResult {
        let model = WhisperModel::from_request(requested_model);
        let started = std::time::Instant::now();

        info!("--- Starting audio processing for {:?} ---", input);

        let mut result = ProcessingResult::default();
        if let Err(e) = self.run(input, model, &mut result) {
            error!("Audio processing failed: {:#}", e);
            result.error = Some(format!("{:#}", e));
        }

        info!(
            "--- Finished audio processing in {:.2}s ---",
            started.elapsed().as_secs_f32()
        );

        result
    }

    fn run(
        &mut self,
        input: &Path,
        model: WhisperModel,
        result: &mut ProcessingResult,
    ) -> anyhow::Result<()> {
        // Temp WAV is removed when the guard drops, on every exit path
        let wav = audio::transcode_to_pipeline_wav(input).context("Audio conversion failed")?;
        let buffer = audio::load_wav(wav.path()).context("Failed to load converted audio")?;
        info!("Prepared {:.1}s of audio", buffer.duration_secs());

        self.run_models(&buffer, model, result)
    }

    /// Model-driven stages, separated from transcoding so they can run on
    /// prepared samples directly.
    fn run_models(
        &mut self,
        buffer: &AudioBuffer,
        model: WhisperModel,
        result: &mut ProcessingResult,
    ) -> anyhow::Result<()> {
        let mut turns = self
            .registry
            .diarizer()?
            .diarize(&buffer.samples, buffer.sample_rate)
            .context("Diarization failed")?;
        turns.sort_by(|a, b| a.start.total_cmp(&b.start));

        let unique_speakers = diarize::unique_speaker_ids(&turns);
        info!(
            "Diarization found {} speakers: {:?}",
            unique_speakers.len(),
            unique_speakers
        );

        let transcription = self
            .registry
            .transcriber(model)?
            .transcribe(&buffer.samples_f32())
            .context("Transcription failed")?;

        let full_transcript = transcription.text.trim().to_string();
        if !full_transcript.is_empty() {
            result.full_transcript = Some(full_transcript.clone());
        }

        // Normalization is non-fatal: a degraded pass records its
        // placeholder and the request continues
        if !full_transcript.is_empty() {
            match self.normalizer.normalize(&full_transcript) {
                Normalized::Clean(text) => result.processed_text = Some(text),
                Normalized::Degraded { placeholder, cause } => {
                    warn!("Text normalization degraded: {}", cause);
                    result.processed_text = Some(placeholder);
                }
            }
        }

        result.dialogue = combine(
            &turns,
            &transcription.segments,
            &unique_speakers,
            result.full_transcript.as_deref(),
        );

        if result.dialogue.is_empty() {
            info!("No dialogue produced (empty transcription)");
        }

        Ok(())
    }
}

/// Align and coalesce when both inputs are present; otherwise fall back to a
/// single "Unknown" turn carrying the full transcript, or an empty dialogue
/// when there is no transcript text at all.
fn combine(
    turns: &[DiarizationTurn],
    segments: &[TranscriptSegment],
    unique_speakers: &[String],
    full_transcript: Option<&str>,
) -> Vec<DialogueTurn> {
    if !turns.is_empty() && !segments.is_empty() {
        let aligned = align_segments(segments, turns, |id| speaker_label(id, unique_speakers));
        return coalesce_dialogue(&aligned);
    }

    match full_transcript {
        Some(text) if !text.is_empty() => vec![DialogueTurn {
            speaker: UNKNOWN_SPEAKER.to_string(),
            text: text.to_string(),
        }],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::PIPELINE_SAMPLE_RATE;
    use crate::diarize::Diarizer;
    use crate::normalize::Normalized;
    use crate::transcribe::{SpeechToText, Transcription};

    struct FixedDiarizer(Vec<DiarizationTurn>);

    impl Diarizer for FixedDiarizer {
        fn diarize(&mut self, _: &[i16], _: u32) -> anyhow::Result<Vec<DiarizationTurn>> {
            Ok(self.0.clone())
        }
    }

    struct FailingDiarizer;

    impl Diarizer for FailingDiarizer {
        fn diarize(&mut self, _: &[i16], _: u32) -> anyhow::Result<Vec<DiarizationTurn>> {
            Err(anyhow::anyhow!("segmentation model crashed"))
        }
    }

    struct FixedStt(Transcription);

    impl SpeechToText for FixedStt {
        fn transcribe(&mut self, _: &[f32]) -> anyhow::Result<Transcription> {
            Ok(self.0.clone())
        }
    }

    struct FailingNormalizer;

    impl TextNormalizer for FailingNormalizer {
        fn normalize(&self, _: &str) -> Normalized {
            Normalized::Degraded {
                placeholder: "[preprocessing unavailable]".to_string(),
                cause: "nlp model missing".to_string(),
            }
        }
    }

    fn turn(speaker_id: &str, start: f64, end: f64) -> DiarizationTurn {
        DiarizationTurn {
            speaker_id: speaker_id.to_string(),
            start,
            end,
        }
    }

    fn segment(start: f64, end: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            start,
            end,
            text: text.to_string(),
        }
    }

    fn transcription(text: &str, segments: Vec<TranscriptSegment>) -> Transcription {
        Transcription {
            text: text.to_string(),
            segments,
        }
    }

    fn buffer() -> AudioBuffer {
        AudioBuffer {
            samples: vec![0i16; PIPELINE_SAMPLE_RATE as usize],
            sample_rate: PIPELINE_SAMPLE_RATE,
        }
    }

    fn pipeline_with(
        turns: Vec<DiarizationTurn>,
        transcription_result: Transcription,
    ) -> Pipeline {
        let registry = ModelRegistry::new(
            Box::new(move || Ok(Box::new(FixedDiarizer(turns.clone())) as Box<dyn Diarizer>)),
            Box::new(move |_| {
                Ok(Box::new(FixedStt(transcription_result.clone())) as Box<dyn SpeechToText>)
            }),
        );
        Pipeline::new(registry)
    }

    fn run(pipeline: &mut Pipeline) -> ProcessingResult {
        let mut result = ProcessingResult::default();
        if let Err(e) = pipeline.run_models(&buffer(), WhisperModel::Small, &mut result) {
            result.error = Some(format!("{:#}", e));
        }
        result
    }

    #[test]
    fn test_full_pipeline_aligns_and_coalesces() {
        let mut pipeline = pipeline_with(
            vec![turn("S1", 0.0, 5.0), turn("S2", 5.0, 10.0)],
            transcription(
                "hello world foo",
                vec![
                    segment(0.0, 4.0, "hello"),
                    segment(4.5, 6.0, "world"),
                    segment(6.5, 9.0, "foo"),
                ],
            ),
        );

        let result = run(&mut pipeline);

        assert_eq!(result.error, None);
        assert_eq!(result.full_transcript.as_deref(), Some("hello world foo"));
        assert_eq!(
            result.dialogue,
            vec![
                DialogueTurn {
                    speaker: "A".to_string(),
                    text: "hello".to_string(),
                },
                DialogueTurn {
                    speaker: "B".to_string(),
                    text: "world foo".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_no_turns_falls_back_to_unknown() {
        // Scenario: diarization produced nothing, transcript text exists
        let mut pipeline = pipeline_with(
            Vec::new(),
            transcription("hi there", vec![segment(0.0, 1.0, "hi there")]),
        );

        let result = run(&mut pipeline);

        assert_eq!(result.error, None);
        assert_eq!(
            result.dialogue,
            vec![DialogueTurn {
                speaker: UNKNOWN_SPEAKER.to_string(),
                text: "hi there".to_string(),
            }]
        );
    }

    #[test]
    fn test_no_segments_and_no_text_is_empty_not_error() {
        let mut pipeline = pipeline_with(
            vec![turn("S1", 0.0, 5.0)],
            transcription("", Vec::new()),
        );

        let result = run(&mut pipeline);

        assert_eq!(result.error, None);
        assert!(result.dialogue.is_empty());
        assert_eq!(result.full_transcript, None);
    }

    #[test]
    fn test_diarization_failure_is_fatal() {
        let registry = ModelRegistry::new(
            Box::new(|| Ok(Box::new(FailingDiarizer) as Box<dyn Diarizer>)),
            Box::new(|_| {
                Ok(Box::new(FixedStt(Transcription::default())) as Box<dyn SpeechToText>)
            }),
        );
        let mut pipeline = Pipeline::new(registry);

        let result = run(&mut pipeline);

        let error = result.error.expect("diarization failure must set error");
        assert!(error.contains("Diarization failed"));
        assert!(result.dialogue.is_empty());
    }

    #[test]
    fn test_degraded_normalization_is_not_fatal() {
        let mut pipeline = pipeline_with(
            vec![turn("S1", 0.0, 5.0)],
            transcription("some words", vec![segment(0.0, 2.0, "some words")]),
        )
        .with_normalizer(Box::new(FailingNormalizer));

        let result = run(&mut pipeline);

        assert_eq!(result.error, None);
        assert_eq!(
            result.processed_text.as_deref(),
            Some("[preprocessing unavailable]")
        );
        assert!(!result.dialogue.is_empty());
    }

    #[test]
    fn test_process_missing_input_reports_conversion_error() {
        let mut pipeline = pipeline_with(Vec::new(), Transcription::default());

        let result = pipeline.process(Path::new("no/such/recording.mp3"), "small");

        let error = result.error.expect("missing input must set error");
        assert!(error.contains("Audio conversion failed"));
        assert!(result.dialogue.is_empty());
        assert_eq!(result.full_transcript, None);
    }

    #[test]
    fn test_combine_unsorted_turns_are_sorted_by_pipeline() {
        // Turns arrive out of order from the stub; run_models sorts them
        let mut pipeline = pipeline_with(
            vec![turn("S2", 5.0, 10.0), turn("S1", 0.0, 5.0)],
            transcription("a b", vec![segment(0.0, 2.0, "a"), segment(6.0, 8.0, "b")]),
        );

        let result = run(&mut pipeline);

        assert_eq!(result.dialogue[0].speaker, "A");
        assert_eq!(result.dialogue[1].speaker, "B");
    }
}
