use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::{SpeechToText, TranscriptSegment, Transcription};
use crate::models;

/// Available Whisper model sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhisperModel {
    Tiny,
    Base,
    Small,
    Medium,
    Large,
}

impl WhisperModel {
    /// Default size when the caller's request is missing or invalid.
    pub const DEFAULT: WhisperModel = WhisperModel::Small;

    /// Get the Hugging Face URL for this model
    pub fn hf_url(&self) -> &'static str {
        match self {
            WhisperModel::Tiny => {
                "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-tiny.bin"
            }
            WhisperModel::Base => {
                "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-base.bin"
            }
            WhisperModel::Small => {
                "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-small.bin"
            }
            WhisperModel::Medium => {
                "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-medium.bin"
            }
            WhisperModel::Large => {
                "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-large-v3.bin"
            }
        }
    }

    /// Get the filename for this model
    pub fn filename(&self) -> &'static str {
        match self {
            WhisperModel::Tiny => "ggml-tiny.bin",
            WhisperModel::Base => "ggml-base.bin",
            WhisperModel::Small => "ggml-small.bin",
            WhisperModel::Medium => "ggml-medium.bin",
            WhisperModel::Large => "ggml-large-v3.bin",
        }
    }

    /// Get approximate model size in MB
    pub fn size_mb(&self) -> u64 {
        match self {
            WhisperModel::Tiny => 75,
            WhisperModel::Base => 142,
            WhisperModel::Small => 466,
            WhisperModel::Medium => 1500,
            WhisperModel::Large => 3100,
        }
    }

    /// Parse a caller-supplied size, degrading to [`Self::DEFAULT`] with a
    /// warning instead of erroring on unknown values.
    pub fn from_request(s: &str) -> Self {
        match s.parse() {
            Ok(model) => model,
            Err(_) => {
                warn!(
                    "Invalid whisper model size '{}', defaulting to '{}'",
                    s,
                    Self::DEFAULT
                );
                Self::DEFAULT
            }
        }
    }
}

impl std::fmt::Display for WhisperModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WhisperModel::Tiny => write!(f, "tiny"),
            WhisperModel::Base => write!(f, "base"),
            WhisperModel::Small => write!(f, "small"),
            WhisperModel::Medium => write!(f, "medium"),
            WhisperModel::Large => write!(f, "large"),
        }
    }
}

impl FromStr for WhisperModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tiny" => Ok(WhisperModel::Tiny),
            "base" => Ok(WhisperModel::Base),
            "small" => Ok(WhisperModel::Small),
            "medium" => Ok(WhisperModel::Medium),
            "large" => Ok(WhisperModel::Large),
            _ => Err(format!(
                "Unknown model: {}. Use tiny, base, small, medium, or large",
                s
            )),
        }
    }
}

#[derive(Error, Debug)]
pub enum WhisperError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Download(#[from] models::DownloadError),
    #[error("Failed to initialize Whisper: {0}")]
    Init(String),
    #[error("Transcription failed: {0}")]
    Transcription(String),
}

/// Get the path to a specific model file
pub fn model_path(model: WhisperModel) -> PathBuf {
    models::cache_dir().join("whisper").join(model.filename())
}

/// Download a Whisper model from Hugging Face unless already cached.
pub fn download_model(model: WhisperModel) -> Result<PathBuf, WhisperError> {
    let path = model_path(model);
    models::ensure_downloaded(model.hf_url(), &path, model.size_mb())?;
    Ok(path)
}

/// Whisper.cpp transcriber.
pub struct WhisperTranscriber {
    ctx: WhisperContext,
    model: WhisperModel,
    /// Number of threads to use
    n_threads: i32,
}

impl WhisperTranscriber {
    pub fn new(model: WhisperModel) -> Result<Self, WhisperError> {
        let path = download_model(model)?;

        info!("Loading Whisper {} model...", model);
        let start = std::time::Instant::now();

        let ctx = WhisperContext::new_with_params(
            path.to_str().unwrap_or_default(),
            WhisperContextParameters::default(),
        )
        .map_err(|e| WhisperError::Init(format!("Failed to load model: {}", e)))?;

        // Use available CPU threads (leave 1 for system)
        let n_threads = std::thread::available_parallelism()
            .map(|p| (p.get() as i32 - 1).max(1))
            .unwrap_or(4);

        info!(
            "Whisper {} model loaded in {:.2}s (using {} threads)",
            model,
            start.elapsed().as_secs_f32(),
            n_threads
        );

        Ok(Self {
            ctx,
            model,
            n_threads,
        })
    }

    /// The model this transcriber was loaded with
    pub fn model(&self) -> WhisperModel {
        self.model
    }
}

impl SpeechToText for WhisperTranscriber {
    fn transcribe(&mut self, samples: &[f32]) -> anyhow::Result<Transcription> {
        let start_time = std::time::Instant::now();
        let audio_secs = samples.len() as f32 / 16000.0;

        info!("Running transcription on {:.1}s of audio", audio_secs);

        // Greedy sampling for speed (beam search is 2-3x slower)
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        params.set_n_threads(self.n_threads);
        params.set_token_timestamps(false);
        params.set_language(Some("en"));
        params.set_translate(false);

        // Hallucination guards
        params.set_no_speech_thold(0.6);
        params.set_entropy_thold(2.4);
        params.set_logprob_thold(-1.0);
        params.set_temperature(0.0);
        params.set_temperature_inc(0.2);
        params.set_suppress_non_speech_tokens(true);

        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_print_special(false);

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| WhisperError::Transcription(format!("Failed to create state: {}", e)))?;

        state
            .full(params, samples)
            .map_err(|e| WhisperError::Transcription(format!("Inference failed: {}", e)))?;

        let num_segments = state
            .full_n_segments()
            .map_err(|e| WhisperError::Transcription(format!("Failed to get segments: {}", e)))?;

        let mut segments = Vec::new();
        let mut full_text = String::new();

        for i in 0..num_segments {
            let start_ts = state
                .full_get_segment_t0(i)
                .map_err(|e| WhisperError::Transcription(format!("Failed to get start time: {}", e)))?;
            let end_ts = state
                .full_get_segment_t1(i)
                .map_err(|e| WhisperError::Transcription(format!("Failed to get end time: {}", e)))?;
            let text = state
                .full_get_segment_text(i)
                .map_err(|e| WhisperError::Transcription(format!("Failed to get text: {}", e)))?;

            let text = text.trim().to_string();

            // Timestamps are in centiseconds (1/100 second)
            let segment = TranscriptSegment {
                start: start_ts as f64 / 100.0,
                end: end_ts as f64 / 100.0,
                text: text.clone(),
            };

            if !text.is_empty() {
                if !full_text.is_empty() {
                    full_text.push(' ');
                }
                full_text.push_str(&text);
            }

            // Empty segments stay: they still carry timing for alignment
            segments.push(segment);
        }

        let elapsed = start_time.elapsed();
        info!(
            "Transcription finished in {:.1}s ({:.1}x realtime): {} segments",
            elapsed.as_secs_f32(),
            audio_secs / elapsed.as_secs_f32(),
            segments.len()
        );

        Ok(Transcription {
            text: full_text,
            segments,
        })
    }
}
