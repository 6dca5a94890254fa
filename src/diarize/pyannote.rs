use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

use anyhow::anyhow;
use pyannote_rs::{EmbeddingExtractor, EmbeddingManager};

use super::{DiarizationTurn, Diarizer};
use crate::models;

/// Official pyannote-rs model releases, compatible with pyannote-rs 0.3.x
const SEGMENTATION_MODEL_URL: &str =
    "https://github.com/thewh1teagle/pyannote-rs/releases/download/v0.1.0/segmentation-3.0.onnx";
const EMBEDDING_MODEL_URL: &str =
    "https://github.com/thewh1teagle/pyannote-rs/releases/download/v0.1.0/wespeaker_en_voxceleb_CAM++.onnx";

const SEGMENTATION_MODEL_MB: u64 = 6;
const EMBEDDING_MODEL_MB: u64 = 28;

/// Upper bound on distinct speakers tracked per recording
const MAX_SPEAKERS: usize = 26;

/// Cosine-similarity threshold for matching a segment to a known speaker
const SEARCH_THRESHOLD: f32 = 0.5;

/// Segments shorter than this carry too little signal for a reliable
/// embedding (0.5s at 16kHz)
const MIN_SAMPLES_FOR_EMBEDDING: usize = 8000;

#[derive(Error, Debug)]
pub enum DiarizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Download(#[from] models::DownloadError),
    #[error("Failed to initialize diarization: {0}")]
    Init(String),
}

fn segmentation_model_path() -> PathBuf {
    models::cache_dir()
        .join("diarization")
        .join("segmentation-3.0.onnx")
}

fn embedding_model_path() -> PathBuf {
    models::cache_dir()
        .join("diarization")
        .join("wespeaker_en_voxceleb_CAM++.onnx")
}

/// Download the segmentation and embedding models unless already cached.
pub fn download_diarization_models() -> Result<(PathBuf, PathBuf), DiarizeError> {
    let segmentation = segmentation_model_path();
    let embedding = embedding_model_path();

    models::ensure_downloaded(SEGMENTATION_MODEL_URL, &segmentation, SEGMENTATION_MODEL_MB)?;
    models::ensure_downloaded(EMBEDDING_MODEL_URL, &embedding, EMBEDDING_MODEL_MB)?;

    Ok((segmentation, embedding))
}

/// Diarizer backed by pyannote-rs segmentation and speaker embeddings.
pub struct PyannoteDiarizer {
    segmentation_model: PathBuf,
    embedding_extractor: EmbeddingExtractor,
}

impl PyannoteDiarizer {
    pub fn new() -> Result<Self, DiarizeError> {
        let (segmentation_model, embedding_model) = download_diarization_models()?;

        info!("Initializing diarization models");
        let start = std::time::Instant::now();

        // pyannote-rs uses eyre internally; flatten to our error type
        let embedding_extractor = EmbeddingExtractor::new(&embedding_model)
            .map_err(|e| DiarizeError::Init(format!("Failed to create embedding extractor: {}", e)))?;

        info!(
            "Diarization models loaded in {:.2}s",
            start.elapsed().as_secs_f32()
        );

        Ok(Self {
            segmentation_model,
            embedding_extractor,
        })
    }
}

impl Diarizer for PyannoteDiarizer {
    fn diarize(
        &mut self,
        samples: &[i16],
        sample_rate: u32,
    ) -> anyhow::Result<Vec<DiarizationTurn>> {
        info!(
            "Running diarization on {} samples at {} Hz",
            samples.len(),
            sample_rate
        );

        // Fresh speaker memory per recording; ids are scoped to one request
        let mut embedding_manager = EmbeddingManager::new(MAX_SPEAKERS);

        let segments = pyannote_rs::get_segments(samples, sample_rate, &self.segmentation_model)
            .map_err(|e| anyhow!("Failed to run segmentation: {}", e))?;

        let mut turns = Vec::new();

        for segment in segments {
            let segment = match segment {
                Ok(s) => s,
                Err(e) => {
                    warn!("Skipping unreadable segment: {}", e);
                    continue;
                }
            };

            if segment.samples.len() < MIN_SAMPLES_FOR_EMBEDDING {
                continue;
            }

            let embedding: Vec<f32> = match self.embedding_extractor.compute(&segment.samples) {
                Ok(values) => values.collect(),
                Err(e) => {
                    warn!(
                        "Failed to compute embedding for {:.2}-{:.2}: {}",
                        segment.start, segment.end, e
                    );
                    continue;
                }
            };

            // Match against known speakers, falling back to the nearest one
            // once capacity is reached
            let speaker_index = embedding_manager
                .search_speaker(embedding.clone(), SEARCH_THRESHOLD)
                .or_else(|| embedding_manager.search_speaker(embedding, 0.0))
                .unwrap_or(0);

            turns.push(DiarizationTurn {
                speaker_id: format!("SPEAKER_{:02}", speaker_index),
                start: segment.start,
                end: segment.end,
            });
        }

        turns.sort_by(|a, b| a.start.total_cmp(&b.start));

        info!("Diarization produced {} turns", turns.len());

        Ok(turns)
    }
}
