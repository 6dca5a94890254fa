//! Audio normalization and loading.
//!
//! Transcodes arbitrary input audio to the 16 kHz mono WAV layout both
//! models consume, with a scoped temp file that is removed on every exit
//! path.

use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{info, warn};

/// Sample rate both the diarization and transcription models expect.
pub const PIPELINE_SAMPLE_RATE: u32 = 16000;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Input audio not found: {0}")]
    InputNotFound(PathBuf),
    #[error("ffmpeg not found on PATH")]
    FfmpegNotFound,
    #[error("ffmpeg conversion failed: {0}")]
    Conversion(String),
    #[error("Failed to read WAV: {0}")]
    Wav(#[from] hound::Error),
}

/// A transcoded WAV with scoped lifetime.
///
/// The file is removed on drop, so cleanup runs whether the pipeline
/// succeeded, failed, or degraded.
#[derive(Debug)]
pub struct TempWav {
    path: PathBuf,
}

impl TempWav {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempWav {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => info!("Removed temporary file {:?}", self.path),
            Err(e) => warn!("Failed to remove {:?}: {}", self.path, e),
        }
    }
}

/// Decoded audio ready for the models.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// 16-bit PCM samples (diarization input)
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Samples normalized to [-1.0, 1.0] (whisper input).
    pub fn samples_f32(&self) -> Vec<f32> {
        self.samples.iter().map(|&s| s as f32 / 32768.0).collect()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Build a per-request unique sibling path for the transcoded WAV, so
/// concurrent requests over the same input never collide.
fn temp_wav_path(input: &Path) -> PathBuf {
    static COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio");
    let nonce = format!(
        "{}_{}_{}",
        std::process::id(),
        chrono::Utc::now().timestamp_micros(),
        COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
    );

    input.with_file_name(format!("{}_{}_16k_mono.wav", stem, nonce))
}

/// Transcode the input to 16 kHz mono WAV via ffmpeg.
///
/// Returns a [`TempWav`] guard owning the output file.
pub fn transcode_to_pipeline_wav(input: &Path) -> Result<TempWav, AudioError> {
    if !input.exists() {
        return Err(AudioError::InputNotFound(input.to_path_buf()));
    }

    let output = temp_wav_path(input);
    info!("Converting {:?} to {:?} (16kHz mono WAV)", input, output);

    let result = Command::new("ffmpeg")
        .arg("-i")
        .arg(input)
        .arg("-ar")
        .arg(PIPELINE_SAMPLE_RATE.to_string())
        .arg("-ac")
        .arg("1")
        .arg("-y")
        .arg(&output)
        .output();

    let command_output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AudioError::FfmpegNotFound);
        }
        Err(e) => return Err(AudioError::Io(e)),
    };

    if !command_output.status.success() {
        let stderr = String::from_utf8_lossy(&command_output.stderr);
        // The useful diagnostic is at the end of ffmpeg's stderr
        let tail: String = stderr
            .lines()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<Vec<_>>()
            .join("\n");
        return Err(AudioError::Conversion(tail));
    }

    info!("Conversion successful");

    Ok(TempWav { path: output })
}

/// Load a 16-bit PCM or float WAV into an [`AudioBuffer`].
pub fn load_wav(path: &Path) -> Result<AudioBuffer, AudioError> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<i16> = match spec.sample_format {
        hound::SampleFormat::Int => reader.samples::<i16>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(|s| (s.clamp(-1.0, 1.0) * 32767.0) as i16))
            .collect::<Result<Vec<_>, _>>()?,
    };

    info!(
        "Loaded {} samples at {} Hz ({} channels)",
        samples.len(),
        spec.sample_rate,
        spec.channels
    );

    Ok(AudioBuffer {
        samples,
        sample_rate: spec.sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_wav(path: &Path, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: PIPELINE_SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_load_wav_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.wav");
        write_test_wav(&path, &[0, 100, -100, 32000]);

        let audio = load_wav(&path).unwrap();

        assert_eq!(audio.samples, vec![0, 100, -100, 32000]);
        assert_eq!(audio.sample_rate, PIPELINE_SAMPLE_RATE);
    }

    #[test]
    fn test_samples_f32_normalized() {
        let audio = AudioBuffer {
            samples: vec![0, 16384, -16384],
            sample_rate: PIPELINE_SAMPLE_RATE,
        };

        let f32s = audio.samples_f32();

        assert!((f32s[0] - 0.0).abs() < 1e-6);
        assert!((f32s[1] - 0.5).abs() < 1e-3);
        assert!((f32s[2] + 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_temp_wav_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scratch.wav");
        std::fs::write(&path, b"not really a wav").unwrap();

        {
            let _guard = TempWav { path: path.clone() };
        }

        assert!(!path.exists());
    }

    #[test]
    fn test_transcode_missing_input() {
        let err = transcode_to_pipeline_wav(Path::new("no/such/file.mp3")).unwrap_err();

        assert!(matches!(err, AudioError::InputNotFound(_)));
    }

    #[test]
    fn test_temp_wav_paths_are_unique() {
        let a = temp_wav_path(Path::new("/tmp/meeting.mp3"));
        let b = temp_wav_path(Path::new("/tmp/meeting.mp3"));

        assert_ne!(a, b);
    }
}
