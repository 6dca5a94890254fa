use anyhow::Context as _;
use tracing::info;

use crate::diarize::{Diarizer, PyannoteDiarizer};
use crate::transcribe::{SpeechToText, WhisperModel, WhisperTranscriber};

pub type DiarizerFactory = Box<dyn Fn() -> anyhow::Result<Box<dyn Diarizer>>>;
pub type TranscriberFactory = Box<dyn Fn(WhisperModel) -> anyhow::Result<Box<dyn SpeechToText>>>;

/// Load-once cache for the model collaborators.
///
/// Owned by the caller and injected into the pipeline, so tests can swap in
/// doubles through the factory closures. The diarizer loads once; the
/// transcriber slot is keyed by model size and reloads only when a request
/// asks for a different size than the one currently loaded.
pub struct ModelRegistry {
    diarizer_factory: DiarizerFactory,
    transcriber_factory: TranscriberFactory,
    diarizer: Option<Box<dyn Diarizer>>,
    transcriber: Option<(WhisperModel, Box<dyn SpeechToText>)>,
}

impl ModelRegistry {
    pub fn new(diarizer_factory: DiarizerFactory, transcriber_factory: TranscriberFactory) -> Self {
        Self {
            diarizer_factory,
            transcriber_factory,
            diarizer: None,
            transcriber: None,
        }
    }

    /// Registry backed by the real pyannote and whisper models.
    pub fn with_default_models() -> Self {
        Self::new(
            Box::new(|| {
                let diarizer = PyannoteDiarizer::new().context("Failed to load diarization model")?;
                Ok(Box::new(diarizer) as Box<dyn Diarizer>)
            }),
            Box::new(|model| {
                let transcriber =
                    WhisperTranscriber::new(model).context("Failed to load Whisper model")?;
                Ok(Box::new(transcriber) as Box<dyn SpeechToText>)
            }),
        )
    }

    /// The diarizer, loading it on first use.
    pub fn diarizer(&mut self) -> anyhow::Result<&mut dyn Diarizer> {
        if self.diarizer.is_none() {
            self.diarizer = Some((self.diarizer_factory)()?);
        }

        Ok(self.diarizer.as_mut().unwrap().as_mut())
    }

    /// The transcriber for `model`, reusing the loaded one when sizes match.
    pub fn transcriber(&mut self, model: WhisperModel) -> anyhow::Result<&mut dyn SpeechToText> {
        let needs_load = match &self.transcriber {
            Some((loaded, _)) => *loaded != model,
            None => true,
        };

        if needs_load {
            if let Some((loaded, _)) = &self.transcriber {
                info!("Swapping Whisper model {} -> {}", loaded, model);
            }
            self.transcriber = Some((model, (self.transcriber_factory)(model)?));
        }

        Ok(self.transcriber.as_mut().unwrap().1.as_mut())
    }

    /// Size of the currently loaded transcriber, if any.
    pub fn loaded_transcriber(&self) -> Option<WhisperModel> {
        self.transcriber.as_ref().map(|(model, _)| *model)
    }
}
