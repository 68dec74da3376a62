//! Vosk speech recognition backend.
//!
//! When compiled with the `vosk` feature, loads a Vosk model directory and
//! decodes PCM16 frames, finalizing an utterance when the engine reports a
//! complete result. Without the feature, provides a stub that accepts
//! frames and never finalizes anything.

#[cfg(feature = "vosk")]
use std::path::Path;
#[cfg(feature = "vosk")]
use std::sync::Mutex;

use voxkey_core::error::{Result, VoxkeyError};
use voxkey_core::types::AudioFrame;

use crate::{normalize_utterance, SpeechDecoder};

/// Configuration for the Vosk decoder.
#[derive(Debug, Clone)]
pub struct VoskDecoderConfig {
    /// Path to the Vosk model directory.
    pub model_path: String,
    /// Display name for the loaded model.
    pub model_name: String,
    /// Sample rate of the incoming audio in Hz.
    pub sample_rate: u32,
}

impl Default for VoskDecoderConfig {
    fn default() -> Self {
        Self {
            model_path: String::new(),
            model_name: String::new(),
            sample_rate: 16_000,
        }
    }
}

/// Vosk-backed speech decoder.
///
/// The recognizer is stateful across frames, so access is serialized via an
/// internal Mutex; the pipeline's single consumer is the only steady-state
/// caller.
pub struct VoskDecoder {
    config: VoskDecoderConfig,
    #[cfg(feature = "vosk")]
    recognizer: Mutex<vosk::Recognizer>,
}

impl VoskDecoder {
    /// Load a Vosk model and build a recognizer for it.
    ///
    /// # Errors
    /// Returns `VoxkeyError::Decoder` if the model directory is missing or
    /// the engine rejects it.
    #[cfg(feature = "vosk")]
    pub fn new(config: VoskDecoderConfig) -> Result<Self> {
        if !Path::new(&config.model_path).is_dir() {
            return Err(VoxkeyError::Decoder(format!(
                "Vosk model directory not found: {}",
                config.model_path
            )));
        }

        tracing::info!(model = %config.model_name, path = %config.model_path, "Loading Vosk model");

        let model = vosk::Model::new(&config.model_path).ok_or_else(|| {
            VoxkeyError::Decoder(format!("Failed to load Vosk model: {}", config.model_path))
        })?;
        let recognizer =
            vosk::Recognizer::new(&model, config.sample_rate as f32).ok_or_else(|| {
                VoxkeyError::Decoder("Failed to create Vosk recognizer".to_string())
            })?;

        tracing::info!(model = %config.model_name, "Vosk model loaded");

        Ok(Self {
            config,
            recognizer: Mutex::new(recognizer),
        })
    }

    /// Stub constructor when the `vosk` feature is disabled.
    #[cfg(not(feature = "vosk"))]
    pub fn new(config: VoskDecoderConfig) -> Result<Self> {
        tracing::warn!("VoskDecoder created without `vosk` feature — decoding will finalize nothing");
        Ok(Self { config })
    }

    pub fn config(&self) -> &VoskDecoderConfig {
        &self.config
    }
}

// ---------------------------------------------------------------------------
// Real implementation (vosk feature enabled)
// ---------------------------------------------------------------------------

#[cfg(feature = "vosk")]
impl SpeechDecoder for VoskDecoder {
    fn accept_frame(&self, frame: &AudioFrame) -> Result<Option<String>> {
        use vosk::DecodingState;

        let mut recognizer = self
            .recognizer
            .lock()
            .map_err(|_| VoxkeyError::Decoder("Recognizer lock poisoned".to_string()))?;

        let state = recognizer
            .accept_waveform(frame.samples())
            .map_err(|e| VoxkeyError::Decoder(format!("accept_waveform failed: {:?}", e)))?;

        match state {
            DecodingState::Finalized => {
                let text = recognizer
                    .result()
                    .single()
                    .map(|r| r.text.to_string())
                    .unwrap_or_default();
                Ok(normalize_utterance(&text))
            }
            DecodingState::Running => Ok(None),
            DecodingState::Failed => Err(VoxkeyError::Decoder(
                "Vosk decoding failed on frame".to_string(),
            )),
        }
    }

    fn reset(&self) {
        if let Ok(mut recognizer) = self.recognizer.lock() {
            recognizer.reset();
        }
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}

// ---------------------------------------------------------------------------
// Stub implementation (vosk feature disabled)
// ---------------------------------------------------------------------------

#[cfg(not(feature = "vosk"))]
impl SpeechDecoder for VoskDecoder {
    fn accept_frame(&self, _frame: &AudioFrame) -> Result<Option<String>> {
        Ok(None)
    }

    fn reset(&self) {}

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vosk_config_default() {
        let config = VoskDecoderConfig::default();
        assert!(config.model_path.is_empty());
        assert_eq!(config.sample_rate, 16_000);
    }

    #[test]
    fn test_vosk_no_model_dir() {
        let config = VoskDecoderConfig {
            model_path: "/nonexistent/vosk-model".to_string(),
            model_name: "missing".to_string(),
            ..Default::default()
        };
        let result = VoskDecoder::new(config);
        // Without vosk feature: succeeds (stub). With: fails (no directory).
        #[cfg(feature = "vosk")]
        assert!(result.is_err());
        #[cfg(not(feature = "vosk"))]
        assert!(result.is_ok());
    }

    #[cfg(not(feature = "vosk"))]
    #[test]
    fn test_vosk_stub_never_finalizes() {
        let decoder = VoskDecoder::new(VoskDecoderConfig::default()).unwrap();
        let frame = AudioFrame::constant(500);
        assert_eq!(decoder.accept_frame(&frame).unwrap(), None);
        decoder.reset(); // Should not panic.
    }

    #[cfg(not(feature = "vosk"))]
    #[test]
    fn test_vosk_model_name() {
        let config = VoskDecoderConfig {
            model_name: "vosk-model-small-en-us-0.15".to_string(),
            ..Default::default()
        };
        let decoder = VoskDecoder::new(config).unwrap();
        assert_eq!(decoder.model_name(), "vosk-model-small-en-us-0.15");
    }
}
