//! Voxkey Decoder crate - speech-to-text behind a trait seam.
//!
//! The pipeline never talks to a recognition engine directly; it sees
//! [`SpeechDecoder`], which turns PCM16 frames into finalized utterance
//! text. A Vosk-backed implementation lives behind the `vosk` feature,
//! model discovery picks the engine's model folder, and [`DecoderManager`]
//! handles live model switching with rollback. A scriptable mock supports
//! testing the rest of the system without any recognition engine.

use std::collections::VecDeque;
use std::sync::Mutex;

use voxkey_core::error::{Result, VoxkeyError};
use voxkey_core::types::AudioFrame;

pub mod manager;
pub mod model;
pub mod vosk_decoder;

pub use manager::{DecoderLoader, DecoderManager};
pub use model::{available_models, smallest_model, ModelInfo};
pub use vosk_decoder::{VoskDecoder, VoskDecoderConfig};

// =============================================================================
// Traits
// =============================================================================

/// Turns audio frames into finalized utterance text.
///
/// `accept_frame` returns `Ok(Some(text))` exactly when the engine decides
/// an utterance is complete; the text is already trimmed and lowercased.
/// Implementations are shared across the pipeline via `Arc<dyn SpeechDecoder>`
/// and must serialize internal engine access themselves.
pub trait SpeechDecoder: Send + Sync {
    /// Feed one frame of PCM16 mono audio.
    fn accept_frame(&self, frame: &AudioFrame) -> Result<Option<String>>;

    /// Discard any partially decoded utterance.
    fn reset(&self);

    /// Name of the loaded model, for status display.
    fn model_name(&self) -> &str;
}

/// Normalize engine output: trim and lowercase.
///
/// Returns `None` for text that is empty after trimming, so callers never
/// see a blank finalization.
pub fn normalize_utterance(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

// =============================================================================
// Mock implementation
// =============================================================================

/// Scriptable decoder for testing.
///
/// Tests enqueue outcomes in advance; each `accept_frame` call pops the next
/// one. An exhausted script yields `Ok(None)`.
#[derive(Default)]
pub struct MockDecoder {
    script: Mutex<VecDeque<Result<Option<String>>>>,
    resets: Mutex<u64>,
    name: String,
}

impl MockDecoder {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            resets: Mutex::new(0),
            name: "mock".to_string(),
        }
    }

    pub fn with_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::new()
        }
    }

    /// Queue a finalized utterance for a future frame. Normalization is
    /// applied the way a real decoder would.
    pub fn push_final(&self, text: &str) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Ok(normalize_utterance(text)));
        }
    }

    /// Queue a frame with no finalization.
    pub fn push_silence(&self) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Ok(None));
        }
    }

    /// Queue a decode failure.
    pub fn push_error(&self, message: &str) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(VoxkeyError::Decoder(message.to_string())));
        }
    }

    /// How many times `reset` has been called.
    pub fn reset_count(&self) -> u64 {
        self.resets.lock().map(|r| *r).unwrap_or(0)
    }
}

impl SpeechDecoder for MockDecoder {
    fn accept_frame(&self, _frame: &AudioFrame) -> Result<Option<String>> {
        match self.script.lock() {
            Ok(mut script) => script.pop_front().unwrap_or(Ok(None)),
            Err(_) => Ok(None),
        }
    }

    fn reset(&self) {
        if let Ok(mut resets) = self.resets.lock() {
            *resets += 1;
        }
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

// =============================================================================
// Tests
// =============================================================================
