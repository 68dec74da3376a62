//! Live model switching with rollback.
//!
//! The manager owns the active decoder behind an `RwLock` so the pipeline
//! can grab a cheap `Arc` clone per frame. Switching loads the replacement
//! first; only a successful load replaces the active decoder, so a failed
//! switch leaves the previous model serving.

use std::sync::{Arc, RwLock};

use voxkey_core::error::{Result, VoxkeyError};

use crate::model::ModelInfo;
use crate::SpeechDecoder;

/// Builds a decoder for a discovered model. The application supplies a
/// Vosk-backed loader; tests supply mocks.
pub type DecoderLoader = Box<dyn Fn(&ModelInfo) -> Result<Arc<dyn SpeechDecoder>> + Send + Sync>;

pub struct DecoderManager {
    loader: DecoderLoader,
    active: RwLock<ActiveDecoder>,
}

struct ActiveDecoder {
    decoder: Arc<dyn SpeechDecoder>,
    model: ModelInfo,
}

impl DecoderManager {
    /// Load the initial model and build the manager.
    pub fn new(loader: DecoderLoader, initial: ModelInfo) -> Result<Self> {
        let decoder = loader(&initial)?;
        tracing::info!(model = %initial.name, "Initial speech model loaded");
        Ok(Self {
            loader,
            active: RwLock::new(ActiveDecoder {
                decoder,
                model: initial,
            }),
        })
    }

    /// The currently active decoder.
    pub fn active(&self) -> Result<Arc<dyn SpeechDecoder>> {
        let guard = self
            .active
            .read()
            .map_err(|_| VoxkeyError::Decoder("Decoder lock poisoned".to_string()))?;
        Ok(Arc::clone(&guard.decoder))
    }

    /// Name of the currently active model.
    pub fn active_model(&self) -> Result<String> {
        let guard = self
            .active
            .read()
            .map_err(|_| VoxkeyError::Decoder("Decoder lock poisoned".to_string()))?;
        Ok(guard.model.name.clone())
    }

    /// Switch to a different model.
    ///
    /// The replacement is loaded before anything changes; if loading fails
    /// the error is returned and the previous model remains active.
    pub fn switch(&self, model: &ModelInfo) -> Result<()> {
        let replacement = (self.loader)(model).map_err(|e| {
            tracing::error!(model = %model.name, error = %e, "Model switch failed, keeping previous model");
            e
        })?;

        let mut guard = self
            .active
            .write()
            .map_err(|_| VoxkeyError::Decoder("Decoder lock poisoned".to_string()))?;
        let previous = guard.model.name.clone();
        guard.decoder = replacement;
        guard.model = model.clone();

        tracing::info!(from = %previous, to = %model.name, "Speech model switched");
        Ok(())
    }
}
