use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, VoxkeyError};

/// Top-level configuration for the Voxkey application.
///
/// Loaded from `~/.voxkey/config.toml` by default. Each section corresponds
/// to one concern of the dictation pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoxkeyConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub phrases: PhraseConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

impl VoxkeyConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: VoxkeyConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| VoxkeyError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory containing speech model folders.
    pub model_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: "~/.voxkey/models".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Audio capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Name or substring of the input device. "default" uses the default mic.
    pub device_name: String,
    /// Samples per captured frame (8000 at 16 kHz is ~0.5 s).
    pub frame_samples: usize,
    /// Capacity of the frame queue between the capture callback and the
    /// consumer. Frames beyond this are dropped, never queued.
    pub queue_capacity: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device_name: "default".to_string(),
            frame_samples: crate::types::FRAME_SAMPLES,
            queue_capacity: 32,
        }
    }
}

/// Utterance boundary detector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// RMS energy above which a frame counts as speech.
    pub silence_threshold: f64,
    /// Silence preset: "disabled", "quick", "medium", "slow".
    pub preset: String,
    /// Minimum milliseconds between two confirm actions (debounce).
    pub min_submission_interval_ms: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            silence_threshold: 500.0,
            preset: "disabled".to_string(),
            min_submission_interval_ms: 1000,
        }
    }
}

/// Key phrase settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhraseConfig {
    /// Phrases that trigger an immediate confirm when an utterance matches
    /// one exactly (case-insensitive).
    pub defaults: Vec<String>,
    /// Whether a matched phrase is also shown in the transcript.
    pub show_phrase: bool,
}

impl Default for PhraseConfig {
    fn default() -> Self {
        Self {
            defaults: vec![
                "Send it".to_string(),
                "I'm done talking".to_string(),
                "That's it".to_string(),
            ],
            show_phrase: true,
        }
    }
}

/// Text delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Delay between delivered words, in milliseconds.
    pub word_delay_ms: u64,
    /// How many times to re-check foreground focus before giving up.
    pub focus_retries: u32,
    /// Fixed wait between focus checks, in milliseconds (no backoff).
    pub focus_retry_wait_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            word_delay_ms: 100,
            focus_retries: 10,
            focus_retry_wait_ms: 50,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
