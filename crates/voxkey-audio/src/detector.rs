//! RMS-based utterance boundary detector.
//!
//! Computes short-term energy per frame and tracks how long the signal has
//! stayed below the silence threshold. When silence has lasted the
//! configured duration (and the debounce interval has elapsed since the
//! last trigger), a single boundary event fires; the trigger resets the
//! silence clock so continued silence does not re-trigger every frame.
//!
//! A configured duration of zero disables the detector entirely.

use std::time::{Duration, Instant};

use voxkey_core::config::DetectorConfig;
use voxkey_core::error::{Result, VoxkeyError};
use voxkey_core::types::{AudioFrame, SilencePreset};

/// Tunables for the boundary detector.
#[derive(Debug, Clone)]
pub struct BoundaryConfig {
    /// RMS energy above which a frame counts as speech (strict `>`).
    pub silence_threshold: f64,
    /// How long silence must last before a boundary fires. Zero disables
    /// the detector.
    pub silence_duration: Duration,
    /// Minimum interval between two boundary events (debounce).
    pub min_submission_interval: Duration,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            silence_threshold: 500.0,
            silence_duration: Duration::ZERO,
            min_submission_interval: Duration::from_secs(1),
        }
    }
}

impl BoundaryConfig {
    /// Build a config from the loaded TOML settings, parsing the preset name.
    pub fn from_settings(settings: &DetectorConfig) -> Result<Self> {
        let preset: SilencePreset = settings
            .preset
            .parse()
            .map_err(VoxkeyError::Config)?;
        Ok(Self {
            silence_threshold: settings.silence_threshold,
            silence_duration: preset.duration(),
            min_submission_interval: Duration::from_millis(settings.min_submission_interval_ms),
        })
    }

    /// Replace the silence duration with the given preset's.
    pub fn with_preset(mut self, preset: SilencePreset) -> Self {
        self.silence_duration = preset.duration();
        self
    }
}

/// Event returned when sustained silence crosses the configured duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryEvent {
    /// How long the silence had lasted when the boundary fired.
    pub silence: Duration,
}

/// Per-frame silence tracker with submission debounce.
///
/// Callers pass the observation time explicitly, which keeps the detector
/// deterministic under test. State is plain and owned; the pipeline's
/// single consumer is the only writer.
#[derive(Debug)]
pub struct BoundaryDetector {
    config: BoundaryConfig,
    last_speech: Instant,
    last_submission: Instant,
}

impl BoundaryDetector {
    pub fn new(config: BoundaryConfig, now: Instant) -> Self {
        Self {
            config,
            last_speech: now,
            last_submission: now,
        }
    }

    pub fn config(&self) -> &BoundaryConfig {
        &self.config
    }

    /// Whether the detector can ever fire.
    pub fn is_enabled(&self) -> bool {
        !self.config.silence_duration.is_zero()
    }

    /// Observe one frame at time `now`.
    ///
    /// Frames with RMS above the threshold reset the silence clock. Once
    /// silence has lasted `silence_duration` and at least
    /// `min_submission_interval` has passed since the last event, a single
    /// [`BoundaryEvent`] is returned and the clock restarts.
    ///
    /// # Errors
    /// Returns `VoxkeyError::Audio` for an empty frame, which indicates a
    /// capture fault upstream.
    pub fn observe(&mut self, frame: &AudioFrame, now: Instant) -> Result<Option<BoundaryEvent>> {
        if frame.is_empty() {
            return Err(VoxkeyError::Audio("empty audio frame".to_string()));
        }

        if !self.is_enabled() {
            return Ok(None);
        }

        let energy = frame.rms();
        if energy > self.config.silence_threshold {
            self.last_speech = now;
            return Ok(None);
        }

        let silence_elapsed = now.saturating_duration_since(self.last_speech);
        if silence_elapsed >= self.config.silence_duration
            && now.saturating_duration_since(self.last_submission)
                >= self.config.min_submission_interval
        {
            tracing::debug!(
                silence_secs = silence_elapsed.as_secs_f64(),
                "Silence boundary reached"
            );
            // The trigger counts as activity: restart both clocks so
            // continued silence does not re-fire every frame.
            self.last_speech = now;
            self.last_submission = now;
            return Ok(Some(BoundaryEvent {
                silence: silence_elapsed,
            }));
        }

        Ok(None)
    }

    /// Reset the silence and debounce clocks to `now`. Called when the mode
    /// is toggled on or the delivery target changes.
    pub fn reset(&mut self, now: Instant) {
        self.last_speech = now;
        self.last_submission = now;
        tracing::debug!("Boundary detector reset");
    }
}

// =============================================================================
// Tests
// =============================================================================
