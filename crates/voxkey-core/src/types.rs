use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sample rate every Voxkey audio path runs at, in Hz.
pub const SAMPLE_RATE_HZ: u32 = 16_000;

/// Nominal samples per captured frame (~0.5 s at 16 kHz).
pub const FRAME_SAMPLES: usize = 8_000;

// =============================================================================
// Enums
// =============================================================================

/// Which special listening mode is active, if any.
///
/// Silence-boundary mode and key-phrase mode are mutually exclusive by
/// construction: there is exactly one active mode at a time, and `Default`
/// is the safe fallback when mode processing fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenMode {
    /// Plain transcription; no automatic confirm action.
    #[default]
    Default,
    /// Auto-confirm after a configured stretch of silence.
    SilenceBoundary,
    /// Auto-confirm when a finalized utterance exactly matches a key phrase.
    KeyPhrase,
}

impl fmt::Display for ListenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenMode::Default => write!(f, "Default"),
            ListenMode::SilenceBoundary => write!(f, "SilenceBoundary"),
            ListenMode::KeyPhrase => write!(f, "KeyPhrase"),
        }
    }
}

/// Preset silence durations for the boundary detector.
///
/// `Disabled` maps to zero and means the detector never fires, not
/// "fires every frame".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SilencePreset {
    #[default]
    Disabled,
    /// 3 seconds.
    Quick,
    /// 5 seconds.
    Medium,
    /// 10 seconds.
    Slow,
}

impl SilencePreset {
    /// The silence duration this preset requires before a boundary fires.
    pub fn duration(&self) -> Duration {
        match self {
            SilencePreset::Disabled => Duration::ZERO,
            SilencePreset::Quick => Duration::from_secs(3),
            SilencePreset::Medium => Duration::from_secs(5),
            SilencePreset::Slow => Duration::from_secs(10),
        }
    }
}

impl FromStr for SilencePreset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "disabled" | "manual" => Ok(SilencePreset::Disabled),
            "quick" => Ok(SilencePreset::Quick),
            "medium" => Ok(SilencePreset::Medium),
            "slow" => Ok(SilencePreset::Slow),
            other => Err(format!("Unknown silence preset: {}", other)),
        }
    }
}

// =============================================================================
// Audio frame
// =============================================================================

/// One fixed-size frame of captured audio: signed 16-bit PCM, 16 kHz, mono.
///
/// Immutable once captured. Produced by the capture device at a fixed
/// cadence (one frame per ~0.5 s at the nominal 8000-sample block size).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioFrame {
    samples: Vec<i16>,
}

impl AudioFrame {
    pub fn new(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    /// A frame of `FRAME_SAMPLES` samples at constant amplitude.
    ///
    /// A constant-amplitude frame has RMS equal to that amplitude, which
    /// makes energy thresholds easy to reason about in tests.
    pub fn constant(amplitude: i16) -> Self {
        Self {
            samples: vec![amplitude; FRAME_SAMPLES],
        }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Frame duration at the fixed 16 kHz sample rate.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / SAMPLE_RATE_HZ as f64)
    }

    /// Root-mean-square energy: `sqrt(mean(sample_i^2))` over the full frame.
    ///
    /// An empty frame has zero energy.
    pub fn rms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = self
            .samples
            .iter()
            .map(|s| {
                let v = *s as f64;
                v * v
            })
            .sum();
        (sum_sq / self.samples.len() as f64).sqrt()
    }

    /// The frame as raw little-endian PCM16 bytes, the format the decoder
    /// boundary accepts.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.samples.len() * 2);
        for s in &self.samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        bytes
    }
}

// =============================================================================
// Temporal
// =============================================================================

/// Unix timestamp in seconds since epoch, used in events.
///
/// Compared by value. Two Timestamps with the same inner value are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.0, 0).unwrap_or_default()
    }
}

// =============================================================================
// Tests
// =============================================================================
