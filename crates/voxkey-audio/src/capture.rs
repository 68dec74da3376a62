//! Microphone capture via cpal (WASAPI backend).
//!
//! On Windows, opens the configured input device and feeds fixed-size
//! PCM16 mono frames into a [`FrameSender`]. The cpal callback does no
//! blocking work: it converts, accumulates, and pushes; a full queue means
//! the frame is dropped by the sender.
//!
//! On non-Windows platforms, returns `VoxkeyError::Audio`.

#[cfg(not(target_os = "windows"))]
use tracing::warn;

use std::sync::atomic::AtomicBool;
#[cfg(target_os = "windows")]
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use voxkey_core::error::VoxkeyError;
use voxkey_core::types::{AudioFrame, FRAME_SAMPLES, SAMPLE_RATE_HZ};

use crate::queue::FrameSender;
use crate::AudioCaptureService;

/// Configuration for the microphone capture service.
#[derive(Debug, Clone)]
pub struct CaptureDeviceConfig {
    /// Name or substring of the input device. "default" selects the
    /// system default input device.
    pub device_name: String,
    /// Target sample rate in Hz.
    pub sample_rate: u32,
    /// Samples per emitted frame.
    pub frame_samples: usize,
}

impl Default for CaptureDeviceConfig {
    fn default() -> Self {
        Self {
            device_name: "default".to_string(),
            sample_rate: SAMPLE_RATE_HZ,
            frame_samples: FRAME_SAMPLES,
        }
    }
}

/// Accumulates converted samples and emits complete frames.
///
/// Shared between the cpal callback thread and nothing else; the mutex is
/// there because the service handle and the callback both hold a clone.
#[derive(Debug, Clone)]
pub struct FrameAccumulator {
    pending: Arc<Mutex<Vec<i16>>>,
    frame_samples: usize,
}

impl FrameAccumulator {
    pub fn new(frame_samples: usize) -> Self {
        Self {
            pending: Arc::new(Mutex::new(Vec::with_capacity(frame_samples))),
            frame_samples,
        }
    }

    /// Append f32 PCM samples, converting to i16, and push every complete
    /// frame into the sender. Partial frames wait for the next callback.
    pub fn feed(&self, data: &[f32], sender: &FrameSender) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.extend(data.iter().map(|&s| {
                (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
            }));
            while pending.len() >= self.frame_samples {
                let rest = pending.split_off(self.frame_samples);
                let frame = AudioFrame::new(std::mem::replace(&mut *pending, rest));
                sender.push(frame);
            }
        }
    }

    /// Drop any partial frame. Called when capture stops so a restart
    /// begins from a clean buffer.
    pub fn clear(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.clear();
        }
    }

    /// Samples currently waiting for a complete frame.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }
}

/// Wrapper to make `cpal::Stream` usable inside `Mutex` on Windows.
///
/// `cpal::Stream` on Windows contains a `*mut ()` marker that prevents auto
/// `Send`/`Sync`. The stream itself is safe to share via a `Mutex` because
/// we only ever drop it (to stop capture) or store it (to keep it alive).
#[cfg(target_os = "windows")]
struct SendStream(#[allow(dead_code)] cpal::Stream);

// SAFETY: SendStream wraps a cpal::Stream which manages its own audio thread.
// The handle is only stored and dropped, never used to share data, and the
// WASAPI backend is documented as thread-safe.
#[cfg(target_os = "windows")]
unsafe impl Send for SendStream {}
#[cfg(target_os = "windows")]
unsafe impl Sync for SendStream {}

/// Microphone capture service feeding the frame queue.
pub struct MicCaptureService {
    config: CaptureDeviceConfig,
    sender: FrameSender,
    #[allow(dead_code)] // Used in Windows impl; non-Windows stub ignores it.
    active: Arc<AtomicBool>,
    #[allow(dead_code)]
    accumulator: FrameAccumulator,
    /// The cpal stream is stored here while active. Dropping it stops capture.
    #[cfg(target_os = "windows")]
    stream: Mutex<Option<SendStream>>,
}

impl MicCaptureService {
    pub fn new(config: CaptureDeviceConfig, sender: FrameSender) -> Self {
        let accumulator = FrameAccumulator::new(config.frame_samples);
        Self {
            config,
            sender,
            active: Arc::new(AtomicBool::new(false)),
            accumulator,
            #[cfg(target_os = "windows")]
            stream: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &CaptureDeviceConfig {
        &self.config
    }

    /// The sender frames are pushed into. Exposed so the application can
    /// toggle mute and read the drop counter.
    pub fn sender(&self) -> &FrameSender {
        &self.sender
    }
}

// =============================================================================
// Windows implementation
// =============================================================================

#[cfg(target_os = "windows")]
impl AudioCaptureService for MicCaptureService {
    async fn start(&self) -> Result<(), VoxkeyError> {
        use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
        use tracing::{debug, info};

        if self.active.load(Ordering::Relaxed) {
            return Err(VoxkeyError::Audio("Audio capture already active".into()));
        }

        let host = cpal::default_host();

        let device = if self.config.device_name == "default" {
            host.default_input_device()
                .ok_or_else(|| VoxkeyError::Audio("No default input device found".into()))?
        } else {
            let name_lower = self.config.device_name.to_lowercase();
            host.input_devices()
                .map_err(|e| VoxkeyError::Audio(format!("Failed to enumerate devices: {}", e)))?
                .find(|d| {
                    d.name()
                        .map(|n| n.to_lowercase().contains(&name_lower))
                        .unwrap_or(false)
                })
                .ok_or_else(|| {
                    VoxkeyError::Audio(format!(
                        "Audio device '{}' not found",
                        self.config.device_name
                    ))
                })?
        };

        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        debug!(device = %device_name, "Selected input device");

        // Query the device's preferred config instead of forcing our own.
        // Many devices don't support arbitrary sample rates / channel counts.
        let stream_config = match device.default_input_config() {
            Ok(supported) => cpal::StreamConfig {
                channels: supported.channels(),
                sample_rate: supported.sample_rate(),
                buffer_size: cpal::BufferSize::Default,
            },
            Err(e) => {
                debug!(error = %e, "Could not query default config, using requested config");
                cpal::StreamConfig {
                    channels: 1,
                    sample_rate: cpal::SampleRate(self.config.sample_rate),
                    buffer_size: cpal::BufferSize::Default,
                }
            }
        };

        let device_rate = stream_config.sample_rate.0;
        let device_channels = stream_config.channels;
        let target_rate = self.config.sample_rate;

        let needs_conversion = device_rate != target_rate || device_channels != 1;
        if needs_conversion {
            info!(
                device_rate,
                device_channels, target_rate, "Audio callback will downmix/resample"
            );
        }

        let sender = self.sender.clone();
        let accumulator = self.accumulator.clone();
        let active_flag = Arc::clone(&self.active);

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if !needs_conversion {
                        accumulator.feed(data, &sender);
                        return;
                    }

                    // Downmix to mono (average all channels).
                    let mono: Vec<f32> = if device_channels > 1 {
                        let ch = device_channels as usize;
                        data.chunks_exact(ch)
                            .map(|frame| frame.iter().sum::<f32>() / ch as f32)
                            .collect()
                    } else {
                        data.to_vec()
                    };

                    // Resample to the target rate via linear interpolation.
                    let resampled = if device_rate != target_rate {
                        let ratio = device_rate as f64 / target_rate as f64;
                        let out_len = (mono.len() as f64 / ratio).ceil() as usize;
                        let mut out = Vec::with_capacity(out_len);
                        for i in 0..out_len {
                            let src = i as f64 * ratio;
                            let idx0 = src.floor() as usize;
                            let idx1 = (idx0 + 1).min(mono.len().saturating_sub(1));
                            let frac = (src - idx0 as f64) as f32;
                            out.push(mono[idx0] * (1.0 - frac) + mono[idx1] * frac);
                        }
                        out
                    } else {
                        mono
                    };

                    accumulator.feed(&resampled, &sender);
                },
                move |err| {
                    tracing::error!(error = %err, "Audio stream error");
                    active_flag.store(false, Ordering::Relaxed);
                },
                None, // No timeout.
            )
            .map_err(|e| VoxkeyError::Audio(format!("Failed to build audio stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| VoxkeyError::Audio(format!("Failed to start audio stream: {}", e)))?;

        if let Ok(mut guard) = self.stream.lock() {
            *guard = Some(SendStream(stream));
        }

        self.active.store(true, Ordering::Relaxed);
        info!(
            device = %device_name,
            device_rate,
            target_rate,
            frame_samples = self.config.frame_samples,
            "Microphone capture started"
        );

        Ok(())
    }

    async fn stop(&self) -> Result<(), VoxkeyError> {
        if !self.active.load(Ordering::Relaxed) {
            return Err(VoxkeyError::Audio("Audio capture is not active".into()));
        }

        // Drop the stream to stop capture, then discard any partial frame.
        if let Ok(mut guard) = self.stream.lock() {
            *guard = None;
        }
        self.accumulator.clear();

        self.active.store(false, Ordering::Relaxed);
        tracing::info!("Microphone capture stopped");
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Non-Windows stub
// =============================================================================

#[cfg(not(target_os = "windows"))]
impl AudioCaptureService for MicCaptureService {
    async fn start(&self) -> Result<(), VoxkeyError> {
        warn!("MicCaptureService called on non-Windows platform");
        Err(VoxkeyError::Audio(
            "Microphone capture is only available on Windows".into(),
        ))
    }

    async fn stop(&self) -> Result<(), VoxkeyError> {
        Err(VoxkeyError::Audio(
            "Microphone capture is only available on Windows".into(),
        ))
    }

    fn is_active(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::frame_queue;

    #[test]
    fn test_capture_config_default() {
        let config = CaptureDeviceConfig::default();
        assert_eq!(config.device_name, "default");
        assert_eq!(config.sample_rate, 16_000);
        assert_eq!(config.frame_samples, 8_000);
    }

    #[test]
    fn test_accumulator_emits_complete_frames() {
        let (tx, mut rx) = frame_queue(8);
        let acc = FrameAccumulator::new(4);

        acc.feed(&[0.5; 3], &tx);
        assert!(rx.try_recv().is_none());
        assert_eq!(acc.pending_len(), 3);

        acc.feed(&[0.5; 6], &tx);
        // 9 samples total: two frames of 4, one sample pending.
        let first = rx.try_recv().unwrap();
        assert_eq!(first.len(), 4);
        assert!(rx.try_recv().is_some());
        assert!(rx.try_recv().is_none());
        assert_eq!(acc.pending_len(), 1);
    }

    #[test]
    fn test_accumulator_f32_conversion_clamps() {
        let (tx, mut rx) = frame_queue(8);
        let acc = FrameAccumulator::new(4);

        acc.feed(&[1.0, -1.0, 2.0, -2.0], &tx);
        let frame = rx.try_recv().unwrap();
        assert_eq!(frame.samples()[0], i16::MAX);
        assert_eq!(frame.samples()[2], i16::MAX);
        assert_eq!(frame.samples()[1], -i16::MAX);
        assert_eq!(frame.samples()[3], -i16::MAX);
    }

    #[test]
    fn test_accumulator_clear_discards_partial() {
        let (tx, _rx) = frame_queue(8);
        let acc = FrameAccumulator::new(4);
        acc.feed(&[0.1; 3], &tx);
        acc.clear();
        assert_eq!(acc.pending_len(), 0);
    }

    #[test]
    fn test_service_creation() {
        let (tx, _rx) = frame_queue(8);
        let config = CaptureDeviceConfig {
            device_name: "Test Mic".to_string(),
            ..Default::default()
        };
        let service = MicCaptureService::new(config, tx);
        assert_eq!(service.config().device_name, "Test Mic");
        assert!(!service.is_active());
    }

    #[cfg(not(target_os = "windows"))]
    #[tokio::test]
    async fn test_capture_returns_error_on_non_windows() {
        let (tx, _rx) = frame_queue(8);
        let service = MicCaptureService::new(CaptureDeviceConfig::default(), tx);
        let result = service.start().await;
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("only available on Windows"));
    }
}
