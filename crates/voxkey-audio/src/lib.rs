//! Voxkey Audio crate - frame ingest, capture service, utterance boundary detection.
//!
//! Provides the bounded frame queue between the capture callback and the
//! pipeline consumer, the RMS-based utterance boundary detector, and a
//! cpal-backed microphone capture service for Windows. Includes a mock
//! capture service for testing without real audio hardware.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use voxkey_core::error::VoxkeyError;

pub mod capture;
pub mod detector;
pub mod queue;

pub use capture::{CaptureDeviceConfig, MicCaptureService};
pub use detector::{BoundaryConfig, BoundaryDetector, BoundaryEvent};
pub use queue::{frame_queue, FrameReceiver, FrameSender};

// =============================================================================
// Traits
// =============================================================================

/// Service for managing audio capture from a device.
///
/// Implementations handle device initialization, starting/stopping the
/// capture stream, and reporting capture state. Captured frames are pushed
/// into a [`FrameSender`]; the capture path must never block.
pub trait AudioCaptureService: Send + Sync {
    /// Start capturing audio from the configured device.
    fn start(&self) -> impl Future<Output = Result<(), VoxkeyError>> + Send;

    /// Stop the current audio capture session.
    fn stop(&self) -> impl Future<Output = Result<(), VoxkeyError>> + Send;

    /// Check whether audio capture is currently active.
    fn is_active(&self) -> bool;
}

// =============================================================================
// Mock implementation
// =============================================================================

/// Mock audio capture service for testing.
///
/// Simulates capture without requiring real hardware. Tracks active state
/// via an atomic boolean so it is fully thread-safe; tests push frames into
/// the queue by hand.
#[derive(Debug, Clone)]
pub struct MockCaptureService {
    active: Arc<AtomicBool>,
}

impl Default for MockCaptureService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCaptureService {
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl AudioCaptureService for MockCaptureService {
    async fn start(&self) -> Result<(), VoxkeyError> {
        if self.active.load(Ordering::Relaxed) {
            return Err(VoxkeyError::Audio(
                "Audio capture is already active".to_string(),
            ));
        }
        self.active.store(true, Ordering::Relaxed);
        tracing::info!("Mock audio capture started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), VoxkeyError> {
        if !self.active.load(Ordering::Relaxed) {
            return Err(VoxkeyError::Audio(
                "Audio capture is not active".to_string(),
            ));
        }
        self.active.store(false, Ordering::Relaxed);
        tracing::info!("Mock audio capture stopped");
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_capture_start_stop() {
        let service = MockCaptureService::new();
        assert!(!service.is_active());

        service.start().await.unwrap();
        assert!(service.is_active());

        service.stop().await.unwrap();
        assert!(!service.is_active());
    }

    #[tokio::test]
    async fn test_mock_capture_double_start() {
        let service = MockCaptureService::new();
        service.start().await.unwrap();
        assert!(service.start().await.is_err());
    }

    #[tokio::test]
    async fn test_mock_capture_stop_without_start() {
        let service = MockCaptureService::new();
        assert!(service.stop().await.is_err());
    }

    #[tokio::test]
    async fn test_mock_capture_restart() {
        let service = MockCaptureService::new();
        service.start().await.unwrap();
        service.stop().await.unwrap();
        service.start().await.unwrap();
        assert!(service.is_active());
    }
}
