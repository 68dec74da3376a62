//! Bounded frame queue between the capture callback and the consumer.
//!
//! The capture side pushes with [`FrameSender::push`], which never blocks:
//! muted frames are dropped immediately, and frames that would overflow the
//! queue are dropped and counted. A single consumer drains the queue via
//! [`FrameReceiver::recv`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use voxkey_core::types::AudioFrame;

/// Create a bounded frame queue with the given capacity.
pub fn frame_queue(capacity: usize) -> (FrameSender, FrameReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    let sender = FrameSender {
        tx,
        muted: Arc::new(AtomicBool::new(false)),
        dropped: Arc::new(AtomicU64::new(0)),
    };
    (sender, FrameReceiver { rx })
}

/// Producer half of the frame queue. Cheap to clone; clones share the mute
/// flag and drop counter.
#[derive(Debug, Clone)]
pub struct FrameSender {
    tx: mpsc::Sender<AudioFrame>,
    muted: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
}

impl FrameSender {
    /// Push a frame without blocking.
    ///
    /// Returns `true` if the frame was queued. While muted, frames are
    /// dropped before queuing. When the queue is full the frame is dropped
    /// and counted; the capture callback must never wait on the consumer.
    pub fn push(&self, frame: AudioFrame) -> bool {
        if self.muted.load(Ordering::Relaxed) {
            return false;
        }
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(dropped_total = total, "Frame queue full, dropping frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Set the mute flag. Muted frames never reach the queue.
    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Relaxed);
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }

    /// Number of frames dropped due to queue overflow (mute drops are not
    /// counted).
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Consumer half of the frame queue. Single consumer, FIFO.
#[derive(Debug)]
pub struct FrameReceiver {
    rx: mpsc::Receiver<AudioFrame>,
}

impl FrameReceiver {
    /// Receive the next frame, waiting until one is available or every
    /// sender has been dropped.
    pub async fn recv(&mut self) -> Option<AudioFrame> {
        self.rx.recv().await
    }

    /// Receive without waiting.
    pub fn try_recv(&mut self) -> Option<AudioFrame> {
        self.rx.try_recv().ok()
    }

    /// Discard everything currently queued. Used when recording stops so a
    /// later session never sees stale frames.
    pub fn drain(&mut self) -> usize {
        let mut count = 0;
        while self.rx.try_recv().is_ok() {
            count += 1;
        }
        count
    }
}

// =============================================================================
// Tests
// =============================================================================
