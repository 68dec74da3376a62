//! Sink routing and cancelable word-by-word delivery.
//!
//! Delivery targets form a precedence chain: typing at the cursor, typing
//! into a bound window (after focusing it), and the in-memory transcript
//! as the sink of last resort. Text is delivered one word at a time with a
//! configurable pause, as a spawned task that can be canceled between
//! words; cancellation never tears down anything, it just stops typing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use voxkey_core::error::VoxkeyError;
use voxkey_core::events::PipelineEvent;
use voxkey_core::types::Timestamp;

use crate::window::{ensure_focus, FocusConfig, WindowId};
use crate::{DeliverySink, TranscriptSink};

/// Where delivered text should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryTarget {
    /// Type wherever the input focus currently is.
    Cursor,
    /// Focus the bound window first, then type.
    Window(WindowId),
    /// Append to the in-memory transcript only.
    Transcript,
}

/// What a finished delivery did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    /// Words actually delivered.
    pub delivered: usize,
    /// The task was canceled before finishing.
    pub canceled: bool,
    /// The preferred sink was unusable and text went to the transcript.
    pub degraded: bool,
    /// The submit action ran.
    pub confirmed: bool,
}

/// Routes deliveries to the right sink and runs them.
pub struct DeliveryRouter {
    injector: Arc<dyn DeliverySink>,
    transcript: TranscriptSink,
    focus: FocusConfig,
    /// Pause between words.
    word_delay: Duration,
    target: Mutex<DeliveryTarget>,
    events: Option<broadcast::Sender<PipelineEvent>>,
}

impl DeliveryRouter {
    pub fn new(
        injector: Arc<dyn DeliverySink>,
        transcript: TranscriptSink,
        focus: FocusConfig,
        word_delay: Duration,
    ) -> Self {
        Self {
            injector,
            transcript,
            focus,
            word_delay,
            target: Mutex::new(DeliveryTarget::Cursor),
            events: None,
        }
    }

    /// Publish degradation events onto the given stream.
    pub fn with_events(mut self, events: broadcast::Sender<PipelineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    fn emit_degraded(&self, reason: &str) {
        if let Some(events) = &self.events {
            let _ = events.send(PipelineEvent::DeliveryDegraded {
                reason: reason.to_string(),
                timestamp: Timestamp::now(),
            });
        }
    }

    pub fn set_target(&self, target: DeliveryTarget) {
        if let Ok(mut guard) = self.target.lock() {
            tracing::info!(?target, "Delivery target changed");
            *guard = target;
        }
    }

    pub fn target(&self) -> DeliveryTarget {
        self.target
            .lock()
            .map(|t| *t)
            .unwrap_or(DeliveryTarget::Transcript)
    }

    /// The transcript sink, for status display.
    pub fn transcript(&self) -> &TranscriptSink {
        &self.transcript
    }

    /// Pick the sink for the current target. Returns the sink and whether
    /// the choice is already a degradation from the preferred target.
    async fn resolve(&self) -> (Arc<dyn DeliverySink>, bool) {
        match self.target() {
            DeliveryTarget::Cursor => (Arc::clone(&self.injector), false),
            DeliveryTarget::Transcript => {
                (Arc::new(self.transcript.clone()) as Arc<dyn DeliverySink>, false)
            }
            DeliveryTarget::Window(id) => match ensure_focus(id, &self.focus).await {
                Ok(true) => (Arc::clone(&self.injector), false),
                Ok(false) | Err(_) => {
                    tracing::warn!(
                        window = id.0,
                        "Target window could not be focused, delivering to transcript"
                    );
                    self.emit_degraded("target window could not be focused");
                    (Arc::new(self.transcript.clone()) as Arc<dyn DeliverySink>, true)
                }
            },
        }
    }

    /// Deliver `text` word by word, checking the cancel flag between words.
    ///
    /// A sink failure mid-delivery reroutes the remaining words to the
    /// transcript rather than losing them. When `submit` is set and the
    /// delivery was not canceled, the sink's confirm action runs last.
    pub async fn deliver(
        &self,
        text: &str,
        submit: bool,
        cancel: &AtomicBool,
    ) -> DeliveryOutcome {
        let (mut sink, mut degraded) = self.resolve().await;

        let mut delivered = 0usize;
        let mut canceled = false;

        for token in text.split_whitespace() {
            if cancel.load(Ordering::Relaxed) {
                canceled = true;
                break;
            }

            if let Err(e) = sink.deliver_token(token) {
                tracing::warn!(error = %e, "Sink failed, rerouting delivery to transcript");
                self.emit_degraded(&e.to_string());
                degraded = true;
                sink = Arc::new(self.transcript.clone()) as Arc<dyn DeliverySink>;
                // The transcript sink cannot fail short of a poisoned lock.
                let _ = sink.deliver_token(token);
            }
            delivered += 1;

            if !self.word_delay.is_zero() {
                tokio::time::sleep(self.word_delay).await;
            }
        }

        let mut confirmed = false;
        if submit && !canceled {
            if let Err(e) = sink.confirm() {
                tracing::warn!(error = %e, "Submit failed, confirming in transcript");
                self.emit_degraded(&e.to_string());
                degraded = true;
                let _ = self.transcript.confirm();
            }
            confirmed = true;
        }

        if canceled {
            tracing::info!(delivered, "Delivery canceled");
        } else {
            tracing::debug!(delivered, confirmed, degraded, "Delivery finished");
        }

        DeliveryOutcome {
            delivered,
            canceled,
            degraded,
            confirmed,
        }
    }

    /// Spawn a delivery as a cancelable background task.
    pub fn spawn(self: &Arc<Self>, text: String, submit: bool) -> DeliveryTask {
        let cancel = Arc::new(AtomicBool::new(false));
        let router = Arc::clone(self);
        let flag = Arc::clone(&cancel);
        let handle =
            tokio::spawn(async move { router.deliver(&text, submit, flag.as_ref()).await });
        DeliveryTask { cancel, handle }
    }
}

/// Handle to an in-flight word-by-word delivery.
pub struct DeliveryTask {
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<DeliveryOutcome>,
}

impl DeliveryTask {
    /// Request cancellation. The task stops before the next word.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for completion without consuming the handle, for select loops
    /// that keep the task slot while other work proceeds. Must not be
    /// called again after it returns.
    pub async fn join(&mut self) -> voxkey_core::error::Result<DeliveryOutcome> {
        (&mut self.handle)
            .await
            .map_err(|e| VoxkeyError::Delivery(format!("Delivery task panicked: {}", e)))
    }

    /// Wait for the task and return its outcome.
    pub async fn wait(mut self) -> voxkey_core::error::Result<DeliveryOutcome> {
        self.join().await
    }

    /// Cancel and wait, for mode switches and shutdown.
    pub async fn cancel_and_wait(self) -> voxkey_core::error::Result<DeliveryOutcome> {
        self.cancel();
        self.wait().await
    }
}

// =============================================================================
// Tests
// =============================================================================
