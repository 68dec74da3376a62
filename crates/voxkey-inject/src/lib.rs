//! Voxkey Inject crate - text delivery to the focused application.
//!
//! Finalized utterances leave the pipeline through a [`DeliverySink`]:
//! either simulated keystrokes into the focused application (optionally
//! re-focusing a bound target window first) or an in-memory transcript
//! when no injection target is usable. The [`delivery`] module routes
//! between sinks and runs the cancelable word-by-word delivery task.

use std::sync::{Arc, Mutex};

use voxkey_core::error::{Result, VoxkeyError};

pub mod delivery;
pub mod injector;
pub mod window;

pub use delivery::{DeliveryOutcome, DeliveryRouter, DeliveryTarget, DeliveryTask};
pub use injector::KeystrokeInjector;
pub use window::{
    ensure_focus, find_window, list_windows, FocusConfig, WindowId, WindowInfo, TARGET_PRESETS,
};

// =============================================================================
// Traits
// =============================================================================

/// Destination for delivered text.
///
/// `deliver_token` emits one word (the sink decides spacing); `confirm`
/// performs the submit action, e.g. pressing Enter.
pub trait DeliverySink: Send + Sync {
    fn deliver_token(&self, token: &str) -> Result<()>;

    fn confirm(&self) -> Result<()>;
}

// =============================================================================
// Transcript sink
// =============================================================================

/// Fallback sink that appends to an in-memory transcript.
///
/// Always succeeds, which makes it the sink of last resort when keystroke
/// injection or window focus fails.
#[derive(Debug, Clone, Default)]
pub struct TranscriptSink {
    text: Arc<Mutex<String>>,
}

impl TranscriptSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The accumulated transcript.
    pub fn contents(&self) -> String {
        self.text.lock().map(|t| t.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut text) = self.text.lock() {
            text.clear();
        }
    }
}

impl DeliverySink for TranscriptSink {
    fn deliver_token(&self, token: &str) -> Result<()> {
        let mut text = self
            .text
            .lock()
            .map_err(|_| VoxkeyError::Delivery("Transcript lock poisoned".to_string()))?;
        text.push_str(token);
        text.push(' ');
        Ok(())
    }

    fn confirm(&self) -> Result<()> {
        let mut text = self
            .text
            .lock()
            .map_err(|_| VoxkeyError::Delivery("Transcript lock poisoned".to_string()))?;
        text.push('\n');
        Ok(())
    }
}

// =============================================================================
// Mock sink
// =============================================================================

/// Recording sink for tests. Optionally fails every call.
#[derive(Debug, Clone, Default)]
pub struct MockSink {
    tokens: Arc<Mutex<Vec<String>>>,
    confirms: Arc<Mutex<u64>>,
    failing: bool,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().map(|t| t.clone()).unwrap_or_default()
    }

    pub fn confirm_count(&self) -> u64 {
        self.confirms.lock().map(|c| *c).unwrap_or(0)
    }
}

impl DeliverySink for MockSink {
    fn deliver_token(&self, token: &str) -> Result<()> {
        if self.failing {
            return Err(VoxkeyError::Delivery("mock sink failure".to_string()));
        }
        if let Ok(mut tokens) = self.tokens.lock() {
            tokens.push(token.to_string());
        }
        Ok(())
    }

    fn confirm(&self) -> Result<()> {
        if self.failing {
            return Err(VoxkeyError::Delivery("mock sink failure".to_string()));
        }
        if let Ok(mut confirms) = self.confirms.lock() {
            *confirms += 1;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_sink_accumulates() {
        let sink = TranscriptSink::new();
        sink.deliver_token("hello").unwrap();
        sink.deliver_token("world").unwrap();
        assert_eq!(sink.contents(), "hello world ");
    }

    #[test]
    fn test_transcript_confirm_adds_newline() {
        let sink = TranscriptSink::new();
        sink.deliver_token("done").unwrap();
        sink.confirm().unwrap();
        assert_eq!(sink.contents(), "done \n");
    }

    #[test]
    fn test_transcript_clear() {
        let sink = TranscriptSink::new();
        sink.deliver_token("stale").unwrap();
        sink.clear();
        assert!(sink.contents().is_empty());
    }

    #[test]
    fn test_mock_sink_records() {
        let sink = MockSink::new();
        sink.deliver_token("one").unwrap();
        sink.confirm().unwrap();
        assert_eq!(sink.tokens(), vec!["one"]);
        assert_eq!(sink.confirm_count(), 1);
    }

    #[test]
    fn test_failing_mock_sink() {
        let sink = MockSink::failing();
        assert!(sink.deliver_token("x").is_err());
        assert!(sink.confirm().is_err());
    }
}
