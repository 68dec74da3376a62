use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{ListenMode, Timestamp};

/// All pipeline events that can occur in the Voxkey system.
///
/// Events are emitted by the session pipeline after state changes and
/// consumed by the application loop for status display and logging.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum PipelineEvent {
    // =========================================================================
    // Recording lifecycle
    // =========================================================================
    /// Audio capture started.
    RecordingStarted {
        session_id: Uuid,
        timestamp: Timestamp,
    },

    /// Audio capture stopped and the frame queue was drained.
    RecordingStopped {
        session_id: Uuid,
        frames_processed: u64,
        frames_dropped: u64,
        timestamp: Timestamp,
    },

    // =========================================================================
    // Boundary detection
    // =========================================================================
    /// A sustained stretch of silence crossed the configured duration and a
    /// confirm action was triggered.
    SilenceBoundary {
        silence_secs: f64,
        timestamp: Timestamp,
    },

    // =========================================================================
    // Finalized text
    // =========================================================================
    /// The decoder finalized an utterance and it was forwarded for delivery.
    UtteranceFinalized {
        text_len: usize,
        timestamp: Timestamp,
    },

    /// A finalized utterance was identical to the previous one and was not
    /// re-delivered.
    DuplicateSuppressed { timestamp: Timestamp },

    /// A finalized utterance exactly matched a key phrase.
    PhraseMatched {
        phrase: String,
        timestamp: Timestamp,
    },

    // =========================================================================
    // Modes
    // =========================================================================
    /// The active listen mode changed.
    ModeChanged {
        from: ListenMode,
        to: ListenMode,
        timestamp: Timestamp,
    },

    /// A mode raised an error while processing a frame and was forcibly
    /// disabled; the pipeline continues in Default mode.
    ModeDisabled {
        mode: ListenMode,
        reason: String,
        timestamp: Timestamp,
    },

    // =========================================================================
    // Delivery / decoder
    // =========================================================================
    /// A delivery could not reach its preferred sink and fell back to the
    /// transcript.
    DeliveryDegraded {
        reason: String,
        timestamp: Timestamp,
    },

    /// The active speech model was switched.
    DecoderSwitched {
        model: String,
        timestamp: Timestamp,
    },

    /// A model switch failed; the previous model remains active.
    DecoderSwitchFailed {
        model: String,
        reason: String,
        timestamp: Timestamp,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_roundtrip() {
        let events = vec![
            PipelineEvent::RecordingStarted {
                session_id: Uuid::new_v4(),
                timestamp: Timestamp::now(),
            },
            PipelineEvent::SilenceBoundary {
                silence_secs: 5.0,
                timestamp: Timestamp::now(),
            },
            PipelineEvent::PhraseMatched {
                phrase: "send it".to_string(),
                timestamp: Timestamp::now(),
            },
            PipelineEvent::ModeChanged {
                from: ListenMode::Default,
                to: ListenMode::KeyPhrase,
                timestamp: Timestamp::now(),
            },
            PipelineEvent::DeliveryDegraded {
                reason: "focus failed".to_string(),
                timestamp: Timestamp::now(),
            },
        ];

        for event in events {
            let json = serde_json::to_string(&event).unwrap();
            let _rt: PipelineEvent = serde_json::from_str(&json).unwrap();
        }
    }

    #[test]
    fn test_mode_disabled_event_carries_reason() {
        let event = PipelineEvent::ModeDisabled {
            mode: ListenMode::SilenceBoundary,
            reason: "frame size mismatch".to_string(),
            timestamp: Timestamp::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("frame size mismatch"));
        assert!(json.contains("silence_boundary"));
    }
}
