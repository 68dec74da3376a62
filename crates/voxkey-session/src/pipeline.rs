//! The per-frame session pipeline.
//!
//! A single consumer drives every frame through the same sequence:
//! boundary detection (when that mode is active), decoding, then the
//! submission policy. The pipeline owns the mode state and emits
//! [`PipelineEvent`]s over a broadcast channel; it returns plain actions
//! and leaves actually typing text to the delivery layer, so frame
//! processing never blocks on keystrokes.
//!
//! Errors raised by an active special mode are contained: the mode is
//! forcibly disabled and processing continues in Default mode.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;
use uuid::Uuid;

use voxkey_audio::BoundaryDetector;
use voxkey_core::events::PipelineEvent;
use voxkey_core::types::{AudioFrame, ListenMode, Timestamp};
use voxkey_decoder::{DecoderManager, ModelInfo};

use crate::mode::ModeController;
use crate::policy::{KeyPhraseSet, SubmissionPolicy};

/// Capacity of the pipeline event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// What the caller should do after a processed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineAction {
    /// Deliver this text word by word; when `submit` is set, run the
    /// submit action after the last word.
    Deliver { text: String, submit: bool },
    /// Run the submit action on whatever has been delivered so far.
    Confirm,
}

struct SessionState {
    id: Uuid,
    frames_processed: u64,
}

pub struct SessionPipeline {
    decoder: Arc<DecoderManager>,
    detector: BoundaryDetector,
    policy: SubmissionPolicy,
    phrases: KeyPhraseSet,
    modes: ModeController,
    events: broadcast::Sender<PipelineEvent>,
    session: Option<SessionState>,
}

impl SessionPipeline {
    pub fn new(
        decoder: Arc<DecoderManager>,
        detector: BoundaryDetector,
        phrases: KeyPhraseSet,
        show_phrase: bool,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            decoder,
            detector,
            policy: SubmissionPolicy::new(show_phrase),
            phrases,
            modes: ModeController::new(),
            events,
            session: None,
        }
    }

    /// Subscribe to pipeline events.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    /// A sender handle so collaborating components (e.g. the delivery
    /// layer) can publish onto the same event stream.
    pub fn event_sender(&self) -> broadcast::Sender<PipelineEvent> {
        self.events.clone()
    }

    pub fn mode(&self) -> ListenMode {
        self.modes.mode()
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Switch the active listen mode. Entering silence-boundary mode
    /// restarts the detector clocks so stale silence cannot fire
    /// immediately.
    pub fn set_mode(&mut self, to: ListenMode, now: Instant) {
        if let Some(transition) = self.modes.set(to) {
            if to == ListenMode::SilenceBoundary {
                self.detector.reset(now);
            }
            self.emit(PipelineEvent::ModeChanged {
                from: transition.from,
                to: transition.to,
                timestamp: Timestamp::now(),
            });
        }
    }

    /// Toggle a mode on or back to Default.
    pub fn toggle_mode(&mut self, mode: ListenMode, now: Instant) {
        if let Some(transition) = self.modes.toggle(mode) {
            if transition.to == ListenMode::SilenceBoundary {
                self.detector.reset(now);
            }
            self.emit(PipelineEvent::ModeChanged {
                from: transition.from,
                to: transition.to,
                timestamp: Timestamp::now(),
            });
        }
    }

    /// Begin a recording session: fresh decoder state, no remembered
    /// utterance, fresh detector clocks.
    pub fn start_session(&mut self, now: Instant) -> Uuid {
        let id = Uuid::new_v4();
        if let Ok(decoder) = self.decoder.active() {
            decoder.reset();
        }
        self.policy.reset();
        self.detector.reset(now);
        self.session = Some(SessionState {
            id,
            frames_processed: 0,
        });
        tracing::info!(session_id = %id, "Recording session started");
        self.emit(PipelineEvent::RecordingStarted {
            session_id: id,
            timestamp: Timestamp::now(),
        });
        id
    }

    /// End the recording session. `frames_dropped` comes from the frame
    /// queue's overflow counter.
    pub fn stop_session(&mut self, frames_dropped: u64) {
        if let Some(state) = self.session.take() {
            tracing::info!(
                session_id = %state.id,
                frames_processed = state.frames_processed,
                frames_dropped,
                "Recording session stopped"
            );
            self.emit(PipelineEvent::RecordingStopped {
                session_id: state.id,
                frames_processed: state.frames_processed,
                frames_dropped,
                timestamp: Timestamp::now(),
            });
        }
    }

    /// Switch to a different speech model. Failure keeps the previous
    /// model active.
    pub fn switch_model(&self, model: &ModelInfo) {
        match self.decoder.switch(model) {
            Ok(()) => self.emit(PipelineEvent::DecoderSwitched {
                model: model.name.clone(),
                timestamp: Timestamp::now(),
            }),
            Err(e) => self.emit(PipelineEvent::DecoderSwitchFailed {
                model: model.name.clone(),
                reason: e.to_string(),
                timestamp: Timestamp::now(),
            }),
        }
    }

    /// Process one captured frame.
    ///
    /// Never fails: errors from the active special mode disable that mode
    /// and are reported as events, and decoding errors in Default mode
    /// drop the frame.
    pub fn process_frame(&mut self, frame: &AudioFrame, now: Instant) -> Vec<PipelineAction> {
        let mut actions = Vec::new();

        if let Some(state) = self.session.as_mut() {
            state.frames_processed += 1;
        }

        if self.modes.mode() == ListenMode::SilenceBoundary {
            match self.detector.observe(frame, now) {
                Ok(Some(event)) => {
                    self.emit(PipelineEvent::SilenceBoundary {
                        silence_secs: event.silence.as_secs_f64(),
                        timestamp: Timestamp::now(),
                    });
                    actions.push(PipelineAction::Confirm);
                }
                Ok(None) => {}
                Err(e) => {
                    self.disable_active_mode(&e.to_string());
                    return actions;
                }
            }
        }

        let decoder = match self.decoder.active() {
            Ok(d) => d,
            Err(e) => {
                tracing::error!(error = %e, "No active decoder, dropping frame");
                return actions;
            }
        };

        match decoder.accept_frame(frame) {
            Ok(Some(text)) => {
                let outcome = self.policy.evaluate(&text, self.modes.mode(), &self.phrases);
                if outcome.phrase_matched {
                    self.emit(PipelineEvent::PhraseMatched {
                        phrase: text.clone(),
                        timestamp: Timestamp::now(),
                    });
                }
                if outcome.duplicate {
                    self.emit(PipelineEvent::DuplicateSuppressed {
                        timestamp: Timestamp::now(),
                    });
                }
                if let Some(display) = outcome.display {
                    self.emit(PipelineEvent::UtteranceFinalized {
                        text_len: display.len(),
                        timestamp: Timestamp::now(),
                    });
                    actions.push(PipelineAction::Deliver {
                        text: display,
                        submit: outcome.submit,
                    });
                } else if outcome.submit {
                    // Phrase matched with display hidden or suppressed:
                    // submit whatever has already been typed.
                    actions.push(PipelineAction::Confirm);
                }
            }
            Ok(None) => {}
            Err(e) => {
                if self.modes.mode() != ListenMode::Default {
                    self.disable_active_mode(&e.to_string());
                } else {
                    tracing::error!(error = %e, "Decoder error, dropping frame");
                }
            }
        }

        actions
    }

    fn disable_active_mode(&mut self, reason: &str) {
        let mode = self.modes.mode();
        tracing::error!(%mode, reason, "Disabling listen mode after error");
        self.modes.force_default();
        self.emit(PipelineEvent::ModeDisabled {
            mode,
            reason: reason.to_string(),
            timestamp: Timestamp::now(),
        });
    }

    fn emit(&self, event: PipelineEvent) {
        // No subscribers is fine; events are advisory.
        let _ = self.events.send(event);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    use voxkey_audio::BoundaryConfig;
    use voxkey_core::error::VoxkeyError;
    use voxkey_decoder::{DecoderLoader, MockDecoder, SpeechDecoder};

    fn model(name: &str) -> ModelInfo {
        ModelInfo {
            name: name.to_string(),
            path: PathBuf::from(format!("/models/{}", name)),
            size_bytes: 1,
        }
    }

    /// A manager whose decoder is a shared, scriptable mock.
    fn mock_manager() -> (Arc<DecoderManager>, Arc<MockDecoder>) {
        let mock = Arc::new(MockDecoder::new());
        let shared = Arc::clone(&mock);
        let loader: DecoderLoader =
            Box::new(move |_| Ok(Arc::clone(&shared) as Arc<dyn SpeechDecoder>));
        let manager = Arc::new(DecoderManager::new(loader, model("small")).unwrap());
        (manager, mock)
    }

    fn detector(silence_secs: u64) -> BoundaryDetector {
        let config = BoundaryConfig {
            silence_threshold: 500.0,
            silence_duration: Duration::from_secs(silence_secs),
            min_submission_interval: Duration::from_secs(1),
        };
        BoundaryDetector::new(config, Instant::now())
    }

    fn pipeline(show_phrase: bool) -> (SessionPipeline, Arc<MockDecoder>) {
        let (manager, mock) = mock_manager();
        let pipeline = SessionPipeline::new(
            manager,
            detector(3),
            KeyPhraseSet::with_defaults(),
            show_phrase,
        );
        (pipeline, mock)
    }

    fn quiet() -> AudioFrame {
        AudioFrame::constant(100)
    }

    fn drain(rx: &mut broadcast::Receiver<PipelineEvent>) -> Vec<PipelineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_default_mode_delivers_without_submit() {
        let (mut pipeline, mock) = pipeline(true);
        mock.push_final("hello world");

        let actions = pipeline.process_frame(&quiet(), Instant::now());
        assert_eq!(
            actions,
            vec![PipelineAction::Deliver {
                text: "hello world".to_string(),
                submit: false
            }]
        );
    }

    #[test]
    fn test_no_finalization_no_actions() {
        let (mut pipeline, mock) = pipeline(true);
        mock.push_silence();
        assert!(pipeline.process_frame(&quiet(), Instant::now()).is_empty());
    }

    #[test]
    fn test_duplicate_suppressed_with_event() {
        let (mut pipeline, mock) = pipeline(true);
        let mut rx = pipeline.subscribe();
        mock.push_final("same thing");
        mock.push_final("same thing");

        pipeline.process_frame(&quiet(), Instant::now());
        let actions = pipeline.process_frame(&quiet(), Instant::now());

        assert!(actions.is_empty());
        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, PipelineEvent::DuplicateSuppressed { .. })));
    }

    #[test]
    fn test_key_phrase_delivers_and_submits() {
        let (mut pipeline, mock) = pipeline(true);
        let mut rx = pipeline.subscribe();
        pipeline.set_mode(ListenMode::KeyPhrase, Instant::now());
        mock.push_final("Send It");

        let actions = pipeline.process_frame(&quiet(), Instant::now());
        assert_eq!(
            actions,
            vec![PipelineAction::Deliver {
                text: "send it".to_string(),
                submit: true
            }]
        );
        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, PipelineEvent::PhraseMatched { phrase, .. } if phrase == "send it")));
    }

    #[test]
    fn test_key_phrase_hidden_confirms_only() {
        let (mut pipeline, mock) = pipeline(false);
        pipeline.set_mode(ListenMode::KeyPhrase, Instant::now());
        mock.push_final("that's it");

        let actions = pipeline.process_frame(&quiet(), Instant::now());
        assert_eq!(actions, vec![PipelineAction::Confirm]);
    }

    #[test]
    fn test_utterance_containing_phrase_is_plain_text() {
        let (mut pipeline, mock) = pipeline(true);
        pipeline.set_mode(ListenMode::KeyPhrase, Instant::now());
        mock.push_final("please send it now");

        let actions = pipeline.process_frame(&quiet(), Instant::now());
        assert_eq!(
            actions,
            vec![PipelineAction::Deliver {
                text: "please send it now".to_string(),
                submit: false
            }]
        );
    }

    #[test]
    fn test_silence_boundary_confirms() {
        let (mut pipeline, mock) = pipeline(true);
        let mut rx = pipeline.subscribe();
        let t0 = Instant::now();
        pipeline.set_mode(ListenMode::SilenceBoundary, t0);

        // 3 s silence window; frames every 0.5 s.
        let mut confirms = 0;
        for i in 1..=8 {
            mock.push_silence();
            let now = t0 + Duration::from_millis(500 * i);
            for action in pipeline.process_frame(&quiet(), now) {
                if action == PipelineAction::Confirm {
                    confirms += 1;
                }
            }
        }

        assert_eq!(confirms, 1);
        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, PipelineEvent::SilenceBoundary { .. })));
    }

    #[test]
    fn test_detector_ignored_outside_silence_mode() {
        let (mut pipeline, mock) = pipeline(true);
        let t0 = Instant::now();

        // Default mode: no amount of silence triggers a confirm.
        for i in 1..=20 {
            mock.push_silence();
            let actions = pipeline.process_frame(&quiet(), t0 + Duration::from_millis(500 * i));
            assert!(actions.is_empty());
        }
    }

    #[test]
    fn test_mode_error_contained() {
        let (mut pipeline, _mock) = pipeline(true);
        let mut rx = pipeline.subscribe();
        let t0 = Instant::now();
        pipeline.set_mode(ListenMode::SilenceBoundary, t0);

        // An empty frame makes the detector error; the mode must be
        // disabled, not the pipeline.
        let actions = pipeline.process_frame(&AudioFrame::new(Vec::new()), t0);
        assert!(actions.is_empty());
        assert_eq!(pipeline.mode(), ListenMode::Default);

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            PipelineEvent::ModeDisabled {
                mode: ListenMode::SilenceBoundary,
                ..
            }
        )));
    }

    #[test]
    fn test_pipeline_survives_mode_error() {
        let (mut pipeline, mock) = pipeline(true);
        let t0 = Instant::now();
        pipeline.set_mode(ListenMode::SilenceBoundary, t0);
        pipeline.process_frame(&AudioFrame::new(Vec::new()), t0);

        // Subsequent frames keep flowing in Default mode.
        mock.push_final("still working");
        let actions = pipeline.process_frame(&quiet(), t0 + Duration::from_secs(1));
        assert_eq!(
            actions,
            vec![PipelineAction::Deliver {
                text: "still working".to_string(),
                submit: false
            }]
        );
    }

    #[test]
    fn test_decoder_error_disables_key_phrase_mode() {
        let (mut pipeline, mock) = pipeline(true);
        pipeline.set_mode(ListenMode::KeyPhrase, Instant::now());
        mock.push_error("engine fault");

        pipeline.process_frame(&quiet(), Instant::now());
        assert_eq!(pipeline.mode(), ListenMode::Default);
    }

    #[test]
    fn test_decoder_error_in_default_mode_drops_frame() {
        let (mut pipeline, mock) = pipeline(true);
        mock.push_error("engine fault");
        mock.push_final("recovered");

        assert!(pipeline.process_frame(&quiet(), Instant::now()).is_empty());
        assert_eq!(pipeline.mode(), ListenMode::Default);
        let actions = pipeline.process_frame(&quiet(), Instant::now());
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn test_mode_change_emits_event() {
        let (mut pipeline, _mock) = pipeline(true);
        let mut rx = pipeline.subscribe();
        pipeline.set_mode(ListenMode::KeyPhrase, Instant::now());

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            PipelineEvent::ModeChanged {
                from: ListenMode::Default,
                to: ListenMode::KeyPhrase,
                ..
            }
        )));
    }

    #[test]
    fn test_session_lifecycle_events_and_counts() {
        let (mut pipeline, mock) = pipeline(true);
        let mut rx = pipeline.subscribe();
        let t0 = Instant::now();

        let id = pipeline.start_session(t0);
        assert!(pipeline.is_recording());
        for _ in 0..3 {
            mock.push_silence();
            pipeline.process_frame(&quiet(), t0);
        }
        pipeline.stop_session(2);
        assert!(!pipeline.is_recording());

        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, PipelineEvent::RecordingStarted { session_id, .. } if *session_id == id)));
        assert!(events.iter().any(|e| matches!(
            e,
            PipelineEvent::RecordingStopped {
                frames_processed: 3,
                frames_dropped: 2,
                ..
            }
        )));
    }

    #[test]
    fn test_start_session_clears_duplicate_memory() {
        let (mut pipeline, mock) = pipeline(true);
        let t0 = Instant::now();

        mock.push_final("hello");
        pipeline.process_frame(&quiet(), t0);

        pipeline.start_session(t0);
        mock.push_final("hello");
        let actions = pipeline.process_frame(&quiet(), t0);
        // Not a duplicate across session boundaries.
        assert_eq!(actions.len(), 1);
        assert_eq!(mock.reset_count(), 1);
    }

    #[test]
    fn test_switch_model_events() {
        let mock = Arc::new(MockDecoder::new());
        let shared = Arc::clone(&mock);
        let loader: DecoderLoader = Box::new(move |info| {
            if info.name.contains("broken") {
                Err(VoxkeyError::Decoder("corrupt".to_string()))
            } else {
                Ok(Arc::clone(&shared) as Arc<dyn SpeechDecoder>)
            }
        });
        let manager = Arc::new(DecoderManager::new(loader, model("small")).unwrap());
        let pipeline =
            SessionPipeline::new(manager, detector(3), KeyPhraseSet::with_defaults(), true);
        let mut rx = pipeline.subscribe();

        pipeline.switch_model(&model("large"));
        pipeline.switch_model(&model("broken-large"));

        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, PipelineEvent::DecoderSwitched { model, .. } if model == "large")));
        assert!(events.iter().any(
            |e| matches!(e, PipelineEvent::DecoderSwitchFailed { model, .. } if model == "broken-large")
        ));
    }
}
