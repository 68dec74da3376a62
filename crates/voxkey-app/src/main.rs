//! Voxkey application binary - composition root.
//!
//! Ties together all Voxkey crates into a single executable:
//! 1. Load configuration from TOML
//! 2. Discover speech models and load the smallest one
//! 3. Build the frame queue, microphone capture, and delivery router
//! 4. Drive the session pipeline from the queue's single consumer
//! 5. Deliver finalized text word by word, canceling on supersession
//!
//! Capture and keystroke injection are Windows-only; on other platforms
//! the binary starts, logs the limitation, and delivers to the in-memory
//! transcript.

mod cli;

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;

use voxkey_audio::{
    frame_queue, AudioCaptureService, BoundaryConfig, BoundaryDetector, CaptureDeviceConfig,
    MicCaptureService,
};
use voxkey_core::config::VoxkeyConfig;
use voxkey_core::events::PipelineEvent;
use voxkey_core::types::SAMPLE_RATE_HZ;
use voxkey_decoder::{
    available_models, smallest_model, DecoderLoader, DecoderManager, ModelInfo, SpeechDecoder,
    VoskDecoder, VoskDecoderConfig,
};
use voxkey_inject::{
    find_window, DeliveryRouter, DeliveryTarget, DeliveryTask, FocusConfig, KeystrokeInjector,
    TranscriptSink,
};
use voxkey_session::{KeyPhraseSet, PipelineAction, SessionPipeline};

/// Log pipeline events as they arrive.
async fn event_logger(mut events: tokio::sync::broadcast::Receiver<PipelineEvent>) {
    while let Ok(event) = events.recv().await {
        match &event {
            PipelineEvent::PhraseMatched { phrase, .. } => {
                tracing::info!(phrase = %phrase, "Key phrase matched");
            }
            PipelineEvent::SilenceBoundary { silence_secs, .. } => {
                tracing::info!(silence_secs, "Silence boundary, submitting");
            }
            PipelineEvent::ModeDisabled { mode, reason, .. } => {
                tracing::warn!(%mode, reason = %reason, "Mode disabled after error");
            }
            PipelineEvent::DeliveryDegraded { reason, .. } => {
                tracing::warn!(reason = %reason, "Delivery degraded to transcript");
            }
            _ => tracing::debug!(event = ?event, "Pipeline event"),
        }
    }
}

fn vosk_loader() -> DecoderLoader {
    Box::new(|info: &ModelInfo| {
        let decoder = VoskDecoder::new(VoskDecoderConfig {
            model_path: info.path.to_string_lossy().into_owned(),
            model_name: info.name.clone(),
            sample_rate: SAMPLE_RATE_HZ,
        })?;
        Ok(Arc::new(decoder) as Arc<dyn SpeechDecoder>)
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::CliArgs::parse();

    // Config first; its log level is the fallback for tracing setup.
    let config_file = args.resolve_config_path();
    let config = VoxkeyConfig::load_or_default(&config_file);

    // Tracing.
    let level = args
        .resolve_log_level()
        .unwrap_or_else(|| config.general.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();

    tracing::info!("Starting Voxkey v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Model discovery. No model is fatal: there is nothing to decode with.
    let model_dir = args
        .model_dir
        .clone()
        .unwrap_or_else(|| cli::expand_home(&config.general.model_dir));

    if args.list_models {
        for model in available_models(&model_dir)? {
            println!("{}\t{} bytes\t{}", model.name, model.size_bytes, model.path.display());
        }
        return Ok(());
    }

    let initial = smallest_model(&model_dir)?;
    tracing::info!(model = %initial.name, size_bytes = initial.size_bytes, "Selected startup model");
    let manager = Arc::new(DecoderManager::new(vosk_loader(), initial)?);

    // Frame queue and capture.
    let (frame_tx, mut frame_rx) = frame_queue(config.audio.queue_capacity);
    let capture = MicCaptureService::new(
        CaptureDeviceConfig {
            device_name: args
                .device
                .clone()
                .unwrap_or_else(|| config.audio.device_name.clone()),
            sample_rate: SAMPLE_RATE_HZ,
            frame_samples: config.audio.frame_samples,
        },
        frame_tx.clone(),
    );

    // Pipeline.
    let detector = BoundaryDetector::new(
        BoundaryConfig::from_settings(&config.detector)?,
        Instant::now(),
    );
    let phrases = KeyPhraseSet::from_phrases(&config.phrases.defaults);
    let mut pipeline = SessionPipeline::new(
        Arc::clone(&manager),
        detector,
        phrases,
        config.phrases.show_phrase,
    );
    pipeline.set_mode(args.resolve_mode()?, Instant::now());

    // Delivery router, publishing degradations onto the pipeline's stream.
    let router = Arc::new(
        DeliveryRouter::new(
            Arc::new(KeystrokeInjector::new()),
            TranscriptSink::new(),
            FocusConfig {
                retries: config.delivery.focus_retries,
                retry_wait: Duration::from_millis(config.delivery.focus_retry_wait_ms),
            },
            Duration::from_millis(config.delivery.word_delay_ms),
        )
        .with_events(pipeline.event_sender()),
    );

    if let Some(title) = args.resolve_target_title()? {
        match find_window(&title) {
            Ok(Some(window)) => {
                tracing::info!(title = %window.title, "Delivery bound to window");
                router.set_target(DeliveryTarget::Window(window.id));
            }
            Ok(None) => tracing::warn!(title = %title, "No window matched, delivering at cursor"),
            Err(e) => tracing::warn!(error = %e, "Window lookup failed, delivering at cursor"),
        }
    }

    tokio::spawn(event_logger(pipeline.subscribe()));

    // Recording session.
    let session_id = pipeline.start_session(Instant::now());
    tracing::info!(session_id = %session_id, "Listening");

    if let Err(e) = capture.start().await {
        tracing::warn!(error = %e, "Audio capture unavailable, no frames will flow");
    }

    // Single consumer: every frame goes through the pipeline in order, and
    // delivery happens off this loop so frame processing never waits on
    // keystrokes. A confirm that arrives while text is still typing is
    // queued and spawned when that delivery finishes, so frames keep
    // flowing at their capture cadence in the meantime.
    let mut current_delivery: Option<DeliveryTask> = None;
    let mut pending_confirm = false;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown requested");
                break;
            }
            outcome = async {
                match current_delivery.as_mut() {
                    Some(task) => task.join().await,
                    None => std::future::pending().await,
                }
            } => {
                if let Err(e) = outcome {
                    tracing::warn!(error = %e, "Delivery task failed");
                }
                current_delivery = None;
                if pending_confirm {
                    pending_confirm = false;
                    current_delivery = Some(router.spawn(String::new(), true));
                }
            }
            frame = frame_rx.recv() => {
                let Some(frame) = frame else { break };
                for action in pipeline.process_frame(&frame, Instant::now()) {
                    match action {
                        PipelineAction::Deliver { text, submit } => {
                            // A new finalization supersedes any delivery
                            // still typing and any confirm queued behind it.
                            // Canceling waits at most one word delay.
                            pending_confirm = false;
                            if let Some(task) = current_delivery.take() {
                                let _ = task.cancel_and_wait().await;
                            }
                            current_delivery = Some(router.spawn(text, submit));
                        }
                        PipelineAction::Confirm => {
                            // Submit once in-flight text has landed.
                            if current_delivery.is_some() {
                                pending_confirm = true;
                            } else {
                                current_delivery = Some(router.spawn(String::new(), true));
                            }
                        }
                    }
                }
            }
        }
    }

    // Shutdown: stop the stream, silence the queue, cancel typing, then
    // report what the session did.
    if capture.is_active() {
        if let Err(e) = capture.stop().await {
            tracing::warn!(error = %e, "Failed to stop capture");
        }
    }
    frame_tx.set_muted(true);
    if let Some(task) = current_delivery.take() {
        let _ = task.cancel_and_wait().await;
    }
    let stale = frame_rx.drain();
    pipeline.stop_session(frame_tx.dropped());
    tracing::info!(stale_frames = stale, "Voxkey stopped");

    Ok(())
}
