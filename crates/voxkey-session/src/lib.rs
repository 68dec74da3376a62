//! Voxkey Session crate - listen modes, submission policy, and the frame
//! pipeline.
//!
//! Ties the audio, decoder, and delivery layers together: a single
//! consumer feeds captured frames through boundary detection, decoding,
//! and the submission policy, and the resulting actions tell the
//! application what to deliver and when to submit.

pub mod mode;
pub mod pipeline;
pub mod policy;

pub use mode::{ModeController, ModeTransition};
pub use pipeline::{PipelineAction, SessionPipeline};
pub use policy::{KeyPhraseSet, PolicyOutcome, SubmissionPolicy, DEFAULT_PHRASES};
