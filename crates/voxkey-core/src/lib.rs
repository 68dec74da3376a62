//! Voxkey Core crate - shared error type, configuration, domain types, events.
//!
//! Every other Voxkey crate depends on this one. It holds the `VoxkeyError`
//! enum used across crate boundaries, the TOML-backed `VoxkeyConfig`, the
//! audio frame and mode types, and the `PipelineEvent` enum broadcast by the
//! session pipeline.

pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::VoxkeyConfig;
pub use error::{Result, VoxkeyError};
pub use events::PipelineEvent;
pub use types::{AudioFrame, ListenMode, SilencePreset, Timestamp};
