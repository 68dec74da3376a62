//! Listen mode state with mutual exclusion.
//!
//! Exactly one mode is active at a time: plain dictation (Default),
//! silence-boundary submission, or key-phrase submission. Enabling one of
//! the special modes implicitly disables the other; a mode that errors is
//! forced back to Default.

use voxkey_core::types::ListenMode;

/// A completed mode change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeTransition {
    pub from: ListenMode,
    pub to: ListenMode,
}

/// Tracks the active listen mode.
#[derive(Debug, Default)]
pub struct ModeController {
    mode: ListenMode,
}

impl ModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> ListenMode {
        self.mode
    }

    /// Switch to `to`. Returns the transition, or `None` when the mode is
    /// already active. Because only one mode is stored, activating
    /// silence-boundary while key-phrase is active (or vice versa)
    /// deactivates the other as part of the same transition.
    pub fn set(&mut self, to: ListenMode) -> Option<ModeTransition> {
        if self.mode == to {
            return None;
        }
        let from = self.mode;
        self.mode = to;
        tracing::info!(%from, %to, "Listen mode changed");
        Some(ModeTransition { from, to })
    }

    /// Toggle a mode: activate it, or return to Default if it is already
    /// active.
    pub fn toggle(&mut self, mode: ListenMode) -> Option<ModeTransition> {
        if self.mode == mode {
            self.set(ListenMode::Default)
        } else {
            self.set(mode)
        }
    }

    /// Force Default after a mode error. Returns the transition when a
    /// special mode was actually active.
    pub fn force_default(&mut self) -> Option<ModeTransition> {
        self.set(ListenMode::Default)
    }
}
