//! CLI argument definitions for the Voxkey application.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use voxkey_core::types::ListenMode;
use voxkey_inject::TARGET_PRESETS;

/// Voxkey — dictation that types what you say into the focused window.
#[derive(Parser, Debug)]
#[command(name = "voxkey", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Directory containing speech model folders.
    #[arg(short = 'm', long = "model-dir")]
    pub model_dir: Option<PathBuf>,

    /// Input device name or substring ("default" for the system default).
    #[arg(long = "device")]
    pub device: Option<String>,

    /// Listen mode: default, silence, or phrase.
    #[arg(long = "mode", default_value = "default")]
    pub mode: String,

    /// Bind delivery to the first window whose title contains this text.
    #[arg(short = 'w', long = "target-window")]
    pub target_window: Option<String>,

    /// Bind delivery to a common application by preset name
    /// (e.g. notepad, word, chrome). --target-window takes precedence.
    #[arg(long = "preset")]
    pub preset: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// List discovered speech models and exit.
    #[arg(long = "list-models")]
    pub list_models: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > VOXKEY_CONFIG env var > platform default
    /// (~/.voxkey/config.toml).
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("VOXKEY_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    /// Returns `None` if not overridden.
    pub fn resolve_log_level(&self) -> Option<String> {
        self.log_level.clone()
    }

    /// Resolve the window title to bind delivery to, if any.
    ///
    /// Priority: --target-window > --preset. A preset name matches one of
    /// the known target titles by case-insensitive substring.
    pub fn resolve_target_title(&self) -> Result<Option<String>, String> {
        if let Some(ref title) = self.target_window {
            return Ok(Some(title.clone()));
        }
        let Some(ref name) = self.preset else {
            return Ok(None);
        };
        let needle = name.to_lowercase();
        TARGET_PRESETS
            .iter()
            .find(|preset| preset.to_lowercase().contains(&needle))
            .map(|preset| Some(preset.to_string()))
            .ok_or_else(|| {
                format!(
                    "unknown preset '{}' (expected one of: {})",
                    name,
                    TARGET_PRESETS.join(", ")
                )
            })
    }

    /// Parse the requested listen mode.
    pub fn resolve_mode(&self) -> Result<ListenMode, String> {
        match self.mode.to_lowercase().as_str() {
            "default" => Ok(ListenMode::Default),
            "silence" | "silence_boundary" => Ok(ListenMode::SilenceBoundary),
            "phrase" | "key_phrase" => Ok(ListenMode::KeyPhrase),
            other => Err(format!(
                "unknown mode '{}' (expected default, silence, or phrase)",
                other
            )),
        }
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".voxkey").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".voxkey").join("config.toml");
    }
    PathBuf::from("config.toml")
}

/// Expand a leading ~ to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if path.starts_with("~/") || path.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&path[2..])
    } else {
        PathBuf::from(path)
    }
}
