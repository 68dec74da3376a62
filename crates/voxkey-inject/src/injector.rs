//! Keystroke injection via Windows SendInput API.
//!
//! On Windows, simulates keyboard input to type text into the focused
//! application. Each character is sent as a Unicode keystroke using
//! `SendInput` with `KEYEVENTF_UNICODE`; the submit action presses the
//! Enter key as a virtual-key event.
//!
//! On non-Windows, returns `VoxkeyError::Delivery`.

#[cfg(not(target_os = "windows"))]
use tracing::warn;

use voxkey_core::error::Result;
#[cfg(not(target_os = "windows"))]
use voxkey_core::error::VoxkeyError;

use crate::DeliverySink;

/// Types text and presses Enter in the focused application.
pub struct KeystrokeInjector;

impl KeystrokeInjector {
    pub fn new() -> Self {
        Self
    }

    /// Type the given text into the currently focused application.
    ///
    /// Each character becomes a key-down / key-up pair via `SendInput`
    /// with Unicode input events.
    #[cfg(target_os = "windows")]
    pub fn type_text(&self, text: &str) -> Result<()> {
        use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
            SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYEVENTF_KEYUP,
            KEYEVENTF_UNICODE,
        };

        use voxkey_core::error::VoxkeyError;

        if text.is_empty() {
            return Ok(());
        }

        tracing::debug!(text_len = text.len(), "Typing text via SendInput");

        let mut inputs: Vec<INPUT> = Vec::new();

        for ch in text.chars() {
            let scan_code = ch as u16;

            // Key down
            inputs.push(INPUT {
                r#type: INPUT_KEYBOARD,
                Anonymous: INPUT_0 {
                    ki: KEYBDINPUT {
                        wVk: 0,
                        wScan: scan_code,
                        dwFlags: KEYEVENTF_UNICODE,
                        time: 0,
                        dwExtraInfo: 0,
                    },
                },
            });

            // Key up
            inputs.push(INPUT {
                r#type: INPUT_KEYBOARD,
                Anonymous: INPUT_0 {
                    ki: KEYBDINPUT {
                        wVk: 0,
                        wScan: scan_code,
                        dwFlags: KEYEVENTF_UNICODE | KEYEVENTF_KEYUP,
                        time: 0,
                        dwExtraInfo: 0,
                    },
                },
            });
        }

        let sent = unsafe {
            SendInput(
                inputs.len() as u32,
                inputs.as_ptr(),
                std::mem::size_of::<INPUT>() as i32,
            )
        };

        if sent as usize != inputs.len() {
            return Err(VoxkeyError::Delivery(format!(
                "SendInput only sent {} of {} events",
                sent,
                inputs.len()
            )));
        }

        Ok(())
    }

    /// Stub on non-Windows: logs and fails so the router can fall back.
    #[cfg(not(target_os = "windows"))]
    pub fn type_text(&self, text: &str) -> Result<()> {
        warn!(
            text_len = text.len(),
            "KeystrokeInjector: SendInput not available on this platform"
        );
        Err(VoxkeyError::Delivery(
            "Keystroke injection is only available on Windows".into(),
        ))
    }

    /// Press and release the Enter key.
    #[cfg(target_os = "windows")]
    pub fn press_enter(&self) -> Result<()> {
        use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
            SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYEVENTF_KEYUP, VK_RETURN,
        };

        use voxkey_core::error::VoxkeyError;

        tracing::debug!("Pressing Enter via SendInput");

        let inputs = [
            INPUT {
                r#type: INPUT_KEYBOARD,
                Anonymous: INPUT_0 {
                    ki: KEYBDINPUT {
                        wVk: VK_RETURN,
                        wScan: 0,
                        dwFlags: 0,
                        time: 0,
                        dwExtraInfo: 0,
                    },
                },
            },
            INPUT {
                r#type: INPUT_KEYBOARD,
                Anonymous: INPUT_0 {
                    ki: KEYBDINPUT {
                        wVk: VK_RETURN,
                        wScan: 0,
                        dwFlags: KEYEVENTF_KEYUP,
                        time: 0,
                        dwExtraInfo: 0,
                    },
                },
            },
        ];

        let sent = unsafe {
            SendInput(
                inputs.len() as u32,
                inputs.as_ptr(),
                std::mem::size_of::<INPUT>() as i32,
            )
        };

        if sent as usize != inputs.len() {
            return Err(VoxkeyError::Delivery(
                "SendInput failed to press Enter".to_string(),
            ));
        }

        Ok(())
    }

    #[cfg(not(target_os = "windows"))]
    pub fn press_enter(&self) -> Result<()> {
        Err(VoxkeyError::Delivery(
            "Keystroke injection is only available on Windows".into(),
        ))
    }
}

impl Default for KeystrokeInjector {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliverySink for KeystrokeInjector {
    /// Type the token followed by a space, so consecutive words read
    /// naturally in the target application.
    fn deliver_token(&self, token: &str) -> Result<()> {
        let mut text = String::with_capacity(token.len() + 1);
        text.push_str(token);
        text.push(' ');
        self.type_text(&text)
    }

    fn confirm(&self) -> Result<()> {
        self.press_enter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
