//! Target window enumeration and focus management.
//!
//! Delivery can be bound to a specific window; before typing, that window
//! is restored and brought to the foreground, with a bounded number of
//! verification retries. On non-Windows platforms enumeration returns an
//! empty list and focus always fails, which pushes delivery to the
//! transcript fallback.

use std::time::Duration;

use voxkey_core::error::Result;
#[cfg(not(target_os = "windows"))]
use voxkey_core::error::VoxkeyError;

/// Opaque handle to a top-level window (HWND on Windows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub isize);

/// A visible top-level window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub id: WindowId,
    pub title: String,
}

/// Focus acquisition tunables.
#[derive(Debug, Clone)]
pub struct FocusConfig {
    /// How many times to re-check the foreground window after requesting
    /// focus.
    pub retries: u32,
    /// Wait between checks.
    pub retry_wait: Duration,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            retries: 10,
            retry_wait: Duration::from_millis(50),
        }
    }
}

/// Quick-select titles for common dictation targets. Matching is
/// case-insensitive substring against the window title.
pub const TARGET_PRESETS: &[&str] = &["Notepad", "Microsoft Word", "Google Chrome"];

/// Find the first visible window whose title contains `title_part`
/// (case-insensitive).
pub fn find_window(title_part: &str) -> Result<Option<WindowInfo>> {
    let needle = title_part.to_lowercase();
    Ok(list_windows()?
        .into_iter()
        .find(|w| w.title.to_lowercase().contains(&needle)))
}

// =============================================================================
// Windows implementation
// =============================================================================

/// Enumerate all visible, titled top-level windows.
#[cfg(target_os = "windows")]
pub fn list_windows() -> Result<Vec<WindowInfo>> {
    use windows_sys::Win32::Foundation::{HWND, LPARAM};
    use windows_sys::Win32::UI::WindowsAndMessaging::{
        EnumWindows, GetWindowTextLengthW, GetWindowTextW, IsWindowVisible,
    };

    unsafe extern "system" fn enum_callback(hwnd: HWND, lparam: LPARAM) -> i32 {
        let windows = &mut *(lparam as *mut Vec<WindowInfo>);
        if IsWindowVisible(hwnd) != 0 {
            let len = GetWindowTextLengthW(hwnd);
            if len > 0 {
                let mut buf = vec![0u16; len as usize + 1];
                let copied = GetWindowTextW(hwnd, buf.as_mut_ptr(), buf.len() as i32);
                if copied > 0 {
                    let title = String::from_utf16_lossy(&buf[..copied as usize]);
                    windows.push(WindowInfo {
                        id: WindowId(hwnd as isize),
                        title,
                    });
                }
            }
        }
        1 // Continue enumeration.
    }

    let mut windows: Vec<WindowInfo> = Vec::new();
    unsafe {
        EnumWindows(Some(enum_callback), &mut windows as *mut _ as LPARAM);
    }

    tracing::debug!(count = windows.len(), "Enumerated visible windows");
    Ok(windows)
}

/// Bring `window` to the foreground, verifying with bounded retries.
///
/// Returns `Ok(true)` when the window holds focus afterwards, `Ok(false)`
/// when it could not be focused. The caller decides whether to fall back.
#[cfg(target_os = "windows")]
pub async fn ensure_focus(window: WindowId, config: &FocusConfig) -> Result<bool> {
    use windows_sys::Win32::Foundation::HWND;
    use windows_sys::Win32::UI::WindowsAndMessaging::{
        GetForegroundWindow, SetForegroundWindow, ShowWindow, SW_RESTORE,
    };

    let hwnd = window.0 as HWND;

    unsafe {
        if GetForegroundWindow() == hwnd {
            return Ok(true);
        }
        ShowWindow(hwnd, SW_RESTORE);
        SetForegroundWindow(hwnd);
    }

    for _ in 0..config.retries {
        if unsafe { GetForegroundWindow() } == hwnd {
            return Ok(true);
        }
        tokio::time::sleep(config.retry_wait).await;
    }

    let focused = unsafe { GetForegroundWindow() } == hwnd;
    if !focused {
        tracing::warn!(window = window.0, "Failed to focus target window");
    }
    Ok(focused)
}

// =============================================================================
// Non-Windows stubs
// =============================================================================

#[cfg(not(target_os = "windows"))]
pub fn list_windows() -> Result<Vec<WindowInfo>> {
    Err(VoxkeyError::Delivery(
        "Window enumeration is only available on Windows".into(),
    ))
}

#[cfg(not(target_os = "windows"))]
pub async fn ensure_focus(_window: WindowId, _config: &FocusConfig) -> Result<bool> {
    tracing::warn!("ensure_focus called on non-Windows platform");
    Ok(false)
}
