/// Snapshot of the window that had focus when a replay was saved.
///
/// The window handle and title come from Win32; the owning process ID is
/// resolved to an executable path through `sysinfo`, which keeps the handle
/// juggling (`OpenProcess` / `CloseHandle`) out of this crate.
///
/// On non-Windows platforms [`capture`] returns an empty snapshot.
use std::path::{Path, PathBuf};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

/// Title and owning executable of the focused window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForegroundWindow {
    /// Window title; empty when there is no foreground window or it has no title.
    pub title: String,
    /// Full path of the executable that owns the window, if it could be resolved.
    pub exe_path: Option<PathBuf>,
}

impl ForegroundWindow {
    /// Returns the title, or `placeholder` when the title is empty.
    pub fn title_or<'a>(&'a self, placeholder: &'a str) -> &'a str {
        if self.title.is_empty() {
            placeholder
        } else {
            &self.title
        }
    }
}

/// Captures the current foreground window. Never fails: anything that cannot
/// be resolved is left empty and logged at debug level.
pub fn capture() -> ForegroundWindow {
    let Some((title, pid)) = imp::foreground_window() else {
        log::debug!("No foreground window");
        return ForegroundWindow::default();
    };

    let exe_path = executable_for_pid(pid);
    if exe_path.is_none() {
        log::debug!("Could not resolve executable for PID {pid}");
    }

    ForegroundWindow { title, exe_path }
}

/// Decodes the first `copied` UTF-16 units written by `GetWindowTextW`,
/// unchanged apart from lossy replacement of unpaired surrogates.
#[cfg_attr(not(windows), allow(dead_code))]
pub fn decode_title(buffer: &[u16], copied: i32) -> String {
    let len = (copied.max(0) as usize).min(buffer.len());
    String::from_utf16_lossy(&buffer[..len])
}

/// Resolves a process ID to the full path of its executable.
pub fn executable_for_pid(pid: u32) -> Option<PathBuf> {
    if pid == 0 {
        return None;
    }
    let pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::new().with_exe(UpdateKind::Always),
    );
    sys.process(pid)
        .and_then(|p| p.exe())
        .map(Path::to_path_buf)
}

// ── Windows implementation ────────────────────────────────────────────────────

#[cfg(windows)]
mod imp {
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::WindowsAndMessaging::{
        GetForegroundWindow, GetWindowTextLengthW, GetWindowTextW, GetWindowThreadProcessId,
    };

    /// Returns the foreground window's title and owning process ID.
    pub fn foreground_window() -> Option<(String, u32)> {
        unsafe {
            let hwnd = GetForegroundWindow();
            if hwnd == HWND::default() {
                return None;
            }

            let length = GetWindowTextLengthW(hwnd);
            let title = if length > 0 {
                let mut buffer = vec![0u16; length as usize + 1];
                let copied = GetWindowTextW(hwnd, &mut buffer);
                super::decode_title(&buffer, copied)
            } else {
                String::new()
            };

            let mut process_id = 0u32;
            GetWindowThreadProcessId(hwnd, Some(&mut process_id));

            Some((title, process_id))
        }
    }
}

#[cfg(not(windows))]
mod imp {
    pub fn foreground_window() -> Option<(String, u32)> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_or_uses_placeholder_for_empty_title() {
        let w = ForegroundWindow::default();
        assert_eq!(w.title_or("Unknown Window"), "Unknown Window");
    }

    #[test]
    fn title_or_keeps_real_title() {
        let w = ForegroundWindow {
            title: "Rocket League (64-bit, DX11, Cooked)".to_string(),
            exe_path: None,
        };
        assert_eq!(w.title_or("Unknown Window"), "Rocket League (64-bit, DX11, Cooked)");
    }

    #[test]
    fn title_or_keeps_whitespace_title_verbatim() {
        let w = ForegroundWindow {
            title: "  ".to_string(),
            exe_path: None,
        };
        assert_eq!(w.title_or("Unknown Window"), "  ");
    }

    #[test]
    fn decode_title_keeps_surrounding_whitespace() {
        let raw: Vec<u16> = " Game - Level 1 \0".encode_utf16().collect();
        assert_eq!(decode_title(&raw, raw.len() as i32 - 1), " Game - Level 1 ");
    }

    #[test]
    fn decode_title_clamps_copied_count() {
        let raw: Vec<u16> = "abc".encode_utf16().collect();
        assert_eq!(decode_title(&raw, -1), "");
        assert_eq!(decode_title(&raw, 10), "abc");
    }

    #[test]
    fn executable_for_pid_zero_is_none() {
        assert!(executable_for_pid(0).is_none());
    }

    #[test]
    fn executable_for_current_process_resolves() {
        let exe = executable_for_pid(std::process::id()).expect("own executable should resolve");
        assert!(exe.is_absolute());
    }

    #[cfg(not(windows))]
    #[test]
    fn capture_is_empty_off_windows() {
        assert_eq!(capture(), ForegroundWindow::default());
    }
}
