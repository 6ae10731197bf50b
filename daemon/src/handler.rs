/// Per-replay work: ignore-list check, icon extraction and `.gameinfo` output.
///
/// For a recording at `<dir>/<name>` the handler produces
///   `<dir>/<icons_dir>/<exe stem>.png`        (once per executable)
///   `<dir>/<metadata_dir>/<name>.gameinfo`    (once per replay)
///
/// Nothing here is retried. [`spawn`] runs the work on a blocking thread and
/// logs any failure instead of returning it.
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;

use crate::config::OutputConfig;
use crate::foreground::ForegroundWindow;
use crate::gameinfo::{self, GameInfo};
use crate::icon;
use crate::ignore_list;

/// What the handler did with a replay.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    /// A `.gameinfo` file was written at this path.
    Written(PathBuf),
    /// The foreground executable is ignored; nothing was written.
    Ignored(String),
}

/// Handles one saved replay synchronously.
pub fn handle_replay_saved(
    recording_path: &Path,
    window: &ForegroundWindow,
    output: &OutputConfig,
) -> Result<Outcome> {
    if let Some(exe) = &window.exe_path {
        if ignore_list::is_ignored(exe, &output.ignored_executables) {
            let name = exe
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            return Ok(Outcome::Ignored(name));
        }
    }

    let folder = match recording_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let icons_dir = folder.join(&output.icons_dir);
    let metadata_dir = folder.join(&output.metadata_dir);

    // Two saves in quick succession may race here; create_dir_all tolerates that.
    std::fs::create_dir_all(&icons_dir)
        .with_context(|| format!("Failed to create {}", icons_dir.display()))?;
    std::fs::create_dir_all(&metadata_dir)
        .with_context(|| format!("Failed to create {}", metadata_dir.display()))?;

    let icon_file = match &window.exe_path {
        Some(exe) => resolve_icon(exe, &icons_dir),
        None => String::new(),
    };

    let info = GameInfo {
        window_title: window.title_or(&output.unknown_window_title).to_string(),
        icon_file,
    };
    let path = gameinfo::write_gameinfo(&metadata_dir, recording_path, &info)?;
    Ok(Outcome::Written(path))
}

/// Extracts (or reuses) the executable's icon and returns its file name,
/// or an empty string if no icon file ended up on disk.
fn resolve_icon(exe: &Path, icons_dir: &Path) -> String {
    let icon_path = match icon::ensure_icon(exe, icons_dir) {
        Ok(path) => path,
        Err(e) => {
            log::warn!("Icon extraction failed: {e:#}");
            return String::new();
        }
    };
    if !icon_path.is_file() {
        log::warn!("Icon extraction produced no file at {}", icon_path.display());
        return String::new();
    }
    icon_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Runs [`handle_replay_saved`] on a blocking thread. Fire-and-forget: the
/// returned handle may be dropped, and every error is logged and swallowed.
pub fn spawn(recording_path: PathBuf, window: ForegroundWindow, output: OutputConfig) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        match handle_replay_saved(&recording_path, &window, &output) {
            Ok(Outcome::Written(path)) => log::info!(".gameinfo saved to {}", path.display()),
            Ok(Outcome::Ignored(exe)) => {
                log::info!("Executable {exe} is in ignored list; skipping .gameinfo generation")
            }
            Err(e) => log::error!(
                "Failed to handle replay {}: {e:#}",
                recording_path.display()
            ),
        }
    })
}
