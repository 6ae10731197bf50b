use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const GAMEINFO_EXTENSION: &str = "gameinfo";

/// Sidecar metadata written once per saved replay.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct GameInfo {
    /// Title of the foreground window at save time.
    pub window_title: String,
    /// File name inside the sibling icons directory, or empty if no icon is available.
    pub icon_file: String,
}

/// Returns `<recording file name>.gameinfo` (`Replay 1.mkv` → `Replay 1.mkv.gameinfo`).
pub fn gameinfo_file_name(recording_path: &Path) -> Option<String> {
    recording_path
        .file_name()
        .map(|name| format!("{}.{GAMEINFO_EXTENSION}", name.to_string_lossy()))
}

/// Serializes `info` as JSON into `<metadata_dir>/<recording file name>.gameinfo`
/// and returns the written path. An existing file is overwritten.
pub fn write_gameinfo(metadata_dir: &Path, recording_path: &Path, info: &GameInfo) -> Result<PathBuf> {
    let file_name = gameinfo_file_name(recording_path).with_context(|| {
        format!("Recording path has no file name: {}", recording_path.display())
    })?;
    let path = metadata_dir.join(file_name);
    let json = serde_json::to_string(info).context("Failed to serialize game info")?;
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
