use anyhow::{Context, Result};
use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use crate::event::DaemonEvent;
use crate::paths::expand_env;

pub const MIN_SETTLE_MS: u64 = 250;
pub const MAX_SETTLE_MS: u64 = 30_000;
pub const DEFAULT_SETTLE_MS: u64 = 1_500;
/// OBS's default recording folder. %USERPROFILE% is expanded at runtime.
pub const DEFAULT_REPLAY_DIR: &str = r"%USERPROFILE%\Videos";
/// OBS prefixes replay buffer files with "Replay" unless told otherwise.
pub const DEFAULT_FILE_PREFIX: &str = "Replay";
pub const DEFAULT_EXTENSIONS: &[&str] = &["mkv", "mp4", "mov", "flv", "ts", "m3u8"];
pub const DEFAULT_ICONS_DIR: &str = "icons";
pub const DEFAULT_METADATA_DIR: &str = ".clip_metadata";
pub const DEFAULT_UNKNOWN_WINDOW_TITLE: &str = "Unknown Window";

/// Root configuration structure. Deserialized from %APPDATA%\ReplayGameInfo\config.toml.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Where replays are saved and how a finished save is recognised.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct WatchConfig {
    /// Directory the recording application writes replays into.
    /// %USERPROFILE% and friends are expanded at runtime.
    #[serde(default = "default_replay_dir")]
    pub replay_dir: String,
    /// Only files whose name starts with this prefix count as replays.
    /// An empty prefix matches every file.
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    /// Container extensions (without the dot), compared case-insensitively.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Quiet time in milliseconds before a new file counts as saved. Clamped to [250, 30000].
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            replay_dir: DEFAULT_REPLAY_DIR.to_string(),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            extensions: default_extensions(),
            settle_ms: DEFAULT_SETTLE_MS,
        }
    }
}

impl WatchConfig {
    /// Returns the replay directory with environment variables expanded.
    pub fn resolved_replay_dir(&self) -> PathBuf {
        PathBuf::from(expand_env(&self.replay_dir))
    }

    /// Returns the clamped settle interval.
    pub fn effective_settle_ms(&self) -> u64 {
        self.settle_ms.clamp(MIN_SETTLE_MS, MAX_SETTLE_MS)
    }
}

/// Layout and content of the sidecar files written next to each replay.
#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    /// Name of the icon directory created next to the recording.
    #[serde(default = "default_icons_dir")]
    pub icons_dir: String,
    /// Name of the metadata directory created next to the recording.
    #[serde(default = "default_metadata_dir")]
    pub metadata_dir: String,
    /// Title recorded when the foreground window has none.
    #[serde(default = "default_unknown_window_title")]
    pub unknown_window_title: String,
    /// Executable names skipped in addition to the built-in ignore list.
    #[serde(default)]
    pub ignored_executables: Vec<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            icons_dir: DEFAULT_ICONS_DIR.to_string(),
            metadata_dir: DEFAULT_METADATA_DIR.to_string(),
            unknown_window_title: DEFAULT_UNKNOWN_WINDOW_TITLE.to_string(),
            ignored_executables: Vec::new(),
        }
    }
}

/// Loads the config file at `path`, returning `Config::default()` if the file does not exist.
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Spawns a file watcher on the parent directory of `path`.  Whenever the config
/// file is created or modified, reloads it and sends a `ConfigReloaded` event.
pub async fn watch_config(path: PathBuf, tx: mpsc::Sender<DaemonEvent>) {
    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Event>(16);

    let mut watcher = match RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                let _ = watch_tx.blocking_send(event);
            }
        },
        NotifyConfig::default(),
    ) {
        Ok(w) => w,
        Err(e) => {
            log::error!("Failed to create config watcher: {e}");
            return;
        }
    };

    // Watch the parent directory rather than the file directly so we catch
    // editor-style atomic saves (write-new + rename).
    let watch_dir = match path.parent() {
        Some(d) => d.to_path_buf(),
        None => {
            log::error!("Config path has no parent directory");
            return;
        }
    };

    if let Err(e) = watcher.watch(&watch_dir, RecursiveMode::NonRecursive) {
        log::error!("Failed to watch config directory: {e}");
        return;
    }

    while let Some(event) = watch_rx.recv().await {
        let affects_config = event.paths.iter().any(|p| p == path.as_path());
        let is_write = matches!(
            event.kind,
            notify::EventKind::Create(_) | notify::EventKind::Modify(_)
        );

        if affects_config && is_write {
            match load_or_default(&path) {
                Ok(config) => {
                    if tx.send(DaemonEvent::ConfigReloaded(config)).await.is_err() {
                        break;
                    }
                }
                Err(e) => log::warn!("Failed to reload config, keeping previous: {e:#}"),
            }
        }
    }
}

fn default_replay_dir() -> String {
    DEFAULT_REPLAY_DIR.to_string()
}

fn default_file_prefix() -> String {
    DEFAULT_FILE_PREFIX.to_string()
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

fn default_settle_ms() -> u64 {
    DEFAULT_SETTLE_MS
}

fn default_icons_dir() -> String {
    DEFAULT_ICONS_DIR.to_string()
}

fn default_metadata_dir() -> String {
    DEFAULT_METADATA_DIR.to_string()
}

fn default_unknown_window_title() -> String {
    DEFAULT_UNKNOWN_WINDOW_TITLE.to_string()
}
