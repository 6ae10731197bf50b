use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current operational state of the daemon.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "lowercase")]
pub enum DaemonState {
    /// No replay directory is being watched (missing directory or shutting down).
    Idle,
    /// The replay directory is being watched for saved replays.
    Watching,
}

/// Runtime status written by the daemon to %APPDATA%\ReplayGameInfo\status.toml.
/// Nothing reads it back; it exists so users can see what the daemon is doing.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DaemonStatus {
    /// Daemon binary version (set from Cargo.toml at compile time).
    pub version: String,
    /// Current operational state.
    pub state: DaemonState,
    /// Directory currently being watched, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch_dir: Option<String>,
    /// Absolute path of the most recently saved replay, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_replay_path: Option<String>,
    /// RFC 3339 timestamp of the most recently saved replay, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_replay_timestamp: Option<String>,
    /// Number of replay saves seen since startup.
    #[serde(default)]
    pub replays_seen: u64,
}

impl DaemonStatus {
    /// Constructs the initial idle status on daemon startup.
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            state: DaemonState::Idle,
            watch_dir: None,
            last_replay_path: None,
            last_replay_timestamp: None,
            replays_seen: 0,
        }
    }

    /// Records a replay save at the current local time.
    pub fn record_replay(&mut self, path: &Path) {
        self.last_replay_path = Some(path.to_string_lossy().into_owned());
        self.last_replay_timestamp = Some(chrono::Local::now().to_rfc3339());
        self.replays_seen += 1;
    }
}

/// Serializes `status` to TOML and writes it to `path`.
/// Creates the parent directory if it does not exist.
/// Logs errors rather than panicking; a status write failure should never
/// crash the daemon.
pub fn write_status(path: &Path, status: &DaemonStatus) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            log::warn!("Failed to create directory {}: {e}", parent.display());
            return;
        }
    }
    match toml::to_string_pretty(status) {
        Ok(content) => {
            if let Err(e) = std::fs::write(path, content) {
                log::warn!("Failed to write status file: {e}");
            }
        }
        Err(e) => log::warn!("Failed to serialize status: {e}"),
    }
}
