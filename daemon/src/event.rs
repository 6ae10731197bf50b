use std::path::PathBuf;

use crate::config::Config;
use crate::foreground::ForegroundWindow;

pub enum DaemonEvent {
    /// A replay file appeared in the watched directory and stopped growing.
    /// Carries the foreground window captured when the file first appeared.
    ReplaySaved(PathBuf, ForegroundWindow),
    /// The config file changed on disk and was successfully re-parsed.
    ConfigReloaded(Config),
    /// Ctrl+C received; the daemon should unregister and exit.
    Shutdown,
}
