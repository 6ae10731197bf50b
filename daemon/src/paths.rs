/// Canonical file paths for ReplayGameInfo data files.
///
/// Both files live under %APPDATA%\ReplayGameInfo\:
///   - config.toml  Edited by the user, read (and watched) by the daemon.
///   - status.toml  Written by the daemon for troubleshooting.
///
/// Outside Windows (where %APPDATA% is usually unset) the system temp
/// directory stands in for %APPDATA%.
use std::path::PathBuf;

const APP_DIR_NAME: &str = "ReplayGameInfo";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const STATUS_FILE_NAME: &str = "status.toml";

/// Returns the application data directory: %APPDATA%\ReplayGameInfo\
pub fn app_data_dir() -> PathBuf {
    let appdata = std::env::var_os("APPDATA")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    appdata.join(APP_DIR_NAME)
}

/// Returns the full path to the config file: %APPDATA%\ReplayGameInfo\config.toml
pub fn config_file_path() -> PathBuf {
    app_data_dir().join(CONFIG_FILE_NAME)
}

/// Returns the full path to the status file: %APPDATA%\ReplayGameInfo\status.toml
pub fn status_file_path() -> PathBuf {
    app_data_dir().join(STATUS_FILE_NAME)
}

/// Expands common `%VAR%`-style environment variables embedded in Windows paths.
/// Unknown or unset variables are left untouched.
pub fn expand_env(s: &str) -> String {
    let mut result = s.to_string();
    for var in &["USERPROFILE", "APPDATA", "LOCALAPPDATA", "TEMP", "TMP"] {
        if let Ok(val) = std::env::var(var) {
            result = result.replace(&format!("%{var}%"), &val);
        }
    }
    result
}
