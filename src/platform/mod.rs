// marksync platform paths
// Config: where settings.json lives. Data: where the reference bookmark store lives.

use std::env;
use std::path::PathBuf;

const APP_DIR: &str = "marksync";

#[cfg(target_os = "macos")]
const APP_DIR_TITLE: &str = "Marksync";

fn home_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    let var = "USERPROFILE";
    #[cfg(not(target_os = "windows"))]
    let var = "HOME";
    PathBuf::from(env::var(var).unwrap_or_else(|_| env::temp_dir().to_string_lossy().to_string()))
}

/// Directory holding `settings.json`.
///
/// - **Linux**: `$XDG_CONFIG_HOME/marksync` or `~/.config/marksync`
/// - **macOS**: `~/Library/Application Support/Marksync`
/// - **Windows**: `%APPDATA%/marksync`
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        home_dir().join("Library").join("Application Support").join(APP_DIR_TITLE)
    }
    #[cfg(target_os = "windows")]
    {
        env::var("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home_dir().join("AppData").join("Roaming"))
            .join(APP_DIR)
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home_dir().join(".config"))
            .join(APP_DIR)
    }
}

/// Directory holding the bookmark database.
///
/// - **Linux**: `$XDG_DATA_HOME/marksync` or `~/.local/share/marksync`
/// - **macOS**: same as the config dir
/// - **Windows**: `%LOCALAPPDATA%/marksync`
pub fn get_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        get_config_dir()
    }
    #[cfg(target_os = "windows")]
    {
        env::var("LOCALAPPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home_dir().join("AppData").join("Local"))
            .join(APP_DIR)
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home_dir().join(".local").join("share"))
            .join(APP_DIR)
    }
}
