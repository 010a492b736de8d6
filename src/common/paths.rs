//! Configuration and data paths
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/dbg-conformance/`
//! - macOS: `~/Library/Application Support/dbg-conformance/`
//! - Windows: `%APPDATA%\dbg-conformance\`

use std::io;
use std::path::PathBuf;

/// Name used for the config and data directories
const APP_NAME: &str = "dbg-conformance";

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the path to the log directory
pub fn log_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().join("logs"))
}

/// Default directory for generated delta artifacts
pub fn delta_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.cache_dir().join("deltas"))
        .unwrap_or_else(|| std::env::temp_dir().join(APP_NAME).join("deltas"))
}

/// Ensure the log directory exists
pub fn ensure_log_dir() -> io::Result<Option<PathBuf>> {
    if let Some(dir) = log_dir() {
        std::fs::create_dir_all(&dir)?;
        Ok(Some(dir))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_is_toml() {
        if let Some(path) = config_path() {
            assert_eq!(path.file_name().unwrap(), "config.toml");
        }
    }

    #[test]
    fn test_delta_dir_is_never_empty() {
        assert!(!delta_dir().as_os_str().is_empty());
    }
}
