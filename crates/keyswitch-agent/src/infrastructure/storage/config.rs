//! TOML-based settings for the agent.
//!
//! Reads and writes `AppConfig` at the platform-appropriate settings file:
//! - Windows:  `%APPDATA%\KeySwitch\settings.toml`
//! - Linux:    `~/.config/keyswitch/settings.toml`
//! - macOS:    `~/Library/Application Support/KeySwitch/settings.toml`
//!
//! The device mapping itself is *not* stored here; it lives in the per-user
//! data directory (see [`data_dir`]) in its own line format.
//!
//! # What is TOML? (for beginners)
//!
//! TOML (Tom's Obvious Minimal Language) is a configuration file format designed
//! to be easy to read and write.  It looks similar to INI files but with more
//! data types.  Example:
//!
//! ```toml
//! [general]
//! log_level = "debug"
//!
//! [paths]
//! catalog_file = 'D:\tools\keyswitch\layouts.txt'
//! ```
//!
//! # Serde default values
//!
//! Every section and field has a serde default, so an empty or partial file
//! is valid and the agent works on first run before any file exists.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::catalog_file::default_catalog_path;

/// Error type for settings file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config base directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// The platform data base directory could not be determined.
    #[error("could not determine platform data directory")]
    NoPlatformDataDir,

    /// The directory of the running executable could not be determined.
    #[error("could not locate the executable directory: {0}")]
    NoExecutableDir(String),

    /// A file system I/O error occurred.
    #[error("I/O error accessing settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse settings TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The settings could not be serialized to TOML.
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Settings schema ───────────────────────────────────────────────────────────

/// Top-level settings stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// General behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// `tracing` log level used when `RUST_LOG` is not set: `"error"`,
    /// `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Optional file location overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PathsConfig {
    /// Where the device → layout mapping is kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_file: Option<PathBuf>,
    /// Where the layout catalog is read from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// The mapping file location: the override, or `devices.txt` in the
    /// per-user data directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoPlatformDataDir`] when there is no override
    /// and the data directory cannot be determined.
    pub fn mapping_file_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.paths.mapping_file {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("devices.txt")),
        }
    }

    /// The catalog location: the override, or `layouts.txt` next to the
    /// executable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoExecutableDir`] when there is no override and
    /// the executable path cannot be resolved.
    pub fn catalog_file_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.paths.catalog_file {
            Some(path) => Ok(path.clone()),
            None => default_catalog_path(),
        }
    }
}

// ── Settings repository ───────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the settings file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Determines the per-user data directory for the mapping file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformDataDir`] when it cannot be determined.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    platform_data_dir().ok_or(ConfigError::NoPlatformDataDir)
}

/// Resolves the full path to the settings file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("settings.toml"))
}

/// Loads `AppConfig` from the platform settings file.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to the platform settings file.
///
/// # Errors
///
/// See [`save_config_to`].
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(&config_file_path()?, config)
}

/// Persists `config` to `path`, creating the directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config base directory including the app subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        // %APPDATA% e.g. C:\Users\<user>\AppData\Roaming
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("KeySwitch"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("keyswitch"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("KeySwitch")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

/// Resolves the platform data base directory including the app subdirectory.
fn platform_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        // %LOCALAPPDATA% e.g. C:\Users\<user>\AppData\Local
        std::env::var_os("LOCALAPPDATA").map(|p| PathBuf::from(p).join("KeySwitch"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_DATA_HOME or ~/.local/share
        let base = std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local").join("share"))
            })?;
        Some(base.join("keyswitch"))
    }

    #[cfg(target_os = "macos")]
    {
        platform_config_dir()
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("keyswitch_test_{}", Uuid::new_v4()))
    }

    // ── Defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn test_app_config_default_log_level_is_info() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.general.log_level, "info");
    }

    #[test]
    fn test_app_config_default_has_no_path_overrides() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.paths, PathsConfig::default());
        assert!(cfg.paths.mapping_file.is_none());
        assert!(cfg.paths.catalog_file.is_none());
    }

    // ── TOML parsing ──────────────────────────────────────────────────────────

    #[test]
    fn test_deserialize_empty_toml_uses_defaults() {
        let cfg: AppConfig = toml::from_str("").expect("empty settings are valid");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_deserialize_partial_settings_keeps_other_defaults() {
        // Arrange
        let toml_str = r#"
[paths]
mapping_file = "/tmp/devices.txt"
"#;

        // Act
        let cfg: AppConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.paths.mapping_file, Some(PathBuf::from("/tmp/devices.txt")));
        assert_eq!(cfg.paths.catalog_file, None);
        assert_eq!(cfg.general.log_level, "info");
    }

    #[test]
    fn test_serialize_omits_unset_overrides() {
        let toml_str = toml::to_string_pretty(&AppConfig::default()).expect("serialize");
        assert!(!toml_str.contains("mapping_file"));
        assert!(!toml_str.contains("catalog_file"));
        assert!(toml_str.contains("log_level"));
    }

    #[test]
    fn test_deserialize_invalid_toml_returns_parse_error() {
        let result: Result<AppConfig, toml::de::Error> = toml::from_str("[[[ not valid toml");
        assert!(result.is_err());
    }

    // ── Path resolution ───────────────────────────────────────────────────────

    #[test]
    fn test_overrides_win_over_platform_paths() {
        let mut cfg = AppConfig::default();
        cfg.paths.mapping_file = Some(PathBuf::from("custom/devices.txt"));
        cfg.paths.catalog_file = Some(PathBuf::from("custom/layouts.txt"));

        assert_eq!(
            cfg.mapping_file_path().unwrap(),
            PathBuf::from("custom/devices.txt")
        );
        assert_eq!(
            cfg.catalog_file_path().unwrap(),
            PathBuf::from("custom/layouts.txt")
        );
    }

    #[test]
    fn test_default_mapping_file_is_devices_txt() {
        // May be NoPlatformDataDir in a stripped environment; that is acceptable.
        if let Ok(path) = AppConfig::default().mapping_file_path() {
            assert!(path.ends_with("devices.txt"), "got {path:?}");
        }
    }

    #[test]
    fn test_config_file_path_ends_with_settings_toml() {
        if let Ok(path) = config_file_path() {
            assert!(path.ends_with("settings.toml"), "got {path:?}");
        }
    }

    // ── File round trip ───────────────────────────────────────────────────────

    #[test]
    fn test_load_config_from_missing_file_returns_default() {
        let path = temp_dir().join("settings.toml");
        assert_eq!(load_config_from(&path).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_save_and_load_config_round_trip_via_temp_dir() {
        // Arrange
        let dir = temp_dir();
        let path = dir.join("nested").join("settings.toml");
        let mut cfg = AppConfig::default();
        cfg.general.log_level = "debug".to_string();
        cfg.paths.catalog_file = Some(PathBuf::from("layouts.txt"));

        // Act
        save_config_to(&path, &cfg).expect("save creates the directory");
        let loaded = load_config_from(&path).expect("load");

        // Assert
        assert_eq!(loaded, cfg);

        // Cleanup
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_config_from_malformed_file_is_parse_error() {
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.toml");
        std::fs::write(&path, "[general\nlog_level = ").unwrap();

        let result = load_config_from(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
        std::fs::remove_dir_all(&dir).ok();
    }
}
