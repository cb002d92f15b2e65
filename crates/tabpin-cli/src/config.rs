//! Optional TOML configuration: global defaults plus per-device profiles
//! matched by device-name substring.
//!
//! The file lives at `$XDG_CONFIG_HOME/tabpin/config.toml` (falling back
//! to `~/.config/tabpin/config.toml`) and every part of it is optional:
//!
//! ```toml
//! [defaults]
//! aspect = "match-width"
//! halign = "centered"
//!
//! [[profiles]]
//! device = "Wacom"
//! output_name = "DP-1"
//! one_to_one = true
//! ```
//!
//! Profiles apply to single-device invocations only; batch mode (`--all`)
//! uses flags and defaults so every device gets the same treatment.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use tabpin_core::{AspectMode, HorizontalAffinity, VerticalAffinity};

/// Errors from loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither `XDG_CONFIG_HOME` nor `HOME` is set, so there is no place
    /// the default config file could live.
    #[error("cannot locate a config directory; set XDG_CONFIG_HOME or HOME")]
    NoConfigDir,
    /// The file exists but could not be read.
    #[error("failed to read config file at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML or has fields of the wrong shape.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// The whole configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

/// Fallback settings used when neither a flag nor a profile decides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default = "default_aspect")]
    pub aspect: AspectMode,
    #[serde(default = "default_halign")]
    pub halign: HorizontalAffinity,
    #[serde(default = "default_valign")]
    pub valign: VerticalAffinity,
    #[serde(default)]
    pub one_to_one: bool,
    #[serde(default = "default_verify")]
    pub verify: bool,
}

fn default_aspect() -> AspectMode {
    AspectMode::Fit
}

fn default_halign() -> HorizontalAffinity {
    HorizontalAffinity::Left
}

fn default_valign() -> VerticalAffinity {
    VerticalAffinity::Top
}

fn default_verify() -> bool {
    true
}

impl Default for Defaults {
    fn default() -> Self {
        Defaults {
            aspect: default_aspect(),
            halign: default_halign(),
            valign: default_valign(),
            one_to_one: false,
            verify: default_verify(),
        }
    }
}

/// Per-device overrides. Only the fields a profile sets take effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Substring matched against the device's name, e.g. "Wacom".
    pub device: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect: Option<AspectMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub halign: Option<HorizontalAffinity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valign: Option<VerticalAffinity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_to_one: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,
}

impl Config {
    /// The first profile whose `device` string occurs in `device_name`.
    pub fn profile_for(&self, device_name: &str) -> Option<&Profile> {
        self.profiles
            .iter()
            .find(|profile| device_name.contains(&profile.device))
    }
}

/// The directory the default config file lives in.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME") {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir).join("tabpin"));
        }
    }
    match std::env::var_os("HOME") {
        Some(home) if !home.is_empty() => Ok(PathBuf::from(home).join(".config").join("tabpin")),
        _ => Err(ConfigError::NoConfigDir),
    }
}

/// Loads the configuration.
///
/// With an explicit `path` the file must exist. Without one, a missing
/// file at the default location is normal and yields the built-in
/// defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    if let Some(path) = path {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        return Ok(toml::from_str(&raw)?);
    }

    let path = config_dir()?.join("config.toml");
    match std::fs::read_to_string(&path) {
        Ok(raw) => {
            debug!(path = %path.display(), "loaded config file");
            Ok(toml::from_str(&raw)?)
        }
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file; using built-in defaults");
            Ok(Config::default())
        }
        Err(source) => Err(ConfigError::Io { path, source }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
