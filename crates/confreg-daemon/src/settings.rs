//! TOML settings for the daemon.
//!
//! The daemon's own settings live in a single TOML file (default
//! `confreg.toml` in the working directory; see `--settings`).  They are
//! separate from the per-session YAML files the daemon manages.
//!
//! ```toml
//! [storage]
//! base_dir = "./data/sessions"
//! template = "templates/session.yml"   # optional, seeds brand-new files
//!
//! [autosave]
//! interval_secs = 300                  # 0 disables autosave
//!
//! [logging]
//! level = "info"
//!
//! [defaults]
//! volume = 100
//! audio = { muted = false }
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent from the file, so the daemon works
//! on first run (before a settings file exists) and with partial files.
//!
//! # Defaults table
//!
//! Nested TOML tables under `[defaults]` are flattened into dotted value
//! paths: `audio = { muted = false }` becomes the default `audio.muted`.
//! A session file that already has an `audio` section but no `muted` key
//! still gets `muted` filled in.
//! Entries are merged in the order they are declared in the file.

use std::path::{Path, PathBuf};

use confreg_core::{ConfigRegistry, DefaultSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error type for settings file operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing {path}: {source}")]
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

    /// A `[defaults]` entry could not be expressed as a YAML value.
    #[error("default `{path}` cannot be converted to YAML: {source}")]
    Convert {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

// ── Settings schema types ─────────────────────────────────────────────────────

/// Top-level daemon settings stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DaemonSettings {
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub autosave: AutosaveSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Default values merged into every newly registered session file.
    #[serde(default)]
    pub defaults: toml::Table,
}

/// Where session files live and how new ones are seeded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageSettings {
    /// Directory holding one `<session-uuid>.yml` per session.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    /// Optional YAML file copied verbatim over each brand-new session file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,
}

/// Periodic save of every open session file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AutosaveSettings {
    /// Seconds between autosaves.  `0` disables autosave.
    #[serde(default = "default_autosave_secs")]
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_base_dir() -> PathBuf {
    PathBuf::from("data").join("sessions")
}
fn default_autosave_secs() -> u64 {
    300
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            template: None,
        }
    }
}

impl Default for AutosaveSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_autosave_secs(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ── Conversion into core types ────────────────────────────────────────────────

impl DaemonSettings {
    /// Flattens `[defaults]` into a [`DefaultSet`] of dotted paths.
    ///
    /// # Errors
    ///
    /// [`SettingsError::Convert`] if a value has no YAML equivalent.
    pub fn default_set(&self) -> Result<DefaultSet, SettingsError> {
        let mut set = DefaultSet::new();
        flatten_into(&mut set, None, &self.defaults)?;
        Ok(set)
    }

    /// Reads the template file, if one is configured.
    ///
    /// # Errors
    ///
    /// [`SettingsError::Io`] if the configured template cannot be read.
    pub fn template_bytes(&self) -> Result<Option<Vec<u8>>, SettingsError> {
        let Some(path) = &self.storage.template else {
            return Ok(None);
        };
        std::fs::read(path)
            .map(Some)
            .map_err(|source| SettingsError::Io {
                path: path.clone(),
                source,
            })
    }

    /// Builds the session registry described by these settings.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`DaemonSettings::default_set`] and
    /// [`DaemonSettings::template_bytes`].
    pub fn build_registry(&self) -> Result<ConfigRegistry<Uuid>, SettingsError> {
        let mut registry = ConfigRegistry::new(self.storage.base_dir.clone());
        for (path, value) in self.default_set()?.iter() {
            registry.add_default(path, value.clone());
        }
        if let Some(template) = self.template_bytes()? {
            registry.set_template(template);
        }
        Ok(registry)
    }
}

fn flatten_into(
    set: &mut DefaultSet,
    prefix: Option<&str>,
    table: &toml::Table,
) -> Result<(), SettingsError> {
    for (key, value) in table {
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.clone(),
        };
        match value {
            toml::Value::Table(nested) => flatten_into(set, Some(&path), nested)?,
            leaf => {
                let yaml = serde_yaml::to_value(leaf).map_err(|source| SettingsError::Convert {
                    path: path.clone(),
                    source,
                })?;
                set.insert(path, yaml);
            }
        }
    }
    Ok(())
}

// ── Settings file access ──────────────────────────────────────────────────────

/// Loads settings from `path`, returning `DaemonSettings::default()` if the
/// file does not exist.
///
/// # Errors
///
/// [`SettingsError::Io`] for file-system errors other than "not found",
/// [`SettingsError::Parse`] if the TOML is malformed.
pub fn load_settings(path: &Path) -> Result<DaemonSettings, SettingsError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DaemonSettings::default()),
        Err(e) => Err(SettingsError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Writes `settings` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// [`SettingsError::Io`] for file-system failures or
/// [`SettingsError::Serialize`] if serialization fails.
pub fn save_settings(path: &Path, settings: &DaemonSettings) -> Result<(), SettingsError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| SettingsError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    let content = toml::to_string_pretty(settings)?;
    std::fs::write(path, content).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
