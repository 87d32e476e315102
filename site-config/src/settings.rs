//! Runtime settings loaded with figment.
//!
//! Sources, later overriding earlier:
//! 1. built-in defaults
//! 2. `site-config.toml`, `site-config.yaml`, `site-config.yml` or
//!    `site-config.json` in the working directory, or an explicit file
//! 3. `SITE_CONFIG_*` environment variables (`SITE_CONFIG_DATA_DIR=/srv/data`)

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SettingsError;
use crate::language::DEFAULT_LANGCODE;
use site_config_store::DEFAULT_NAMESPACE;

/// Base name of settings files searched in the working directory.
pub const SETTINGS_FILE_STEM: &str = "site-config";

/// Prefix of settings environment variables.
pub const ENV_PREFIX: &str = "SITE_CONFIG_";

const SETTINGS_EXTENSIONS: [&str; 4] = ["toml", "yaml", "yml", "json"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Prefix of every storage key.
    pub namespace: String,
    /// Directory of entry definition files.
    pub definitions_dir: PathBuf,
    /// Directory holding the state file and config objects.
    pub data_dir: PathBuf,
    /// Directory of entity fixtures, `<type>/<id>.yaml`.
    pub entities_dir: PathBuf,
    pub default_language: String,
    /// Address the HTTP server listens on.
    pub bind: String,
    /// Whether the editing surface can render multivalue widgets.
    pub multivalue_widget: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            definitions_dir: PathBuf::from("site_config"),
            data_dir: PathBuf::from("data"),
            entities_dir: PathBuf::from("entities"),
            default_language: DEFAULT_LANGCODE.to_string(),
            bind: "127.0.0.1:8080".to_string(),
            multivalue_widget: true,
        }
    }
}

impl Settings {
    /// Load settings from every source. `explicit` replaces file discovery
    /// and must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        let settings: Settings = Self::figment(explicit)?.extract()?;
        debug!(?settings, "settings loaded");
        Ok(settings)
    }

    fn figment(explicit: Option<&Path>) -> Result<Figment, SettingsError> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));

        match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(SettingsError::FileNotFound {
                        path: path.to_path_buf(),
                    });
                }
                figment = merge_file(figment, path)?;
            }
            None => {
                for ext in SETTINGS_EXTENSIONS {
                    let path = PathBuf::from(format!("{SETTINGS_FILE_STEM}.{ext}"));
                    if path.is_file() {
                        debug!(?path, "found settings file");
                        figment = merge_file(figment, &path)?;
                    }
                }
            }
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// File backing `storage: status` entries.
    pub fn state_file(&self) -> PathBuf {
        self.data_dir.join("state.yaml")
    }

    /// Directory backing `storage: config` entries.
    pub fn config_dir(&self) -> PathBuf {
        self.data_dir.join("config")
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment, SettingsError> {
    let figment = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => figment.merge(Toml::file(path)),
        Some("yaml") | Some("yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => {
            return Err(SettingsError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    };
    Ok(figment)
}
