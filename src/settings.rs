// src/settings.rs

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing::warn;

use crate::{
    constants::{
        APP_DIR_NAME, DEFAULT_PROFILE_ID, DEFAULT_RESTORE_POINT_DESCRIPTION, LOG_DIR_NAME,
        LOG_FILE_NAME, SETTINGS_FILE_NAME, SNAPSHOT_FILE_NAME,
    },
    errors::SettingsError,
};

/// Which preinstalled apps the bloatware tweak removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum BloatwareScope {
    #[default]
    ThirdPartyOnly,
    IncludeMicrosoftApps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub create_restore_point: bool,
    pub restore_point_description: String,
    pub selected_profile: String,
    pub bloatware_scope: BloatwareScope,
    pub lock_dangerous_tweaks: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            create_restore_point: true,
            restore_point_description: DEFAULT_RESTORE_POINT_DESCRIPTION.to_string(),
            selected_profile: DEFAULT_PROFILE_ID.to_string(),
            bloatware_scope: BloatwareScope::default(),
            lock_dangerous_tweaks: false,
        }
    }
}

impl Settings {
    /// Reads settings from `path`, failing on unreadable or invalid files.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Like [`Settings::from_file`], but a missing, unreadable or corrupt file
    /// yields the defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::from_file(path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Using default settings: {}", e);
                Self::default()
            }
        }
    }

    /// Updates one field from its TOML key name and a textual value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        let invalid = || SettingsError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        match key {
            "create_restore_point" => self.create_restore_point = value.parse().map_err(|_| invalid())?,
            "restore_point_description" => self.restore_point_description = value.to_string(),
            "selected_profile" => self.selected_profile = value.to_string(),
            "bloatware_scope" => self.bloatware_scope = value.parse().map_err(|_| invalid())?,
            "lock_dangerous_tweaks" => self.lock_dangerous_tweaks = value.parse().map_err(|_| invalid())?,
            _ => return Err(SettingsError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let content = self.to_toml()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// File locations under the application data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<platform data dir>/debloater`, falling back to the working directory.
    pub fn platform_default() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join(APP_DIR_NAME))
    }

    pub fn settings_file(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE_NAME)
    }

    pub fn snapshot_file(&self) -> PathBuf {
        self.root.join(SNAPSHOT_FILE_NAME)
    }

    pub fn log_file(&self) -> PathBuf {
        self.root.join(LOG_DIR_NAME).join(LOG_FILE_NAME)
    }
}
