// src/errors.rs

use std::path::PathBuf;

use thiserror::Error;

use crate::engine::BatchReport;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Failed to launch script host: {0}")]
    Launch(#[source] std::io::Error),

    #[error("Failed to wait for script host: {0}")]
    Wait(#[source] std::io::Error),

    #[error("Script exited with code {0:?}")]
    NonZeroExit(Option<i32>),

    #[error("Script was cancelled")]
    Cancelled,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Duplicate tweak id '{0}'")]
    DuplicateId(String),

    #[error("Duplicate profile id '{0}'")]
    DuplicateProfile(String),
}

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to append to log file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Failed to write snapshot file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize snapshots: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Unknown setting '{0}'")]
    UnknownKey(String),

    #[error("Invalid value '{value}' for setting '{key}'")]
    InvalidValue { key: String, value: String },
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to create restore point: {0}")]
    RestorePoint(#[source] ScriptError),

    #[error("Operation cancelled")]
    Cancelled(BatchReport),
}
