// src/snapshot.rs

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    errors::SnapshotError,
    utils::services::{ServiceManager, StartType},
};

/// Start modes of a set of services at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub services: BTreeMap<String, String>,
}

/// Append-only history of service start modes, persisted as a JSON array.
pub struct SnapshotManager {
    path: PathBuf,
    services: Arc<dyn ServiceManager>,
}

impl SnapshotManager {
    pub fn new(path: impl Into<PathBuf>, services: Arc<dyn ServiceManager>) -> Self {
        Self {
            path: path.into(),
            services,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the whole history. A missing, unreadable or corrupt file is an
    /// empty history.
    pub fn load(&self) -> Vec<Snapshot> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Ignoring unreadable snapshot file {:?}: {}", self.path, e);
                }
                return Vec::new();
            }
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!("Ignoring corrupt snapshot file {:?}: {}", self.path, e);
            Vec::new()
        })
    }

    /// Records the current start mode of every readable service in `names`
    /// and appends the record to the history.
    pub fn create_snapshot<S: AsRef<str>>(&self, names: &[S]) -> Result<Snapshot, SnapshotError> {
        let services: BTreeMap<String, String> = names
            .iter()
            .filter_map(|name| {
                let name = name.as_ref();
                let start_type = self.services.start_type(name)?;
                Some((name.to_string(), start_type.to_string()))
            })
            .collect();

        let snapshot = Snapshot {
            timestamp: Utc::now(),
            services,
        };

        let mut history = self.load();
        history.push(snapshot.clone());
        self.save(&history)?;

        debug!(
            "Recorded snapshot of {} service(s) in {:?}",
            snapshot.services.len(),
            self.path
        );
        Ok(snapshot)
    }

    /// Latest recorded start mode of `name`, newest snapshot first.
    pub fn get_snapshot_start_type(&self, name: &str) -> Option<String> {
        self.load().iter().rev().find_map(|snapshot| {
            snapshot
                .services
                .iter()
                .find(|(service, _)| service.eq_ignore_ascii_case(name))
                .map(|(_, start_type)| start_type.clone())
        })
    }

    /// Newest recorded start mode of `name` that is not `Disabled`. Reapplying
    /// a tweak snapshots the already disabled service, so older records are
    /// the ones that hold the mode to restore.
    pub fn get_restorable_start_type(&self, name: &str) -> Option<StartType> {
        self.load().iter().rev().find_map(|snapshot| {
            let (_, recorded) = snapshot
                .services
                .iter()
                .find(|(service, _)| service.eq_ignore_ascii_case(name))?;
            match StartType::from_str(recorded) {
                Ok(StartType::Disabled) => None,
                Ok(start_type) => Some(start_type),
                Err(_) => {
                    warn!("Ignoring unrecognized snapshot start type {:?} for '{}'", recorded, name);
                    None
                }
            }
        })
    }

    /// Deletes the persisted history. Failures are logged and ignored.
    pub fn clear_snapshots(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Cleared snapshots at {:?}", self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to clear snapshots at {:?}: {}", self.path, e),
        }
    }

    fn save(&self, history: &[Snapshot]) -> Result<(), SnapshotError> {
        let io_error = |source| SnapshotError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let content = serde_json::to_string_pretty(history)?;
        std::fs::write(&self.path, content).map_err(io_error)
    }
}
