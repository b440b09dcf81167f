// src/tweaks/registry/method.rs

use anyhow::{Context, Result};
use tracing::{debug, error};

use crate::{
    host::Host,
    tweaks::{TweakMethod, TweakStatus},
    utils::registry::{parse_registry_path, Hive, RegistryKeyValue, RegistryStore},
};

const SERVICES_KEY_PREFIX: &str = "system\\currentcontrolset\\services\\";

/// Defines a set of modifications to the Windows registry, which in combination
/// make up a single tweak.
#[derive(Debug, Clone)]
pub struct RegistryTweak {
    pub modifications: Vec<RegistryModification>,
}

/// Represents a single registry modification: the value written on apply and
/// the value written back on undo.
#[derive(Debug, Clone)]
pub struct RegistryModification {
    /// Full path of the registry key (e.g., "HKEY_LOCAL_MACHINE\\Software\\...").
    pub path: &'static str,
    /// Name of the registry value to modify.
    pub key: &'static str,
    /// The value to set when applying the tweak.
    pub target_value: RegistryKeyValue,
    /// The value to restore when undoing the tweak. A missing value reads as this.
    pub default_value: RegistryKeyValue,
}

impl RegistryModification {
    pub fn dword(path: &'static str, key: &'static str, target: u32, default: u32) -> Self {
        Self {
            path,
            key,
            target_value: RegistryKeyValue::Dword(target),
            default_value: RegistryKeyValue::Dword(default),
        }
    }

    fn is_machine_wide(&self) -> bool {
        matches!(parse_registry_path(self.path), Ok((Hive::LocalMachine, _)))
    }

    /// The service whose `Start` value this modification writes, if any.
    fn service_name(&self) -> Option<String> {
        if !self.key.eq_ignore_ascii_case("Start") {
            return None;
        }
        let (hive, subkey) = parse_registry_path(self.path).ok()?;
        if hive != Hive::LocalMachine {
            return None;
        }
        let prefix = subkey.get(..SERVICES_KEY_PREFIX.len())?;
        if !prefix.eq_ignore_ascii_case(SERVICES_KEY_PREFIX) {
            return None;
        }
        let name = &subkey[SERVICES_KEY_PREFIX.len()..];
        if name.is_empty() || name.contains('\\') {
            return None;
        }
        Some(name.to_string())
    }
}

impl RegistryTweak {
    pub fn new(modifications: Vec<RegistryModification>) -> Self {
        Self { modifications }
    }

    /// True if any modification lives under `HKEY_LOCAL_MACHINE`.
    pub fn requires_admin(&self) -> bool {
        self.modifications.iter().any(RegistryModification::is_machine_wide)
    }

    /// Writes one side of every modification, rolling back already-written
    /// entries if a later one fails.
    fn write_all<F>(
        &self,
        id: &str,
        registry: &dyn RegistryStore,
        operation: &str,
        select: F,
    ) -> Result<()>
    where
        F: Fn(&RegistryModification) -> RegistryKeyValue,
    {
        let mut written: Vec<(&RegistryModification, Option<RegistryKeyValue>)> = Vec::new();

        let result = (|| -> Result<()> {
            for modification in &self.modifications {
                let original_value = registry
                    .read_value(modification.path, modification.key)
                    .with_context(|| {
                        format!(
                            "Failed to read original value '{}' from '{}'",
                            modification.key, modification.path
                        )
                    })?;

                let value = select(modification);
                registry
                    .write_value(modification.path, modification.key, &value)
                    .with_context(|| {
                        format!(
                            "Failed to set value '{}' in '{}'",
                            modification.key, modification.path
                        )
                    })?;

                debug!(
                    "{} -> Set value '{}' to {} in '{}'.",
                    id, modification.key, value, modification.path
                );
                written.push((modification, original_value));
            }
            Ok(())
        })();

        if let Err(e) = result {
            error!(
                "{} -> Error occurred during {}: {}. Attempting rollback.",
                id, operation, e
            );
            if let Err(rollback_err) = rollback(id, registry, &written) {
                error!(
                    "{} -> Failed to rollback after {} error: {}",
                    id, operation, rollback_err
                );
                anyhow::bail!(
                    "{} failed: {}. Rollback failed: {}",
                    operation,
                    e,
                    rollback_err
                );
            }
            debug!("{} -> Rolled back after {} error.", id, operation);
            return Err(e);
        }

        debug!("{} -> Completed registry {}.", id, operation);
        Ok(())
    }
}

/// Restores previously written modifications, newest first.
fn rollback(
    id: &str,
    registry: &dyn RegistryStore,
    written: &[(&RegistryModification, Option<RegistryKeyValue>)],
) -> Result<()> {
    for (modification, original_value) in written.iter().rev() {
        match original_value {
            Some(value) => {
                registry
                    .write_value(modification.path, modification.key, value)
                    .with_context(|| {
                        format!(
                            "Failed to restore value '{}' in '{}'",
                            modification.key, modification.path
                        )
                    })?;
                debug!(
                    "{} -> Restored value '{}' to {} in '{}'.",
                    id, modification.key, value, modification.path
                );
            }
            None => {
                registry
                    .delete_value(modification.path, modification.key)
                    .with_context(|| {
                        format!(
                            "Failed to delete value '{}' in '{}'",
                            modification.key, modification.path
                        )
                    })?;
                debug!(
                    "{} -> Deleted value '{}' in '{}'.",
                    id, modification.key, modification.path
                );
            }
        }
    }
    Ok(())
}

impl TweakMethod for RegistryTweak {
    /// All entries at their target value is `Applied`, all at their default is
    /// `NotApplied`, anything in between is `Unknown`.
    fn status(&self, id: &str, host: &Host) -> TweakStatus {
        let mut all_target = true;
        let mut all_default = true;

        for modification in &self.modifications {
            let current = match host.registry.read_value(modification.path, modification.key) {
                Ok(Some(value)) => value,
                Ok(None) => modification.default_value.clone(),
                Err(e) => {
                    debug!(
                        "{} -> Could not read '{}' in '{}', assuming default: {}",
                        id, modification.key, modification.path, e
                    );
                    modification.default_value.clone()
                }
            };

            all_target &= current.matches(&modification.target_value);
            all_default &= current.matches(&modification.default_value);
        }

        let status = match (all_target, all_default) {
            (true, _) => TweakStatus::Applied,
            (false, true) => TweakStatus::NotApplied,
            (false, false) => TweakStatus::Unknown,
        };
        debug!("{} -> Registry status is {}.", id, status);
        status
    }

    fn apply(&self, id: &str, host: &Host) -> Result<()> {
        debug!("{} -> Applying registry tweak.", id);
        self.write_all(id, host.registry.as_ref(), "apply", |m| m.target_value.clone())
    }

    /// Service `Start` entries go back to the snapshotted start mode when one
    /// exists, every other entry to its default.
    fn revert(&self, id: &str, host: &Host) -> Result<()> {
        debug!("{} -> Reverting registry tweak.", id);
        self.write_all(id, host.registry.as_ref(), "revert", |m| {
            m.service_name()
                .zip(host.snapshots.as_ref())
                .and_then(|(service, snapshots)| snapshots.get_restorable_start_type(&service))
                .map(|start_type| {
                    debug!("{} -> Restoring '{}' from snapshot as {}.", id, m.path, start_type);
                    RegistryKeyValue::Dword(start_type.to_registry())
                })
                .unwrap_or_else(|| m.default_value.clone())
        })
    }

    fn affected_services(&self) -> Vec<String> {
        self.modifications
            .iter()
            .filter_map(RegistryModification::service_name)
            .collect()
    }

    fn describe(&self) -> Vec<String> {
        self.modifications
            .iter()
            .map(|m| format!("Set {}\\{} = {}", m.path, m.key, m.target_value))
            .collect()
    }
}

/// A tweak whose state is the mere presence of a registry key.
#[derive(Debug, Clone)]
pub struct RegistryKeyTweak {
    pub path: &'static str,
}

impl TweakMethod for RegistryKeyTweak {
    fn status(&self, id: &str, host: &Host) -> TweakStatus {
        match host.registry.key_exists(self.path) {
            Ok(true) => TweakStatus::Applied,
            Ok(false) => TweakStatus::NotApplied,
            Err(e) => {
                debug!("{} -> Could not open '{}': {}", id, self.path, e);
                TweakStatus::Unknown
            }
        }
    }

    fn apply(&self, id: &str, host: &Host) -> Result<()> {
        // Writing the unnamed default value creates the key and its parents.
        host.registry
            .write_value(self.path, "", &RegistryKeyValue::String(String::new()))
            .with_context(|| format!("Failed to create key '{}'", self.path))?;
        debug!("{} -> Created key '{}'.", id, self.path);
        Ok(())
    }

    fn revert(&self, id: &str, host: &Host) -> Result<()> {
        host.registry
            .delete_key(self.path)
            .with_context(|| format!("Failed to delete key '{}'", self.path))?;
        debug!("{} -> Deleted key '{}'.", id, self.path);
        Ok(())
    }

    fn describe(&self) -> Vec<String> {
        vec![format!("Create key {} with an empty default value", self.path)]
    }
}
