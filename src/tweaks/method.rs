// src/tweaks/method.rs

use anyhow::Error;

use super::TweakStatus;
use crate::host::Host;

/// Trait defining the behavior for all tweak methods.
pub trait TweakMethod: Send + Sync {
    /// Reads the current system state. Never mutates and never fails: values
    /// that cannot be read fall back to their defaults.
    fn status(&self, id: &str, host: &Host) -> TweakStatus;

    /// Drives the system to the tweak's enabled configuration.
    fn apply(&self, id: &str, host: &Host) -> Result<(), Error>;

    /// Drives the system back to its default configuration.
    fn revert(&self, id: &str, host: &Host) -> Result<(), Error>;

    /// Services whose start mode this method changes.
    fn affected_services(&self) -> Vec<String> {
        Vec::new()
    }

    /// Human-readable list of the changes `apply` would make.
    fn describe(&self) -> Vec<String>;
}
