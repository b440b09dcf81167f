// src/tweaks/services/method.rs

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::{
    constants::SERVICE_STOP_TIMEOUT,
    host::Host,
    tweaks::{TweakMethod, TweakStatus},
    utils::services::StartType,
};

/// Disables a Windows service and stops it; undo brings back the newest
/// recorded start mode that is not `Disabled`.
#[derive(Debug, Clone)]
pub struct ServiceTweak {
    pub service: &'static str,
}

impl ServiceTweak {
    /// Start mode to restore on undo: the newest snapshot value that is not
    /// `Disabled`, otherwise `Automatic`.
    fn restore_target(&self, id: &str, host: &Host) -> StartType {
        match host
            .snapshots
            .as_ref()
            .and_then(|snapshots| snapshots.get_restorable_start_type(self.service))
        {
            Some(start_type) => start_type,
            None => {
                debug!(
                    "{} -> No usable snapshot for '{}', restoring {}.",
                    id,
                    self.service,
                    StartType::Automatic
                );
                StartType::Automatic
            }
        }
    }
}

impl TweakMethod for ServiceTweak {
    fn status(&self, id: &str, host: &Host) -> TweakStatus {
        if !host.services.exists(self.service) {
            debug!("{} -> Service '{}' does not exist.", id, self.service);
            return TweakStatus::NotSupported;
        }
        match host.services.start_type(self.service) {
            Some(StartType::Disabled) => TweakStatus::Applied,
            Some(_) => TweakStatus::NotApplied,
            None => TweakStatus::Unknown,
        }
    }

    fn apply(&self, id: &str, host: &Host) -> Result<()> {
        if !host.services.exists(self.service) {
            info!("{} -> Service '{}' not present, nothing to do.", id, self.service);
            return Ok(());
        }

        host.services
            .change_start_mode(self.service, false)
            .with_context(|| format!("Failed to disable service '{}'", self.service))?;

        if host.services.is_running(self.service).unwrap_or(true) {
            host.services
                .stop_and_wait(self.service, SERVICE_STOP_TIMEOUT)
                .with_context(|| format!("Failed to stop service '{}'", self.service))?;
        }

        info!("{} -> Disabled and stopped service '{}'.", id, self.service);
        Ok(())
    }

    fn revert(&self, id: &str, host: &Host) -> Result<()> {
        if !host.services.exists(self.service) {
            info!("{} -> Service '{}' not present, nothing to do.", id, self.service);
            return Ok(());
        }

        let target = self.restore_target(id, host);
        host.services
            .set_start_type(self.service, target)
            .with_context(|| {
                format!(
                    "Failed to set start type of service '{}' to {}",
                    self.service, target
                )
            })?;

        info!("{} -> Restored service '{}' to {}.", id, self.service, target);
        Ok(())
    }

    fn affected_services(&self) -> Vec<String> {
        vec![self.service.to_string()]
    }

    fn describe(&self) -> Vec<String> {
        vec![format!(
            "Set service {} to {} and stop it",
            self.service,
            StartType::Disabled
        )]
    }
}
