// src/host.rs

use std::sync::Arc;

use crate::{
    snapshot::SnapshotManager,
    utils::{powershell::ScriptHost, registry::RegistryStore, services::ServiceManager},
};

/// Everything a tweak may touch while it is read, applied or undone.
#[derive(Clone)]
pub struct Host {
    pub registry: Arc<dyn RegistryStore>,
    pub services: Arc<dyn ServiceManager>,
    pub scripts: Arc<dyn ScriptHost>,
    pub snapshots: Option<Arc<SnapshotManager>>,
}

impl Host {
    pub fn new(
        registry: Arc<dyn RegistryStore>,
        services: Arc<dyn ServiceManager>,
        scripts: Arc<dyn ScriptHost>,
    ) -> Self {
        Self {
            registry,
            services,
            scripts,
            snapshots: None,
        }
    }

    pub fn with_snapshots(mut self, snapshots: Arc<SnapshotManager>) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    /// Wires the live Windows registry, Service Control Manager and PowerShell.
    #[cfg(windows)]
    pub fn system() -> anyhow::Result<Self> {
        use crate::utils::{
            powershell::PowerShellHost, registry::WindowsRegistry,
            services::WindowsServiceManager,
        };

        Ok(Self::new(
            Arc::new(WindowsRegistry),
            Arc::new(WindowsServiceManager),
            Arc::new(PowerShellHost::new()),
        ))
    }

    #[cfg(not(windows))]
    pub fn system() -> anyhow::Result<Self> {
        anyhow::bail!("System tweaks are only available on Windows")
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("snapshots", &self.snapshots.as_ref().map(|s| s.path().to_path_buf()))
            .finish_non_exhaustive()
    }
}
