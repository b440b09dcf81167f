// src/utils/services.rs

use std::{collections::HashMap, sync::Mutex, time::Duration};

use anyhow::Result;
use strum_macros::{Display, EnumIter, EnumString};

/// Start mode of a Windows service, as stored in the `Start` value of its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum StartType {
    Boot,
    System,
    Automatic,
    Manual,
    Disabled,
}

impl StartType {
    /// Maps the registry `Start` DWORD to a start type.
    pub fn from_registry(value: u32) -> Option<Self> {
        match value {
            0 => Some(StartType::Boot),
            1 => Some(StartType::System),
            2 => Some(StartType::Automatic),
            3 => Some(StartType::Manual),
            4 => Some(StartType::Disabled),
            _ => None,
        }
    }

    pub fn to_registry(self) -> u32 {
        match self {
            StartType::Boot => 0,
            StartType::System => 1,
            StartType::Automatic => 2,
            StartType::Manual => 3,
            StartType::Disabled => 4,
        }
    }

    /// The `start=` argument `sc.exe config` expects for this start type.
    pub fn sc_argument(self) -> &'static str {
        match self {
            StartType::Boot => "boot",
            StartType::System => "system",
            StartType::Automatic => "auto",
            StartType::Manual => "demand",
            StartType::Disabled => "disabled",
        }
    }
}

/// Service control as seen by the tweaks.
pub trait ServiceManager: Send + Sync {
    fn exists(&self, name: &str) -> bool;

    /// Current start mode, or `None` when it cannot be read.
    fn start_type(&self, name: &str) -> Option<StartType>;

    fn set_start_type(&self, name: &str, start_type: StartType) -> Result<()>;

    /// Enabled maps to `Automatic`, disabled to `Disabled`.
    fn change_start_mode(&self, name: &str, enabled: bool) -> Result<()> {
        let start_type = if enabled {
            StartType::Automatic
        } else {
            StartType::Disabled
        };
        self.set_start_type(name, start_type)
    }

    fn is_running(&self, name: &str) -> Result<bool>;

    /// Requests a stop and waits until the service reports stopped or `timeout` elapses.
    fn stop_and_wait(&self, name: &str, timeout: Duration) -> Result<()>;
}

#[derive(Debug, Clone)]
struct MemoryService {
    start_type: Option<StartType>,
    running: bool,
}

/// In-process service table used off-Windows and by tests.
#[derive(Debug, Default)]
pub struct MemoryServices {
    services: Mutex<HashMap<String, MemoryService>>,
}

impl MemoryServices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service. A `None` start type simulates a service whose
    /// configuration cannot be read.
    pub fn insert(&self, name: &str, start_type: Option<StartType>, running: bool) {
        self.lock().insert(
            name.to_lowercase(),
            MemoryService {
                start_type,
                running,
            },
        );
    }

    pub fn with_service(self, name: &str, start_type: StartType, running: bool) -> Self {
        self.insert(name, Some(start_type), running);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, MemoryService>> {
        self.services
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ServiceManager for MemoryServices {
    fn exists(&self, name: &str) -> bool {
        self.lock().contains_key(&name.to_lowercase())
    }

    fn start_type(&self, name: &str) -> Option<StartType> {
        self.lock()
            .get(&name.to_lowercase())
            .and_then(|service| service.start_type)
    }

    fn set_start_type(&self, name: &str, start_type: StartType) -> Result<()> {
        match self.lock().get_mut(&name.to_lowercase()) {
            Some(service) => {
                service.start_type = Some(start_type);
                Ok(())
            }
            None => anyhow::bail!("Service '{}' does not exist", name),
        }
    }

    fn is_running(&self, name: &str) -> Result<bool> {
        match self.lock().get(&name.to_lowercase()) {
            Some(service) => Ok(service.running),
            None => anyhow::bail!("Service '{}' does not exist", name),
        }
    }

    fn stop_and_wait(&self, name: &str, _timeout: Duration) -> Result<()> {
        match self.lock().get_mut(&name.to_lowercase()) {
            Some(service) => {
                service.running = false;
                Ok(())
            }
            None => anyhow::bail!("Service '{}' does not exist", name),
        }
    }
}

/// The Windows Service Control Manager.
///
/// Start modes are read from the service's registry key and changed through
/// `sc.exe`; running state and stop requests go through the SCM API.
#[cfg(windows)]
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsServiceManager;

#[cfg(windows)]
mod windows_services {
    use std::{
        os::windows::process::CommandExt,
        process::{Command, Stdio},
        thread,
        time::{Duration, Instant},
    };

    use anyhow::{Context, Result};
    use tracing::debug;
    use windows::{
        core::PCWSTR,
        Win32::System::Services::{
            CloseServiceHandle, ControlService, OpenSCManagerW, OpenServiceW, QueryServiceStatus,
            SC_HANDLE, SC_MANAGER_CONNECT, SERVICE_CONTROL_STOP, SERVICE_QUERY_STATUS,
            SERVICE_RUNNING, SERVICE_STATUS, SERVICE_STOP, SERVICE_STOPPED,
        },
    };

    use super::{ServiceManager, StartType, WindowsServiceManager};
    use crate::{
        constants::CREATE_NO_WINDOW,
        utils::registry::{RegistryStore, WindowsRegistry},
    };

    const POLL_INTERVAL: Duration = Duration::from_millis(250);

    /// Closes the wrapped SCM handle when dropped.
    struct ServiceHandle(SC_HANDLE);

    impl Drop for ServiceHandle {
        fn drop(&mut self) {
            unsafe {
                let _ = CloseServiceHandle(self.0);
            }
        }
    }

    fn open_service(name: &str, access: u32) -> Result<(ServiceHandle, ServiceHandle)> {
        unsafe {
            let scm = OpenSCManagerW(PCWSTR::null(), PCWSTR::null(), SC_MANAGER_CONNECT)
                .map(ServiceHandle)
                .map_err(|e| anyhow::anyhow!("Failed to open Service Control Manager: {:?}", e))?;

            let wide_name = widestring::U16CString::from_str(name)
                .with_context(|| format!("Invalid service name '{}'", name))?;
            let service = OpenServiceW(scm.0, PCWSTR::from_raw(wide_name.as_ptr()), access)
                .map(ServiceHandle)
                .map_err(|e| anyhow::anyhow!("Failed to open service '{}': {:?}", name, e))?;

            // The service handle is dropped first so it closes before the SCM handle.
            Ok((service, scm))
        }
    }

    fn query_status(handle: &ServiceHandle, name: &str) -> Result<SERVICE_STATUS> {
        let mut status = SERVICE_STATUS::default();
        unsafe { QueryServiceStatus(handle.0, &mut status) }.map_err(|e| {
            anyhow::anyhow!("Failed to query service status for '{}': {:?}", name, e)
        })?;
        Ok(status)
    }

    impl ServiceManager for WindowsServiceManager {
        fn exists(&self, name: &str) -> bool {
            open_service(name, SERVICE_QUERY_STATUS).is_ok()
        }

        fn start_type(&self, name: &str) -> Option<StartType> {
            let path = format!("HKEY_LOCAL_MACHINE\\SYSTEM\\CurrentControlSet\\Services\\{}", name);
            let value = WindowsRegistry.read_value(&path, "Start").ok().flatten()?;
            let raw = u32::try_from(value.as_integer()?).ok()?;
            StartType::from_registry(raw)
        }

        fn set_start_type(&self, name: &str, start_type: StartType) -> Result<()> {
            debug!("{} -> setting start type to {}", name, start_type);
            let status = Command::new("sc.exe")
                .args(["config", name, "start=", start_type.sc_argument()])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .creation_flags(CREATE_NO_WINDOW)
                .status()
                .context("Failed to spawn sc.exe")?;

            if !status.success() {
                anyhow::bail!(
                    "sc.exe config {} start= {} exited with {:?}",
                    name,
                    start_type.sc_argument(),
                    status.code()
                );
            }
            Ok(())
        }

        fn is_running(&self, name: &str) -> Result<bool> {
            let (service, _scm) = open_service(name, SERVICE_QUERY_STATUS)?;
            Ok(query_status(&service, name)?.dwCurrentState == SERVICE_RUNNING)
        }

        fn stop_and_wait(&self, name: &str, timeout: Duration) -> Result<()> {
            let (service, _scm) = open_service(name, SERVICE_STOP | SERVICE_QUERY_STATUS)?;
            if query_status(&service, name)?.dwCurrentState == SERVICE_STOPPED {
                return Ok(());
            }

            let mut status = SERVICE_STATUS::default();
            unsafe { ControlService(service.0, SERVICE_CONTROL_STOP, &mut status) }
                .map_err(|e| anyhow::anyhow!("Failed to stop service '{}': {:?}", name, e))?;

            let deadline = Instant::now() + timeout;
            while Instant::now() < deadline {
                if query_status(&service, name)?.dwCurrentState == SERVICE_STOPPED {
                    debug!("{} -> stopped", name);
                    return Ok(());
                }
                thread::sleep(POLL_INTERVAL);
            }
            anyhow::bail!("Service '{}' did not stop within {:?}", name, timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_start_type_registry_mapping_round_trips() {
        for start_type in StartType::iter() {
            assert_eq!(
                StartType::from_registry(start_type.to_registry()),
                Some(start_type)
            );
        }
        assert_eq!(StartType::from_registry(2), Some(StartType::Automatic));
        assert_eq!(StartType::from_registry(4), Some(StartType::Disabled));
        assert_eq!(StartType::from_registry(7), None);
    }

    #[test]
    fn test_start_type_display_is_the_persisted_form() {
        assert_eq!(StartType::Automatic.to_string(), "Automatic");
        assert_eq!(StartType::from_str("manual").unwrap(), StartType::Manual);
        assert!(StartType::from_str("Sometimes").is_err());
    }

    #[test]
    fn test_memory_services_change_start_mode() {
        let services = MemoryServices::new().with_service("DiagTrack", StartType::Automatic, true);

        services.change_start_mode("diagtrack", false).unwrap();
        assert_eq!(services.start_type("DiagTrack"), Some(StartType::Disabled));

        services.stop_and_wait("DiagTrack", Duration::from_secs(1)).unwrap();
        assert!(!services.is_running("DiagTrack").unwrap());

        services.change_start_mode("DiagTrack", true).unwrap();
        assert_eq!(services.start_type("DiagTrack"), Some(StartType::Automatic));

        assert!(!services.exists("Missing"));
        assert!(services.set_start_type("Missing", StartType::Manual).is_err());
    }
}
