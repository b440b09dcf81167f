// src/os_guard.rs

use std::sync::Arc;

use strum_macros::Display;
use tracing::debug;

use crate::{
    constants::WINDOWS_11_BUILD,
    tweaks::Tweak,
    utils::registry::{RegistryKeyValue, RegistryStore},
};

const CURRENT_VERSION: &str = "HKEY_LOCAL_MACHINE\\SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion";
const POLICIES: &str = "HKEY_LOCAL_MACHINE\\SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Policies";
const MDM: &str = "HKEY_LOCAL_MACHINE\\SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\MDM";
const VSS_SERVICE: &str = "HKEY_LOCAL_MACHINE\\SYSTEM\\CurrentControlSet\\Services\\VSS";
const DEFENDER: &str = "HKEY_LOCAL_MACHINE\\SOFTWARE\\Microsoft\\Windows Defender";
const COMPUTER_NAME: &str =
    "HKEY_LOCAL_MACHINE\\SYSTEM\\CurrentControlSet\\Control\\ComputerName\\ComputerName";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum WindowsVersion {
    #[strum(serialize = "Windows 10")]
    Windows10,
    #[strum(serialize = "Windows 11")]
    Windows11,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum WindowsEdition {
    Home,
    Pro,
    Enterprise,
    Education,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ProtectionStatus {
    Enabled,
    Disabled,
    Unknown,
}

/// Read-only view of the OS environment. Every query falls back to a fixed
/// value when the registry can't be read.
#[derive(Clone)]
pub struct OsGuard {
    registry: Arc<dyn RegistryStore>,
}

impl OsGuard {
    pub fn new(registry: Arc<dyn RegistryStore>) -> Self {
        Self { registry }
    }

    fn read(&self, path: &str, name: &str) -> Option<RegistryKeyValue> {
        match self.registry.read_value(path, name) {
            Ok(value) => value,
            Err(e) => {
                debug!("Failed to read '{}' in '{}': {}", name, path, e);
                None
            }
        }
    }

    fn read_string(&self, path: &str, name: &str) -> Option<String> {
        match self.read(path, name)? {
            RegistryKeyValue::String(s) => Some(s),
            RegistryKeyValue::Dword(v) => Some(v.to_string()),
            RegistryKeyValue::Qword(v) => Some(v.to_string()),
            RegistryKeyValue::Binary(_) => None,
        }
    }

    /// `CurrentBuildNumber`, or 0 when it can't be read.
    pub fn build_number(&self) -> u32 {
        self.read(CURRENT_VERSION, "CurrentBuildNumber")
            .and_then(|v| v.as_integer())
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(0)
    }

    pub fn windows_version(&self) -> WindowsVersion {
        match self.build_number() {
            0 => WindowsVersion::Unknown,
            build if build >= WINDOWS_11_BUILD => WindowsVersion::Windows11,
            _ => WindowsVersion::Windows10,
        }
    }

    pub fn edition(&self) -> WindowsEdition {
        match self.read_string(CURRENT_VERSION, "EditionID").as_deref() {
            Some("Core") => WindowsEdition::Home,
            Some("Professional") => WindowsEdition::Pro,
            Some("Enterprise") => WindowsEdition::Enterprise,
            Some("Education") => WindowsEdition::Education,
            _ => WindowsEdition::Unknown,
        }
    }

    /// True when a Group Policy object has been applied.
    pub fn is_policy_managed(&self) -> bool {
        self.read(POLICIES, "Gpo").is_some()
    }

    pub fn is_mdm_enrolled(&self) -> bool {
        self.read_string(MDM, "EnrollmentStatus").as_deref() == Some("1")
    }

    pub fn system_protection_status(&self) -> ProtectionStatus {
        match self.registry.read_value(VSS_SERVICE, "Start") {
            Ok(Some(value)) => match value.as_integer() {
                Some(2) | Some(4) => ProtectionStatus::Enabled,
                _ => ProtectionStatus::Disabled,
            },
            Ok(None) => ProtectionStatus::Disabled,
            Err(e) => {
                debug!("Failed to read VSS start type: {}", e);
                ProtectionStatus::Unknown
            }
        }
    }

    pub fn is_defender_active(&self) -> bool {
        !matches!(
            self.read(DEFENDER, "DisableAntiSpyware").and_then(|v| v.as_integer()),
            Some(1)
        )
    }

    pub fn device_name(&self) -> String {
        self.read_string(COMPUTER_NAME, "ComputerName")
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// False only when the build is known and below the tweak's minimum.
    pub fn supports(&self, tweak: &Tweak) -> bool {
        match tweak.min_build {
            Some(min_build) => {
                let build = self.build_number();
                build == 0 || build >= min_build
            }
            None => true,
        }
    }

    pub fn system_info(&self) -> String {
        format!(
            "{} {} (Build {}) | Protection: {} | Defender: {} | Managed: {}",
            self.windows_version(),
            self.edition(),
            self.build_number(),
            self.system_protection_status(),
            if self.is_defender_active() {
                "Active"
            } else {
                "Disabled"
            },
            if self.is_policy_managed() || self.is_mdm_enrolled() {
                "Yes"
            } else {
                "No"
            }
        )
    }
}
