// src/utils/registry.rs

use std::{collections::HashMap, fmt, sync::Mutex};

use anyhow::{Context, Result};
use strum_macros::{Display, EnumIter};

/// Enumeration of supported registry key value types.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum RegistryKeyValue {
    Dword(u32),
    Qword(u64),
    String(String),
    Binary(Vec<u8>),
}

impl RegistryKeyValue {
    /// Returns the value as an integer when it has a numeric reading, including
    /// strings that hold a decimal integer.
    pub fn as_integer(&self) -> Option<u64> {
        match self {
            RegistryKeyValue::Dword(v) => Some(u64::from(*v)),
            RegistryKeyValue::Qword(v) => Some(*v),
            RegistryKeyValue::String(s) => s.trim().parse::<u64>().ok(),
            RegistryKeyValue::Binary(_) => None,
        }
    }

    /// Compares two values the way the registry hands them back: a DWORD read
    /// back as a QWORD, or as its decimal string form, still matches.
    pub fn matches(&self, other: &RegistryKeyValue) -> bool {
        if self == other {
            return true;
        }
        let numeric = |v: &RegistryKeyValue| {
            matches!(v, RegistryKeyValue::Dword(_) | RegistryKeyValue::Qword(_))
        };
        if numeric(self) || numeric(other) {
            return match (self.as_integer(), other.as_integer()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            };
        }
        false
    }
}

impl fmt::Display for RegistryKeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryKeyValue::Dword(v) => write!(f, "Dword({})", v),
            RegistryKeyValue::Qword(v) => write!(f, "Qword({})", v),
            RegistryKeyValue::String(v) => write!(f, "String({:?})", v),
            RegistryKeyValue::Binary(v) => write!(f, "Binary({:?})", v),
        }
    }
}

/// Root keys a registry path may start with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Hive {
    #[strum(serialize = "HKEY_LOCAL_MACHINE")]
    LocalMachine,
    #[strum(serialize = "HKEY_CURRENT_USER")]
    CurrentUser,
    #[strum(serialize = "HKEY_CLASSES_ROOT")]
    ClassesRoot,
    #[strum(serialize = "HKEY_USERS")]
    Users,
    #[strum(serialize = "HKEY_CURRENT_CONFIG")]
    CurrentConfig,
}

impl Hive {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_uppercase().as_str() {
            "HKEY_LOCAL_MACHINE" | "HKLM" => Some(Hive::LocalMachine),
            "HKEY_CURRENT_USER" | "HKCU" => Some(Hive::CurrentUser),
            "HKEY_CLASSES_ROOT" | "HKCR" => Some(Hive::ClassesRoot),
            "HKEY_USERS" | "HKU" => Some(Hive::Users),
            "HKEY_CURRENT_CONFIG" | "HKCC" => Some(Hive::CurrentConfig),
            _ => None,
        }
    }

    #[cfg(windows)]
    fn predef(self) -> winreg::RegKey {
        use winreg::enums::{
            HKEY_CLASSES_ROOT, HKEY_CURRENT_CONFIG, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE,
            HKEY_USERS,
        };

        winreg::RegKey::predef(match self {
            Hive::LocalMachine => HKEY_LOCAL_MACHINE,
            Hive::CurrentUser => HKEY_CURRENT_USER,
            Hive::ClassesRoot => HKEY_CLASSES_ROOT,
            Hive::Users => HKEY_USERS,
            Hive::CurrentConfig => HKEY_CURRENT_CONFIG,
        })
    }
}

/// Parses the full registry path into hive and subkey path.
///
/// # Parameters
///
/// - `path`: The full registry path (e.g., "HKEY_LOCAL_MACHINE\\Software\\..." or "HKLM\\Software\\...").
///
/// # Returns
///
/// - `Ok((Hive, String))` with the parsed hive and subkey path.
/// - `Err(anyhow::Error)` if parsing fails.
pub fn parse_registry_path(path: &str) -> Result<(Hive, String)> {
    let components: Vec<&str> = path.split('\\').filter(|c| !c.is_empty()).collect();
    if components.len() < 2 {
        anyhow::bail!(
            "Invalid registry path: '{}'. Expected format 'HKEY_*\\Subkey\\...'",
            path
        );
    }
    let hive = Hive::from_name(components[0])
        .with_context(|| format!("Unsupported registry hive: '{}'", components[0]))?;
    Ok((hive, components[1..].join("\\")))
}

/// Key/value store with registry semantics. Tweaks only ever talk to the
/// registry through this trait.
pub trait RegistryStore: Send + Sync {
    /// Reads a value. `Ok(None)` when the key or the value does not exist.
    fn read_value(&self, path: &str, key_name: &str) -> Result<Option<RegistryKeyValue>>;

    /// Creates or modifies a value, creating all intermediate keys.
    fn write_value(&self, path: &str, key_name: &str, value: &RegistryKeyValue) -> Result<()>;

    /// Deletes a value. A missing value or key counts as success.
    fn delete_value(&self, path: &str, key_name: &str) -> Result<()>;

    fn key_exists(&self, path: &str) -> Result<bool>;

    /// Deletes a key and everything below it. A missing key counts as success.
    fn delete_key(&self, path: &str) -> Result<()>;
}

/// In-process registry used off-Windows and by tests.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    keys: Mutex<HashMap<(Hive, String), HashMap<String, RegistryKeyValue>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn normalize(path: &str) -> Result<(Hive, String)> {
        let (hive, subkey) = parse_registry_path(path)?;
        Ok((hive, subkey.to_lowercase()))
    }

    fn lock(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<(Hive, String), HashMap<String, RegistryKeyValue>>>
    {
        // A poisoned map is still a consistent map: every mutation is a single insert/remove.
        self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RegistryStore for MemoryRegistry {
    fn read_value(&self, path: &str, key_name: &str) -> Result<Option<RegistryKeyValue>> {
        let key = Self::normalize(path)?;
        Ok(self
            .lock()
            .get(&key)
            .and_then(|values| values.get(&key_name.to_lowercase()))
            .cloned())
    }

    fn write_value(&self, path: &str, key_name: &str, value: &RegistryKeyValue) -> Result<()> {
        let (hive, subkey) = Self::normalize(path)?;
        let mut keys = self.lock();
        // Intermediate keys exist implicitly, mirroring RegCreateKeyEx.
        let mut partial = String::new();
        for component in subkey.split('\\') {
            if !partial.is_empty() {
                partial.push('\\');
            }
            partial.push_str(component);
            keys.entry((hive, partial.clone())).or_default();
        }
        keys.entry((hive, subkey))
            .or_default()
            .insert(key_name.to_lowercase(), value.clone());
        Ok(())
    }

    fn delete_value(&self, path: &str, key_name: &str) -> Result<()> {
        let key = Self::normalize(path)?;
        if let Some(values) = self.lock().get_mut(&key) {
            values.remove(&key_name.to_lowercase());
        }
        Ok(())
    }

    fn key_exists(&self, path: &str) -> Result<bool> {
        let key = Self::normalize(path)?;
        Ok(self.lock().contains_key(&key))
    }

    fn delete_key(&self, path: &str) -> Result<()> {
        let (hive, subkey) = Self::normalize(path)?;
        let prefix = format!("{}\\", subkey);
        self.lock()
            .retain(|(h, k), _| !(*h == hive && (*k == subkey || k.starts_with(&prefix))));
        Ok(())
    }
}

/// The live Windows registry, accessed through `winreg`.
#[cfg(windows)]
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsRegistry;

#[cfg(windows)]
mod windows_registry {
    use std::io::ErrorKind;

    use anyhow::{Context, Result};
    use winreg::{
        enums::{
            RegType::{REG_BINARY, REG_DWORD, REG_EXPAND_SZ, REG_QWORD, REG_SZ},
            KEY_READ, KEY_WRITE,
        },
        RegKey, RegValue,
    };

    use super::{parse_registry_path, RegistryKeyValue, RegistryStore, WindowsRegistry};

    fn decode_utf16(bytes: &[u8]) -> String {
        let wide: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
            .collect();
        String::from_utf16_lossy(&wide)
            .trim_end_matches('\0')
            .to_string()
    }

    fn get_registry_key_value(key: &RegKey, value_name: &str) -> Result<Option<RegistryKeyValue>> {
        match key.get_raw_value(value_name) {
            Ok(value) => match value.vtype {
                REG_DWORD => {
                    let bytes: [u8; 4] = value
                        .bytes
                        .get(..4)
                        .and_then(|b| b.try_into().ok())
                        .with_context(|| format!("REG_DWORD data too small for '{}'", value_name))?;
                    Ok(Some(RegistryKeyValue::Dword(u32::from_le_bytes(bytes))))
                }
                REG_QWORD => {
                    let bytes: [u8; 8] = value
                        .bytes
                        .get(..8)
                        .and_then(|b| b.try_into().ok())
                        .with_context(|| format!("REG_QWORD data too small for '{}'", value_name))?;
                    Ok(Some(RegistryKeyValue::Qword(u64::from_le_bytes(bytes))))
                }
                REG_SZ | REG_EXPAND_SZ => {
                    Ok(Some(RegistryKeyValue::String(decode_utf16(&value.bytes))))
                }
                REG_BINARY => Ok(Some(RegistryKeyValue::Binary(value.bytes.clone()))),
                other => anyhow::bail!("Unsupported registry value type: {:?}", other),
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow::anyhow!(
                "Failed to read value '{}': {}",
                value_name,
                e
            )),
        }
    }

    fn set_registry_key_value(
        key: &RegKey,
        value_name: &str,
        value: &RegistryKeyValue,
    ) -> Result<()> {
        match value {
            RegistryKeyValue::Dword(v) => key
                .set_value(value_name, v)
                .with_context(|| format!("Failed to set DWORD value '{}' to '{}'", value_name, v)),
            RegistryKeyValue::Qword(v) => key
                .set_value(value_name, v)
                .with_context(|| format!("Failed to set QWORD value '{}' to '{}'", value_name, v)),
            RegistryKeyValue::String(s) => key
                .set_value(value_name, s)
                .with_context(|| format!("Failed to set String value '{}' to '{}'", value_name, s)),
            RegistryKeyValue::Binary(data) => key
                .set_raw_value(
                    value_name,
                    &RegValue {
                        bytes: data.clone(),
                        vtype: REG_BINARY,
                    },
                )
                .with_context(|| {
                    format!(
                        "Failed to set Binary value '{}' to '{:?}'",
                        value_name, data
                    )
                }),
        }
    }

    impl RegistryStore for WindowsRegistry {
        fn read_value(&self, path: &str, key_name: &str) -> Result<Option<RegistryKeyValue>> {
            let (hive, subkey_path) = parse_registry_path(path)
                .with_context(|| format!("Failed to parse registry path '{}'", path))?;

            let subkey = match hive.predef().open_subkey_with_flags(&subkey_path, KEY_READ) {
                Ok(key) => key,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
                Err(e) => {
                    return Err(anyhow::Error::from(e))
                        .with_context(|| format!("Failed to open subkey '{}'", subkey_path))
                }
            };

            get_registry_key_value(&subkey, key_name)
        }

        fn write_value(&self, path: &str, key_name: &str, value: &RegistryKeyValue) -> Result<()> {
            let (hive, subkey_path) = parse_registry_path(path)
                .with_context(|| format!("Failed to parse registry path '{}'", path))?;

            // create_subkey creates all intermediate subkeys if they don't exist
            let (key, _) = hive
                .predef()
                .create_subkey(&subkey_path)
                .with_context(|| format!("Failed to create or open subkey '{}'", subkey_path))?;

            set_registry_key_value(&key, key_name, value).with_context(|| {
                format!(
                    "Failed to set registry value '{}' in path '{}'",
                    key_name, path
                )
            })
        }

        fn delete_value(&self, path: &str, key_name: &str) -> Result<()> {
            let (hive, subkey_path) = parse_registry_path(path)
                .with_context(|| format!("Failed to parse registry path '{}'", path))?;

            let subkey = match hive.predef().open_subkey_with_flags(&subkey_path, KEY_WRITE) {
                Ok(key) => key,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
                Err(e) => {
                    return Err(anyhow::Error::from(e))
                        .with_context(|| format!("Failed to open subkey '{}'", subkey_path))
                }
            };

            match subkey.delete_value(key_name) {
                Ok(_) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(anyhow::anyhow!(
                    "Failed to delete registry entry '{}' in '{}': {}",
                    key_name,
                    subkey_path,
                    e
                )),
            }
        }

        fn key_exists(&self, path: &str) -> Result<bool> {
            let (hive, subkey_path) = parse_registry_path(path)?;
            match hive.predef().open_subkey_with_flags(&subkey_path, KEY_READ) {
                Ok(_) => Ok(true),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
                Err(e) => Err(anyhow::Error::from(e))
                    .with_context(|| format!("Failed to open subkey '{}'", subkey_path)),
            }
        }

        fn delete_key(&self, path: &str) -> Result<()> {
            let (hive, subkey_path) = parse_registry_path(path)?;
            match hive.predef().delete_subkey_all(&subkey_path) {
                Ok(_) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(anyhow::Error::from(e))
                    .with_context(|| format!("Failed to delete key '{}'", path)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY_PATH: &str = "HKEY_LOCAL_MACHINE\\SOFTWARE\\Policies\\Microsoft\\Windows\\System";

    #[test]
    fn test_numeric_values_match_across_widths_and_strings() {
        assert!(RegistryKeyValue::Dword(4).matches(&RegistryKeyValue::Qword(4)));
        assert!(RegistryKeyValue::Qword(4).matches(&RegistryKeyValue::Dword(4)));
        assert!(RegistryKeyValue::Dword(0).matches(&RegistryKeyValue::String("0".into())));
        assert!(RegistryKeyValue::String(" 10000 ".into()).matches(&RegistryKeyValue::Dword(10000)));
        assert!(!RegistryKeyValue::Dword(1).matches(&RegistryKeyValue::String("one".into())));
        assert!(!RegistryKeyValue::Dword(1).matches(&RegistryKeyValue::Dword(0)));
        assert!(!RegistryKeyValue::String("1".into()).matches(&RegistryKeyValue::String("01".into())));
        assert!(!RegistryKeyValue::Binary(vec![1]).matches(&RegistryKeyValue::Dword(1)));
    }

    #[test]
    fn test_parse_registry_path_accepts_short_and_long_hives() {
        let (hive, subkey) = parse_registry_path("HKLM\\SOFTWARE\\Policies").unwrap();
        assert_eq!(hive, Hive::LocalMachine);
        assert_eq!(subkey, "SOFTWARE\\Policies");

        let (hive, _) = parse_registry_path("hkey_current_user\\Software").unwrap();
        assert_eq!(hive, Hive::CurrentUser);
    }

    #[test]
    fn test_invalid_registry_path() {
        let invalid_paths = vec![
            "",
            "INVALID_HIVE\\Software",
            "HKEY_UNKNOWN\\Software",
            "HKEY_CURRENT_USER", // Missing subkey
        ];

        for path in invalid_paths {
            let result = parse_registry_path(path);
            assert!(result.is_err(), "Path '{}' should be invalid", path);
        }
    }

    #[test]
    fn test_memory_registry_is_case_insensitive_and_creates_parents() {
        let registry = MemoryRegistry::new();
        registry
            .write_value(POLICY_PATH, "EnableActivityFeed", &RegistryKeyValue::Dword(0))
            .unwrap();

        let read = registry
            .read_value("HKLM\\software\\policies\\microsoft\\windows\\system", "enableactivityfeed")
            .unwrap();
        assert_eq!(read, Some(RegistryKeyValue::Dword(0)));
        assert!(registry.key_exists("HKLM\\SOFTWARE\\Policies\\Microsoft").unwrap());
        assert_eq!(registry.read_value(POLICY_PATH, "Missing").unwrap(), None);
        assert_eq!(
            registry.read_value("HKLM\\SOFTWARE\\Nowhere", "Value").unwrap(),
            None
        );
    }

    #[test]
    fn test_memory_registry_delete_key_removes_descendants_only() {
        let registry = MemoryRegistry::new();
        registry
            .write_value("HKCU\\Software\\A\\B", "x", &RegistryKeyValue::Dword(1))
            .unwrap();
        registry
            .write_value("HKCU\\Software\\AB", "y", &RegistryKeyValue::Dword(1))
            .unwrap();

        registry.delete_key("HKCU\\Software\\A").unwrap();

        assert!(!registry.key_exists("HKCU\\Software\\A").unwrap());
        assert!(!registry.key_exists("HKCU\\Software\\A\\B").unwrap());
        assert!(registry.key_exists("HKCU\\Software\\AB").unwrap());
        // Deleting something that is already gone is fine.
        registry.delete_key("HKCU\\Software\\A").unwrap();
        registry.delete_value("HKCU\\Software\\A", "x").unwrap();
    }
}
