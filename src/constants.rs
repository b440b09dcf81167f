// src/constants.rs

use std::time::Duration;

// Directory under the platform data dir that holds settings, snapshots and logs.
pub const APP_DIR_NAME: &str = "debloater";
pub const SETTINGS_FILE_NAME: &str = "settings.toml";
pub const SNAPSHOT_FILE_NAME: &str = "service_snapshots.json";
pub const LOG_DIR_NAME: &str = "logs";
pub const LOG_FILE_NAME: &str = "debloater.log";

pub const DEFAULT_RESTORE_POINT_DESCRIPTION: &str = "Debloater";
pub const DEFAULT_PROFILE_ID: &str = "recommended";

// Process creation flag that keeps child consoles hidden.
pub const CREATE_NO_WINDOW: u32 = 0x0800_0000;

pub const SCRIPT_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const SERVICE_STOP_TIMEOUT: Duration = Duration::from_secs(30);

// First Windows 11 build; everything below is reported as Windows 10.
pub const WINDOWS_11_BUILD: u32 = 22000;
pub const COPILOT_MIN_BUILD: u32 = 22631;

pub const SESSION_STARTED: &str = "=== Debloater Session Started ===";
pub const SESSION_ENDED: &str = "=== Debloater Session Ended ===";
