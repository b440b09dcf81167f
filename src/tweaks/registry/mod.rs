// src/tweaks/registry/mod.rs

pub mod method;

use method::{RegistryKeyTweak, RegistryModification, RegistryTweak};

use super::{ids, Tweak, TweakCategory, TweakSeverity};
use crate::constants::{COPILOT_MIN_BUILD, WINDOWS_11_BUILD};

const EXPLORER_ADVANCED: &str =
    "HKEY_CURRENT_USER\\Software\\Microsoft\\Windows\\CurrentVersion\\Explorer\\Advanced";
const CONTENT_DELIVERY: &str =
    "HKEY_CURRENT_USER\\Software\\Microsoft\\Windows\\CurrentVersion\\ContentDeliveryManager";
const ACTIVITY_POLICY: &str = "HKEY_LOCAL_MACHINE\\SOFTWARE\\Policies\\Microsoft\\Windows\\System";
const SEARCH_SETTINGS: &str =
    "HKEY_CURRENT_USER\\SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Search";
const CLIPBOARD: &str = "HKEY_CURRENT_USER\\SOFTWARE\\Microsoft\\Clipboard";

/// Registry key of a service under `CurrentControlSet\Services`.
macro_rules! service_key {
    ($name:literal) => {
        concat!(
            "HKEY_LOCAL_MACHINE\\SYSTEM\\CurrentControlSet\\Services\\",
            $name
        )
    };
}

/// Disabled start mode (4) on apply, automatic (2) on undo.
fn disable_service_start(service_path: &'static str) -> RegistryModification {
    RegistryModification::dword(service_path, "Start", 4, 2)
}

pub fn disable_telemetry_policy() -> Tweak {
    Tweak::registry(
        ids::DISABLE_TELEMETRY_POLICY,
        "Disable Telemetry (Policy)",
        "Sets the Windows data collection policy to its lowest level to reduce diagnostic data collection.",
        TweakCategory::Privacy,
        TweakSeverity::Caution,
        RegistryTweak::new(vec![RegistryModification::dword(
            "HKEY_LOCAL_MACHINE\\SOFTWARE\\Policies\\Microsoft\\Windows\\DataCollection",
            "AllowTelemetry",
            0,
            3,
        )]),
    )
}

pub fn disable_advertising_id() -> Tweak {
    Tweak::registry(
        ids::DISABLE_ADVERTISING_ID,
        "Disable Advertising ID",
        "Turns off the per-user advertising ID used to personalize ads across apps.",
        TweakCategory::Privacy,
        TweakSeverity::Safe,
        RegistryTweak::new(vec![RegistryModification::dword(
            "HKEY_CURRENT_USER\\Software\\Microsoft\\Windows\\CurrentVersion\\AdvertisingInfo",
            "Enabled",
            0,
            1,
        )]),
    )
}

pub fn disable_activity_history() -> Tweak {
    Tweak::registry(
        ids::DISABLE_ACTIVITY_HISTORY,
        "Disable Activity History",
        "Disables the activity feed and stops Windows from publishing or uploading user activities.",
        TweakCategory::Privacy,
        TweakSeverity::Caution,
        RegistryTweak::new(vec![
            RegistryModification::dword(ACTIVITY_POLICY, "EnableActivityFeed", 0, 1),
            RegistryModification::dword(ACTIVITY_POLICY, "PublishUserActivities", 0, 1),
            RegistryModification::dword(ACTIVITY_POLICY, "UploadUserActivities", 0, 1),
        ]),
    )
}

pub fn disable_windows_spotlight() -> Tweak {
    Tweak::registry(
        ids::DISABLE_WINDOWS_SPOTLIGHT,
        "Disable Windows Spotlight",
        "Disables rotating Spotlight images on the lock screen and the tips shown over them.",
        TweakCategory::Privacy,
        TweakSeverity::Safe,
        RegistryTweak::new(vec![
            RegistryModification::dword(CONTENT_DELIVERY, "RotatingLockScreenEnabled", 0, 1),
            RegistryModification::dword(CONTENT_DELIVERY, "RotatingLockScreenOverlayEnabled", 0, 1),
            RegistryModification::dword(CONTENT_DELIVERY, "SubscribedContent-338387Enabled", 0, 1),
        ]),
    )
}

pub fn disable_consumer_features() -> Tweak {
    Tweak::registry(
        ids::DISABLE_CONSUMER_FEATURES,
        "Disable Consumer Features",
        "Prevents Windows from automatically installing suggested apps and other consumer experiences.",
        TweakCategory::Privacy,
        TweakSeverity::Safe,
        RegistryTweak::new(vec![RegistryModification::dword(
            "HKEY_LOCAL_MACHINE\\SOFTWARE\\Policies\\Microsoft\\Windows\\CloudContent",
            "DisableWindowsConsumerFeatures",
            1,
            0,
        )]),
    )
}

pub fn disable_cloud_clipboard() -> Tweak {
    Tweak::registry(
        ids::DISABLE_CLOUD_CLIPBOARD,
        "Disable Cloud Clipboard",
        "Turns off clipboard history and stops clipboard contents from syncing across devices.",
        TweakCategory::Privacy,
        TweakSeverity::Safe,
        RegistryTweak::new(vec![
            RegistryModification::dword(CLIPBOARD, "EnableClipboardHistory", 0, 1),
            RegistryModification::dword(CLIPBOARD, "CloudClipboardAutomaticUpload", 0, 1),
        ]),
    )
}

pub fn disable_cortana() -> Tweak {
    Tweak::registry(
        ids::DISABLE_CORTANA,
        "Disable Cortana",
        "Disables the Cortana voice assistant through policy.",
        TweakCategory::Privacy,
        TweakSeverity::Caution,
        RegistryTweak::new(vec![RegistryModification::dword(
            "HKEY_LOCAL_MACHINE\\SOFTWARE\\Policies\\Microsoft\\Windows\\Windows Search",
            "AllowCortana",
            0,
            1,
        )]),
    )
}

pub fn disable_one_drive() -> Tweak {
    Tweak::registry(
        ids::DISABLE_ONE_DRIVE,
        "Disable OneDrive",
        "Prevents OneDrive from syncing files and hides its sync provider notifications in File Explorer.",
        TweakCategory::Privacy,
        TweakSeverity::Caution,
        RegistryTweak::new(vec![
            RegistryModification::dword(
                "HKEY_LOCAL_MACHINE\\SOFTWARE\\Policies\\Microsoft\\Windows\\OneDrive",
                "DisableFileSyncNGSC",
                1,
                0,
            ),
            RegistryModification::dword(EXPLORER_ADVANCED, "ShowSyncProviderNotifications", 0, 1),
        ]),
    )
}

pub fn disable_game_dvr() -> Tweak {
    Tweak::registry(
        ids::DISABLE_GAME_DVR,
        "Disable Game DVR / Captures",
        "Disables Game Bar background recording, which can cost frame rate while gaming.",
        TweakCategory::Performance,
        TweakSeverity::Safe,
        RegistryTweak::new(vec![
            RegistryModification::dword(
                "HKEY_CURRENT_USER\\System\\GameConfigStore",
                "GameDVR_Enabled",
                0,
                1,
            ),
            RegistryModification::dword(
                "HKEY_LOCAL_MACHINE\\SOFTWARE\\Policies\\Microsoft\\Windows\\GameDVR",
                "AllowGameDVR",
                0,
                1,
            ),
        ]),
    )
}

pub fn disable_startup_delay() -> Tweak {
    Tweak::registry(
        ids::DISABLE_STARTUP_DELAY,
        "Disable Startup Delay",
        "Removes the delay Windows applies before launching startup programs after sign-in.",
        TweakCategory::Performance,
        TweakSeverity::Safe,
        RegistryTweak::new(vec![RegistryModification::dword(
            "HKEY_CURRENT_USER\\Software\\Microsoft\\Windows\\CurrentVersion\\Explorer\\Serialize",
            "StartupDelayInMSec",
            0,
            10000,
        )]),
    )
}

pub fn disable_search_indexing() -> Tweak {
    Tweak::registry(
        ids::DISABLE_SEARCH_INDEXING,
        "Disable Windows Search Indexing",
        "Disables the Windows Search service so files are no longer indexed in the background.",
        TweakCategory::Performance,
        TweakSeverity::Caution,
        RegistryTweak::new(vec![disable_service_start(service_key!("WSearch"))]),
    )
}

pub fn disable_superfetch() -> Tweak {
    Tweak::registry(
        ids::DISABLE_SUPERFETCH,
        "Disable Superfetch/SysMain",
        "Disables the SysMain (Superfetch) service. Mostly useful on SSD-only systems.",
        TweakCategory::Performance,
        TweakSeverity::Caution,
        RegistryTweak::new(vec![disable_service_start(service_key!("SysMain"))]),
    )
}

pub fn disable_bing_search() -> Tweak {
    Tweak::registry(
        ids::DISABLE_BING_SEARCH,
        "Disable Bing Search in Start",
        "Stops Start menu search from sending queries to Bing and showing web suggestions.",
        TweakCategory::Privacy,
        TweakSeverity::Safe,
        RegistryTweak::new(vec![
            RegistryModification::dword(SEARCH_SETTINGS, "BingSearchEnabled", 0, 1),
            RegistryModification::dword(SEARCH_SETTINGS, "CortanaConsent", 0, 1),
            RegistryModification::dword(
                "HKEY_CURRENT_USER\\SOFTWARE\\Policies\\Microsoft\\Windows\\Explorer",
                "DisableSearchBoxSuggestions",
                1,
                0,
            ),
        ]),
    )
}

pub fn show_file_extensions() -> Tweak {
    Tweak::registry(
        ids::SHOW_FILE_EXTENSIONS,
        "Show File Extensions",
        "Shows file name extensions in File Explorer.",
        TweakCategory::Visual,
        TweakSeverity::Safe,
        RegistryTweak::new(vec![RegistryModification::dword(
            EXPLORER_ADVANCED,
            "HideFileExt",
            0,
            1,
        )]),
    )
}

pub fn classic_context_menu() -> Tweak {
    Tweak::registry_key(
        ids::CLASSIC_CONTEXT_MENU,
        "Classic Right-Click Menu",
        "Brings back the full Windows 10 style context menu on Windows 11. Explorer may need a restart.",
        TweakCategory::Visual,
        TweakSeverity::Caution,
        RegistryKeyTweak {
            path: "HKEY_CURRENT_USER\\Software\\Classes\\CLSID\\{86ca1aa0-34aa-4e8b-a509-50c905bae2a2}\\InprocServer32",
        },
    )
    .with_min_build(WINDOWS_11_BUILD)
}

pub fn disable_task_view_button() -> Tweak {
    Tweak::registry(
        ids::DISABLE_TASK_VIEW_BUTTON,
        "Hide Task View Button",
        "Removes the Task View button from the taskbar.",
        TweakCategory::Visual,
        TweakSeverity::Safe,
        RegistryTweak::new(vec![RegistryModification::dword(
            EXPLORER_ADVANCED,
            "ShowTaskViewButton",
            0,
            1,
        )]),
    )
}

pub fn disable_widgets() -> Tweak {
    Tweak::registry(
        ids::DISABLE_WIDGETS,
        "Disable Widgets",
        "Hides the taskbar Widgets button and turns off the news and interests board.",
        TweakCategory::Visual,
        TweakSeverity::Safe,
        RegistryTweak::new(vec![
            RegistryModification::dword(EXPLORER_ADVANCED, "TaskbarDa", 0, 1),
            RegistryModification::dword(
                "HKEY_LOCAL_MACHINE\\SOFTWARE\\Policies\\Microsoft\\Dsh",
                "AllowNewsAndInterests",
                0,
                1,
            ),
        ]),
    )
    .with_min_build(WINDOWS_11_BUILD)
}

pub fn disable_delivery_optimization() -> Tweak {
    Tweak::registry(
        ids::DISABLE_DELIVERY_OPTIMIZATION,
        "Disable Delivery Optimization",
        "Turns off peer-to-peer update distribution. Saves upload bandwidth but Windows Update may download more slowly.",
        TweakCategory::Services,
        TweakSeverity::Caution,
        RegistryTweak::new(vec![RegistryModification::dword(
            "HKEY_LOCAL_MACHINE\\SOFTWARE\\Policies\\Microsoft\\Windows\\DeliveryOptimization",
            "DODownloadMode",
            99,
            1,
        )]),
    )
}

pub fn disable_xbox_services() -> Tweak {
    Tweak::registry(
        ids::DISABLE_XBOX_SERVICES,
        "Disable Xbox Services",
        "Disables Xbox Live authentication, game save and networking services. The Xbox app stays installed.",
        TweakCategory::Services,
        TweakSeverity::Caution,
        RegistryTweak::new(vec![
            disable_service_start(service_key!("XblAuthManager")),
            disable_service_start(service_key!("XblGameSave")),
            disable_service_start(service_key!("XboxNetApiSvc")),
        ]),
    )
}

pub fn disable_copilot() -> Tweak {
    Tweak::registry(
        ids::DISABLE_COPILOT,
        "Disable Copilot",
        "Turns off the Windows Copilot assistant on Windows 11 23H2 and later.",
        TweakCategory::Privacy,
        TweakSeverity::Safe,
        RegistryTweak::new(vec![RegistryModification::dword(
            "HKEY_LOCAL_MACHINE\\SOFTWARE\\Policies\\Microsoft\\Windows\\WindowsCopilot",
            "TurnOffWindowsCopilot",
            1,
            0,
        )]),
    )
    .with_min_build(COPILOT_MIN_BUILD)
}

pub fn disable_edge_web_app() -> Tweak {
    Tweak::registry(
        ids::DISABLE_EDGE_WEB_APP,
        "Disable Edge Web App Integration",
        "Stops Microsoft Edge from scheduling background update and web app tasks.",
        TweakCategory::Privacy,
        TweakSeverity::Safe,
        RegistryTweak::new(vec![RegistryModification::dword(
            "HKEY_LOCAL_MACHINE\\SOFTWARE\\Policies\\Microsoft\\MicrosoftEdge\\Update",
            "UpdateDefault",
            0,
            1,
        )]),
    )
}

pub fn disable_windows_update() -> Tweak {
    Tweak::registry(
        ids::DISABLE_WINDOWS_UPDATE,
        "Disable Windows Update",
        "Disables automatic updates and access to Windows Update. Leaves the system without security patches unless updates are managed manually.",
        TweakCategory::Advanced,
        TweakSeverity::Dangerous,
        RegistryTweak::new(vec![
            RegistryModification::dword(
                "HKEY_LOCAL_MACHINE\\SOFTWARE\\Policies\\Microsoft\\Windows\\WindowsUpdate\\AU",
                "NoAutoUpdate",
                1,
                0,
            ),
            RegistryModification::dword(
                "HKEY_LOCAL_MACHINE\\SOFTWARE\\Policies\\Microsoft\\Windows\\WindowsUpdate",
                "DisableWindowsUpdateAccess",
                1,
                0,
            ),
        ]),
    )
}

pub fn disable_defender() -> Tweak {
    Tweak::registry(
        ids::DISABLE_DEFENDER,
        "Disable Windows Defender",
        "Disables Defender scanning and cloud reporting. Only use with another antivirus running, the system is otherwise unprotected.",
        TweakCategory::Advanced,
        TweakSeverity::Dangerous,
        RegistryTweak::new(vec![
            RegistryModification::dword(
                "HKEY_LOCAL_MACHINE\\SOFTWARE\\Policies\\Microsoft\\Windows Defender",
                "DisableAntiSpyware",
                1,
                0,
            ),
            RegistryModification::dword(
                "HKEY_LOCAL_MACHINE\\SOFTWARE\\Policies\\Microsoft\\Windows Defender\\Spynet",
                "SpyNetReporting",
                0,
                2,
            ),
        ]),
    )
}
