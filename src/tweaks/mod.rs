// src/tweaks/mod.rs

pub mod method;
pub mod powershell;
pub mod registry;
pub mod services;

use std::{fmt, sync::Arc};

use anyhow::Error;
pub use method::TweakMethod;
use powershell::method::PackageRemovalTweak;
use registry::method::{RegistryKeyTweak, RegistryTweak};
use services::method::ServiceTweak;
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    host::Host,
    settings::BloatwareScope,
    utils::registry::{parse_registry_path, Hive},
};

/// Stable, namespaced tweak identifiers.
pub mod ids {
    pub const DISABLE_TELEMETRY_POLICY: &str = "privacy.disableTelemetryPolicy";
    pub const DISABLE_ADVERTISING_ID: &str = "privacy.disableAdvertisingId";
    pub const DISABLE_ACTIVITY_HISTORY: &str = "privacy.disableActivityHistory";
    pub const DISABLE_WINDOWS_SPOTLIGHT: &str = "privacy.disableWindowsSpotlight";
    pub const DISABLE_CONSUMER_FEATURES: &str = "privacy.disableConsumerFeatures";
    pub const DISABLE_CLOUD_CLIPBOARD: &str = "privacy.disableCloudClipboard";
    pub const DISABLE_CORTANA: &str = "privacy.disableCortana";
    pub const DISABLE_ONE_DRIVE: &str = "privacy.disableOneDrive";
    pub const DISABLE_GAME_DVR: &str = "performance.disableGameDvr";
    pub const DISABLE_STARTUP_DELAY: &str = "performance.disableStartupDelay";
    pub const DISABLE_SEARCH_INDEXING: &str = "performance.disableSearchIndexing";
    pub const DISABLE_SUPERFETCH: &str = "performance.disableSuperfetch";
    pub const DISABLE_BING_SEARCH: &str = "privacy.disableBingSearch";
    pub const SHOW_FILE_EXTENSIONS: &str = "visual.showFileExtensions";
    pub const CLASSIC_CONTEXT_MENU: &str = "visual.classicContextMenu";
    pub const DISABLE_TASK_VIEW_BUTTON: &str = "visual.disableTaskViewButton";
    pub const DISABLE_WIDGETS: &str = "visual.disableWidgets";
    pub const DISABLE_DIAG_TRACK: &str = "services.disableDiagTrack";
    pub const DISABLE_DELIVERY_OPTIMIZATION: &str = "services.disableDeliveryOptimization";
    pub const DISABLE_XBOX_SERVICES: &str = "services.disableXboxServices";
    pub const DISABLE_COPILOT: &str = "privacy.disableCopilot";
    pub const DISABLE_EDGE_WEB_APP: &str = "privacy.disableEdgeWebApp";
    pub const DISABLE_WINDOWS_UPDATE: &str = "security.disableWindowsUpdate";
    pub const DISABLE_DEFENDER: &str = "security.disableDefender";
    pub const REMOVE_BLOATWARE_APPS: &str = "bloatware.removeApps";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum TweakCategory {
    Privacy,
    Performance,
    Visual,
    Services,
    Bloatware,
    Advanced,
}

/// Risk classification. Drives caller-side gating only, never engine behavior.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter,
)]
pub enum TweakSeverity {
    Safe,
    Caution,
    Dangerous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum TweakStatus {
    Applied,
    #[strum(serialize = "Not Applied")]
    NotApplied,
    Unknown,
    #[strum(serialize = "Not Supported")]
    NotSupported,
}

/// A single reversible unit of system configuration. Stateless: the same
/// value is read, applied and undone any number of times.
#[derive(Clone)]
pub struct Tweak {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub category: TweakCategory,
    pub severity: TweakSeverity,
    pub admin_required: bool,
    pub supports_undo: bool,
    /// Lowest OS build the tweak has any effect on.
    pub min_build: Option<u32>,
    pub method: Arc<dyn TweakMethod>,
}

impl fmt::Debug for Tweak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tweak")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("severity", &self.severity)
            .field("admin_required", &self.admin_required)
            .field("supports_undo", &self.supports_undo)
            .field("min_build", &self.min_build)
            .finish_non_exhaustive()
    }
}

impl Tweak {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: &'static str,
        title: &'static str,
        description: &'static str,
        category: TweakCategory,
        severity: TweakSeverity,
        admin_required: bool,
        supports_undo: bool,
        method: Arc<dyn TweakMethod>,
    ) -> Self {
        Self {
            id,
            title,
            description,
            category,
            severity,
            admin_required,
            supports_undo,
            min_build: None,
            method,
        }
    }

    /// Declarative registry tweak. Requires admin when any entry is machine-wide.
    pub fn registry(
        id: &'static str,
        title: &'static str,
        description: &'static str,
        category: TweakCategory,
        severity: TweakSeverity,
        method: RegistryTweak,
    ) -> Self {
        let admin_required = method.requires_admin();
        Self::new(
            id,
            title,
            description,
            category,
            severity,
            admin_required,
            true,
            Arc::new(method),
        )
    }

    pub fn registry_key(
        id: &'static str,
        title: &'static str,
        description: &'static str,
        category: TweakCategory,
        severity: TweakSeverity,
        method: RegistryKeyTweak,
    ) -> Self {
        let admin_required = matches!(
            parse_registry_path(method.path),
            Ok((Hive::LocalMachine, _))
        );
        Self::new(
            id,
            title,
            description,
            category,
            severity,
            admin_required,
            true,
            Arc::new(method),
        )
    }

    pub fn service(
        id: &'static str,
        title: &'static str,
        description: &'static str,
        category: TweakCategory,
        severity: TweakSeverity,
        method: ServiceTweak,
    ) -> Self {
        Self::new(
            id,
            title,
            description,
            category,
            severity,
            true,
            true,
            Arc::new(method),
        )
    }

    pub fn package_removal(
        id: &'static str,
        title: &'static str,
        description: &'static str,
        category: TweakCategory,
        severity: TweakSeverity,
        method: PackageRemovalTweak,
    ) -> Self {
        let admin_required = method.all_users || method.include_provisioned;
        Self::new(
            id,
            title,
            description,
            category,
            severity,
            admin_required,
            false,
            Arc::new(method),
        )
    }

    pub fn with_min_build(mut self, build: u32) -> Self {
        self.min_build = Some(build);
        self
    }

    /// Raw status of the backing state, without OS gating.
    pub fn status(&self, host: &Host) -> TweakStatus {
        self.method.status(self.id, host)
    }

    pub fn apply(&self, host: &Host) -> Result<(), Error> {
        self.method.apply(self.id, host)
    }

    pub fn revert(&self, host: &Host) -> Result<(), Error> {
        self.method.revert(self.id, host)
    }

    pub fn affected_services(&self) -> Vec<String> {
        self.method.affected_services()
    }

    pub fn describe(&self) -> Vec<String> {
        self.method.describe()
    }
}

/// Every built-in tweak, in catalog order.
pub fn all_tweaks(scope: BloatwareScope) -> Vec<Tweak> {
    vec![
        registry::disable_telemetry_policy(),
        registry::disable_advertising_id(),
        registry::disable_activity_history(),
        registry::disable_windows_spotlight(),
        registry::disable_consumer_features(),
        registry::disable_cloud_clipboard(),
        registry::disable_cortana(),
        registry::disable_one_drive(),
        registry::disable_game_dvr(),
        registry::disable_startup_delay(),
        registry::disable_search_indexing(),
        registry::disable_superfetch(),
        registry::disable_bing_search(),
        registry::show_file_extensions(),
        registry::classic_context_menu(),
        registry::disable_task_view_button(),
        registry::disable_widgets(),
        services::disable_diag_track(),
        registry::disable_delivery_optimization(),
        registry::disable_xbox_services(),
        registry::disable_copilot(),
        registry::disable_edge_web_app(),
        registry::disable_windows_update(),
        registry::disable_defender(),
        powershell::remove_bloatware_apps(scope),
    ]
}
