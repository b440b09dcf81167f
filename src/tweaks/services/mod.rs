// src/tweaks/services/mod.rs

pub mod method;

use method::ServiceTweak;

use super::{ids, Tweak, TweakCategory, TweakSeverity};

pub fn disable_diag_track() -> Tweak {
    Tweak::service(
        ids::DISABLE_DIAG_TRACK,
        "Disable Diagnostics Tracking Service",
        "Stops and disables the Connected User Experiences and Telemetry service (DiagTrack), which collects and uploads diagnostic data in the background.",
        TweakCategory::Services,
        TweakSeverity::Dangerous,
        ServiceTweak {
            service: "DiagTrack",
        },
    )
}
