// src/tweaks/powershell/mod.rs

pub mod method;

use method::PackageRemovalTweak;

use super::{ids, Tweak, TweakCategory, TweakSeverity};
use crate::settings::BloatwareScope;

pub const THIRD_PARTY_WILDCARDS: &[&str] = &[
    "*TikTok*",
    "*Disney*",
    "*Spotify*",
    "*Facebook*",
    "*Instagram*",
    "*CandyCrush*",
    "*BubbleWitch*",
    "*Dropbox*",
    "*Booking*",
    "*Twitter*",
];

pub const MICROSOFT_WILDCARDS: &[&str] = &[
    "Microsoft.BingNews",
    "Microsoft.BingWeather",
    "Microsoft.GetHelp",
    "Microsoft.Getstarted",
    "Microsoft.MicrosoftSolitaireCollection",
    "Microsoft.People",
    "Microsoft.YourPhone",
    "Microsoft.ZuneMusic",
    "Microsoft.ZuneVideo",
    "Microsoft.Xbox*",
];

pub fn bloatware_wildcards(scope: BloatwareScope) -> Vec<&'static str> {
    match scope {
        BloatwareScope::ThirdPartyOnly => THIRD_PARTY_WILDCARDS.to_vec(),
        BloatwareScope::IncludeMicrosoftApps => THIRD_PARTY_WILDCARDS
            .iter()
            .chain(MICROSOFT_WILDCARDS)
            .copied()
            .collect(),
    }
}

pub fn remove_bloatware_apps(scope: BloatwareScope) -> Tweak {
    Tweak::package_removal(
        ids::REMOVE_BLOATWARE_APPS,
        "Remove Preinstalled Apps",
        "Removes preinstalled third-party apps, and optionally Microsoft inbox apps, for the current user via PowerShell.",
        TweakCategory::Bloatware,
        TweakSeverity::Dangerous,
        PackageRemovalTweak {
            wildcards: bloatware_wildcards(scope),
            // Per-user removal works without elevation.
            all_users: false,
            include_provisioned: false,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_controls_wildcards() {
        let third_party = bloatware_wildcards(BloatwareScope::ThirdPartyOnly);
        assert_eq!(third_party.len(), 10);
        assert!(!third_party.contains(&"Microsoft.Xbox*"));

        let everything = bloatware_wildcards(BloatwareScope::IncludeMicrosoftApps);
        assert_eq!(everything.len(), 20);
        assert_eq!(everything[0], "*TikTok*");
        assert_eq!(everything[19], "Microsoft.Xbox*");
    }

    #[test]
    fn test_removal_tweak_has_no_undo() {
        let tweak = remove_bloatware_apps(BloatwareScope::ThirdPartyOnly);
        assert!(!tweak.supports_undo);
        assert!(!tweak.admin_required);
    }
}
