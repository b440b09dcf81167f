// src/catalog.rs

use indexmap::IndexMap;
use tracing::debug;

use crate::{
    errors::CatalogError,
    settings::BloatwareScope,
    tweaks::{all_tweaks, ids, Tweak, TweakCategory},
};

/// Named, curated selection of tweak ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub tweak_ids: Vec<&'static str>,
}

pub fn default_profiles() -> Vec<Profile> {
    vec![
        Profile {
            id: "recommended",
            title: "Recommended",
            description: "Safe privacy + quality-of-life tweaks.",
            tweak_ids: vec![
                ids::DISABLE_ADVERTISING_ID,
                ids::DISABLE_ACTIVITY_HISTORY,
                ids::DISABLE_GAME_DVR,
                ids::DISABLE_BING_SEARCH,
                ids::SHOW_FILE_EXTENSIONS,
                ids::DISABLE_WINDOWS_SPOTLIGHT,
                ids::DISABLE_CONSUMER_FEATURES,
                ids::DISABLE_STARTUP_DELAY,
                ids::DISABLE_TASK_VIEW_BUTTON,
                ids::DISABLE_COPILOT,
                ids::DISABLE_DELIVERY_OPTIMIZATION,
            ],
        },
        Profile {
            id: "privacy",
            title: "Privacy Focused",
            description: "Maximum privacy with telemetry and cloud features disabled.",
            tweak_ids: vec![
                ids::DISABLE_TELEMETRY_POLICY,
                ids::DISABLE_ADVERTISING_ID,
                ids::DISABLE_ACTIVITY_HISTORY,
                ids::DISABLE_BING_SEARCH,
                ids::DISABLE_WINDOWS_SPOTLIGHT,
                ids::DISABLE_CONSUMER_FEATURES,
                ids::DISABLE_CLOUD_CLIPBOARD,
                ids::DISABLE_CORTANA,
                ids::DISABLE_ONE_DRIVE,
                ids::DISABLE_COPILOT,
                ids::DISABLE_EDGE_WEB_APP,
                ids::DISABLE_DELIVERY_OPTIMIZATION,
            ],
        },
        Profile {
            id: "performance",
            title: "Performance Focused",
            description: "Disables background services and indexing for maximum performance.",
            tweak_ids: vec![
                ids::DISABLE_GAME_DVR,
                ids::DISABLE_DIAG_TRACK,
                ids::DISABLE_STARTUP_DELAY,
                ids::DISABLE_SEARCH_INDEXING,
                ids::DISABLE_SUPERFETCH,
                ids::DISABLE_DELIVERY_OPTIMIZATION,
                ids::DISABLE_XBOX_SERVICES,
            ],
        },
    ]
}

/// Tweaks and profiles keyed by lowercase id, in definition order.
#[derive(Debug, Clone)]
pub struct Catalog {
    tweaks: IndexMap<String, Tweak>,
    profiles: IndexMap<String, Profile>,
}

impl Catalog {
    pub fn new(tweaks: Vec<Tweak>, profiles: Vec<Profile>) -> Result<Self, CatalogError> {
        let mut tweak_map = IndexMap::with_capacity(tweaks.len());
        for tweak in tweaks {
            let key = tweak.id.to_lowercase();
            if tweak_map.contains_key(&key) {
                return Err(CatalogError::DuplicateId(tweak.id.to_string()));
            }
            tweak_map.insert(key, tweak);
        }

        let mut profile_map = IndexMap::with_capacity(profiles.len());
        for profile in profiles {
            let key = profile.id.to_lowercase();
            if profile_map.contains_key(&key) {
                return Err(CatalogError::DuplicateProfile(profile.id.to_string()));
            }
            for id in &profile.tweak_ids {
                if !tweak_map.contains_key(&id.to_lowercase()) {
                    debug!("Profile '{}' references unknown tweak '{}'", profile.id, id);
                }
            }
            profile_map.insert(key, profile);
        }

        Ok(Self {
            tweaks: tweak_map,
            profiles: profile_map,
        })
    }

    /// The built-in tweaks and profiles.
    pub fn with_defaults(scope: BloatwareScope) -> Result<Self, CatalogError> {
        Self::new(all_tweaks(scope), default_profiles())
    }

    pub fn get(&self, id: &str) -> Option<&Tweak> {
        self.tweaks.get(&id.to_lowercase())
    }

    pub fn tweaks(&self) -> impl Iterator<Item = &Tweak> {
        self.tweaks.values()
    }

    pub fn by_category(&self, category: TweakCategory) -> impl Iterator<Item = &Tweak> {
        self.tweaks().filter(move |t| t.category == category)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    pub fn profile(&self, id: &str) -> Option<&Profile> {
        self.profiles.get(&id.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.tweaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tweaks.is_empty()
    }
}
