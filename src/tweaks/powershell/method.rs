// src/tweaks/powershell/method.rs

use anyhow::Result;
use tracing::{error, info};

use crate::{
    host::Host,
    progress::CancellationToken,
    tweaks::{TweakMethod, TweakStatus},
    utils::powershell::escape_single_quoted,
};

/// Removes app packages matching a set of wildcards through PowerShell.
/// Removal cannot be undone and its status is never read.
#[derive(Debug, Clone)]
pub struct PackageRemovalTweak {
    pub wildcards: Vec<&'static str>,
    /// Remove the packages for every user instead of the current one.
    pub all_users: bool,
    /// Also remove the provisioned copies so new accounts don't get them.
    pub include_provisioned: bool,
}

impl PackageRemovalTweak {
    /// Non-blank wildcards, first occurrence wins, compared case-insensitively.
    fn unique_wildcards(&self) -> Vec<&'static str> {
        let mut seen: Vec<String> = Vec::new();
        self.wildcards
            .iter()
            .copied()
            .filter(|w| !w.trim().is_empty())
            .filter(|w| {
                let lowered = w.to_lowercase();
                if seen.contains(&lowered) {
                    false
                } else {
                    seen.push(lowered);
                    true
                }
            })
            .collect()
    }

    pub fn removal_script(&self, wildcard: &str) -> String {
        let all_users = if self.all_users { " -AllUsers" } else { "" };
        format!(
            "Get-AppxPackage{} -Name '{}' | Remove-AppxPackage -ErrorAction SilentlyContinue",
            all_users,
            escape_single_quoted(wildcard)
        )
    }

    pub fn provisioned_removal_script(&self, wildcard: &str) -> String {
        format!(
            "Get-AppxProvisionedPackage -Online | Where-Object {{$_.DisplayName -like '{}'}} | Remove-AppxProvisionedPackage -Online -ErrorAction SilentlyContinue",
            escape_single_quoted(wildcard)
        )
    }

    fn scripts(&self) -> Vec<(&'static str, String)> {
        let wildcards = self.unique_wildcards();
        let mut scripts: Vec<(&'static str, String)> = wildcards
            .iter()
            .map(|w| (*w, self.removal_script(w)))
            .collect();
        if self.include_provisioned {
            scripts.extend(wildcards.iter().map(|w| (*w, self.provisioned_removal_script(w))));
        }
        scripts
    }
}

impl TweakMethod for PackageRemovalTweak {
    fn status(&self, _id: &str, _host: &Host) -> TweakStatus {
        TweakStatus::Unknown
    }

    fn apply(&self, id: &str, host: &Host) -> Result<()> {
        // A removal in progress always runs to completion; batches only stop between tweaks.
        let never = CancellationToken::new();
        let mut failed: Vec<&str> = Vec::new();

        for (wildcard, script) in self.scripts() {
            info!("{} -> Removing packages matching '{}'.", id, wildcard);
            if let Err(e) = host.scripts.run(&script, &never) {
                error!("{} -> Removal of '{}' failed: {}", id, wildcard, e);
                if !failed.contains(&wildcard) {
                    failed.push(wildcard);
                }
            }
        }

        if !failed.is_empty() {
            anyhow::bail!("Failed to remove packages matching: {}", failed.join(", "));
        }
        Ok(())
    }

    fn revert(&self, id: &str, _host: &Host) -> Result<()> {
        anyhow::bail!("{} -> Package removal cannot be undone", id)
    }

    fn describe(&self) -> Vec<String> {
        self.scripts()
            .into_iter()
            .map(|(_, script)| format!("Run: {}", script))
            .collect()
    }
}
