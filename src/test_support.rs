// src/test_support.rs

use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::{
    errors::ScriptError,
    host::Host,
    progress::{CancellationToken, ProgressSink},
    tweaks::{Tweak, TweakCategory, TweakMethod, TweakSeverity, TweakStatus},
    utils::{
        powershell::ScriptHost,
        registry::{MemoryRegistry, RegistryKeyValue, RegistryStore},
        services::MemoryServices,
    },
};

/// Script host that records every script and fails the ones matching a pattern.
#[derive(Default)]
pub struct RecordingScripts {
    scripts: Mutex<Vec<String>>,
    fail_patterns: Mutex<Vec<String>>,
    cancel_during_run: Mutex<Option<CancellationToken>>,
}

impl RecordingScripts {
    pub fn scripts(&self) -> Vec<String> {
        self.scripts.lock().unwrap().clone()
    }

    pub fn fail_when_contains(&self, pattern: &str) {
        self.fail_patterns.lock().unwrap().push(pattern.to_string());
    }

    /// Fires `token` while the next script runs, as a user pressing Ctrl-C would.
    pub fn cancel_while_running(&self, token: CancellationToken) {
        *self.cancel_during_run.lock().unwrap() = Some(token);
    }
}

impl ScriptHost for RecordingScripts {
    fn run(&self, script: &str, cancel: &CancellationToken) -> Result<(), ScriptError> {
        self.scripts.lock().unwrap().push(script.to_string());
        if let Some(token) = self.cancel_during_run.lock().unwrap().take() {
            token.cancel();
        }
        if cancel.is_cancelled() {
            return Err(ScriptError::Cancelled);
        }
        if self
            .fail_patterns
            .lock()
            .unwrap()
            .iter()
            .any(|p| script.contains(p.as_str()))
        {
            return Err(ScriptError::NonZeroExit(Some(1)));
        }
        Ok(())
    }
}

pub fn memory_host() -> (Host, Arc<RecordingScripts>) {
    memory_host_with_services(MemoryServices::new())
}

pub fn memory_host_with_services(services: MemoryServices) -> (Host, Arc<RecordingScripts>) {
    let scripts = Arc::new(RecordingScripts::default());
    let host = Host::new(
        Arc::new(MemoryRegistry::new()),
        Arc::new(services),
        scripts.clone(),
    );
    (host, scripts)
}

/// In-memory registry that fails writes to one value name, or every read.
pub struct FailingRegistry {
    inner: MemoryRegistry,
    fail_write_key: Option<String>,
    fail_reads: bool,
}

impl FailingRegistry {
    pub fn new(fail_write_key: &str) -> Self {
        Self {
            inner: MemoryRegistry::new(),
            fail_write_key: Some(fail_write_key.to_lowercase()),
            fail_reads: false,
        }
    }

    pub fn unreadable() -> Self {
        Self {
            inner: MemoryRegistry::new(),
            fail_write_key: None,
            fail_reads: true,
        }
    }
}

impl RegistryStore for FailingRegistry {
    fn read_value(&self, path: &str, key_name: &str) -> Result<Option<RegistryKeyValue>> {
        if self.fail_reads {
            anyhow::bail!("Access is denied");
        }
        self.inner.read_value(path, key_name)
    }

    fn write_value(&self, path: &str, key_name: &str, value: &RegistryKeyValue) -> Result<()> {
        if self.fail_write_key.as_deref() == Some(key_name.to_lowercase().as_str()) {
            anyhow::bail!("Access is denied");
        }
        self.inner.write_value(path, key_name, value)
    }

    fn delete_value(&self, path: &str, key_name: &str) -> Result<()> {
        self.inner.delete_value(path, key_name)
    }

    fn key_exists(&self, path: &str) -> Result<bool> {
        if self.fail_reads {
            anyhow::bail!("Access is denied");
        }
        self.inner.key_exists(path)
    }

    fn delete_key(&self, path: &str) -> Result<()> {
        self.inner.delete_key(path)
    }
}

/// Counts calls and optionally fails or fires a cancellation token.
#[derive(Default)]
pub struct ScriptedMethod {
    pub applied: Mutex<u32>,
    pub reverted: Mutex<u32>,
    pub fail: bool,
    pub cancel_on_apply: Option<CancellationToken>,
    pub cancel_on_revert: Option<CancellationToken>,
    pub services: Vec<String>,
}

impl TweakMethod for ScriptedMethod {
    fn status(&self, _id: &str, _host: &Host) -> TweakStatus {
        if *self.applied.lock().unwrap() > *self.reverted.lock().unwrap() {
            TweakStatus::Applied
        } else {
            TweakStatus::NotApplied
        }
    }

    fn apply(&self, id: &str, _host: &Host) -> Result<()> {
        if let Some(token) = &self.cancel_on_apply {
            token.cancel();
        }
        if self.fail {
            anyhow::bail!("{} exploded", id);
        }
        *self.applied.lock().unwrap() += 1;
        Ok(())
    }

    fn revert(&self, id: &str, _host: &Host) -> Result<()> {
        if let Some(token) = &self.cancel_on_revert {
            token.cancel();
        }
        if self.fail {
            anyhow::bail!("{} exploded", id);
        }
        *self.reverted.lock().unwrap() += 1;
        Ok(())
    }

    fn affected_services(&self) -> Vec<String> {
        self.services.clone()
    }

    fn describe(&self) -> Vec<String> {
        vec![format!("Poke {}", self.services.join(","))]
    }
}

pub fn scripted_tweak(id: &'static str, method: Arc<ScriptedMethod>) -> Tweak {
    Tweak::new(
        id,
        id,
        "Test tweak",
        TweakCategory::Privacy,
        TweakSeverity::Safe,
        false,
        true,
        method,
    )
}

/// Collects progress lines for later assertions.
#[derive(Default)]
pub struct RecordingProgress {
    lines: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn report(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }
}
