// src/utils/powershell.rs

use std::{
    process::{Child, Command, Stdio},
    thread,
};

use tracing::{debug, warn};

use crate::{constants::SCRIPT_POLL_INTERVAL, errors::ScriptError, progress::CancellationToken};

/// Runs script text in an external scripting host. The exit code is the only
/// result: zero succeeds, anything else fails.
pub trait ScriptHost: Send + Sync {
    fn run(&self, script: &str, cancel: &CancellationToken) -> Result<(), ScriptError>;
}

/// Escapes a value for interpolation into a single-quoted PowerShell string.
pub fn escape_single_quoted(value: &str) -> String {
    value.replace('\'', "''")
}

/// Runs scripts through `powershell.exe` with no console window.
#[derive(Debug, Clone)]
pub struct PowerShellHost {
    program: String,
}

impl Default for PowerShellHost {
    fn default() -> Self {
        Self {
            program: "powershell".to_string(),
        }
    }
}

impl PowerShellHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn command(&self, script: &str) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args([
                "-NoProfile",
                "-NonInteractive",
                "-ExecutionPolicy",
                "Bypass",
                "-Command",
                script,
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            command.creation_flags(crate::constants::CREATE_NO_WINDOW);
        }

        command
    }
}

/// Polls `child` until it exits, killing it if `cancel` fires first.
fn wait_for_exit(mut child: Child, cancel: &CancellationToken) -> Result<(), ScriptError> {
    loop {
        if let Some(status) = child.try_wait().map_err(ScriptError::Wait)? {
            return if status.success() {
                Ok(())
            } else {
                Err(ScriptError::NonZeroExit(status.code()))
            };
        }

        if cancel.is_cancelled() {
            if let Err(e) = child.kill() {
                warn!("Failed to kill cancelled script host: {}", e);
            }
            let _ = child.wait();
            return Err(ScriptError::Cancelled);
        }

        thread::sleep(SCRIPT_POLL_INTERVAL);
    }
}

impl ScriptHost for PowerShellHost {
    fn run(&self, script: &str, cancel: &CancellationToken) -> Result<(), ScriptError> {
        if cancel.is_cancelled() {
            return Err(ScriptError::Cancelled);
        }
        debug!("Running script: {}", script);
        let child = self.command(script).spawn().map_err(ScriptError::Launch)?;
        wait_for_exit(child, cancel)
    }
}
