// src/audit.rs

use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};

use chrono::Local;
use strum_macros::Display;
use tracing::warn;

use crate::{
    constants::{SESSION_ENDED, SESSION_STARTED},
    errors::AuditError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AuditStatus {
    #[strum(serialize = "SUCCESS")]
    Success,
    #[strum(serialize = "FAILED")]
    Failed,
    #[strum(serialize = "CANCELLED")]
    Cancelled,
}

impl From<bool> for AuditStatus {
    fn from(success: bool) -> Self {
        if success {
            AuditStatus::Success
        } else {
            AuditStatus::Failed
        }
    }
}

/// Operation tag written in the third column of every line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AuditOperation {
    #[strum(serialize = "APPLY")]
    Apply,
    #[strum(serialize = "UNDO")]
    Undo,
    #[strum(serialize = "UNDO-SKIP")]
    UndoSkip,
    #[strum(serialize = "RESTORE-POINT")]
    RestorePoint,
    #[strum(serialize = "ADMIN-CHECK")]
    AdminCheck,
    #[strum(serialize = "SESSION")]
    Session,
    #[strum(serialize = "DRY-RUN")]
    DryRun,
    #[strum(serialize = "BATCH")]
    Batch,
}

/// Append-only, line-oriented operation log.
///
/// Every line reads `[YYYY-MM-DD HH:MM:SS] [STATUS] [TAG] details` in local time.
#[derive(Debug)]
pub struct AuditLogger {
    path: PathBuf,
    lock: Mutex<()>,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one entry. Line breaks in `details` become spaces so every
    /// entry stays on one line. Callers treat the error as instrumentation only.
    pub fn log_operation(
        &self,
        operation: AuditOperation,
        details: &str,
        status: AuditStatus,
    ) -> Result<(), AuditError> {
        let details = details.replace("\r\n", " ").replace(['\r', '\n'], " ");
        let line = format!(
            "[{}] [{}] [{}] {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            status,
            operation,
            details
        );

        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| AuditError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()))
            .map_err(|source| AuditError::Write {
                path: self.path.clone(),
                source,
            })
    }

    pub fn log_apply(&self, title: &str, id: &str, success: bool) -> Result<(), AuditError> {
        let details = if success {
            format!("Applied tweak: {} ({})", title, id)
        } else {
            format!("Failed to apply tweak: {} ({})", title, id)
        };
        self.log_operation(AuditOperation::Apply, &details, success.into())
    }

    pub fn log_undo(&self, title: &str, id: &str, success: bool) -> Result<(), AuditError> {
        let details = if success {
            format!("Undid tweak: {} ({})", title, id)
        } else {
            format!("Failed to undo tweak: {} ({})", title, id)
        };
        self.log_operation(AuditOperation::Undo, &details, success.into())
    }

    pub fn log_undo_skip(&self, title: &str) -> Result<(), AuditError> {
        self.log_operation(
            AuditOperation::UndoSkip,
            &format!("{} does not support undo", title),
            AuditStatus::Success,
        )
    }

    pub fn log_restore_point(&self, description: &str, status: AuditStatus) -> Result<(), AuditError> {
        let details = match status {
            AuditStatus::Success => format!("Created restore point: {}", description),
            AuditStatus::Failed => format!("Failed to create restore point: {}", description),
            AuditStatus::Cancelled => format!("Cancelled restore point: {}", description),
        };
        self.log_operation(AuditOperation::RestorePoint, &details, status)
    }

    /// Logged as success when the privilege level matches what is required.
    pub fn log_admin_check(
        &self,
        operation: &str,
        admin_required: bool,
        has_admin: bool,
    ) -> Result<(), AuditError> {
        self.log_operation(
            AuditOperation::AdminCheck,
            &format!(
                "{} - Admin required: {}, Has admin: {}",
                operation, admin_required, has_admin
            ),
            (admin_required == has_admin).into(),
        )
    }

    pub fn log_session_start(&self) -> Result<(), AuditError> {
        self.log_operation(AuditOperation::Session, SESSION_STARTED, AuditStatus::Success)
    }

    pub fn log_session_end(&self) -> Result<(), AuditError> {
        self.log_operation(AuditOperation::Session, SESSION_ENDED, AuditStatus::Success)
    }

    pub fn log_dry_run(&self, title: &str, id: &str, changes: &[String]) -> Result<(), AuditError> {
        self.log_operation(
            AuditOperation::DryRun,
            &format!("Dry-run for {} ({}): {}", title, id, changes.join("; ")),
            AuditStatus::Success,
        )
    }

    /// Whole log as text, or a notice when nothing has been logged yet.
    pub fn export(&self) -> String {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        std::fs::read_to_string(&self.path).unwrap_or_else(|_| "No log file found.".to_string())
    }

    /// Deletes the log file. Failures are logged and ignored.
    pub fn clear(&self) {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to clear audit log {:?}: {}", self.path, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use tempfile::TempDir;

    use super::*;

    fn logger(dir: &TempDir) -> AuditLogger {
        AuditLogger::new(dir.path().join("logs").join("debloater.log"))
    }

    fn lines(logger: &AuditLogger) -> Vec<String> {
        logger.export().lines().map(str::to_string).collect()
    }

    #[test]
    fn test_line_format() {
        let dir = TempDir::new().unwrap();
        let logger = logger(&dir);
        logger
            .log_apply("Disable Cortana", "privacy.disableCortana", true)
            .unwrap();

        let lines = lines(&logger);
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        // [2024-01-31 12:34:56] is 21 characters wide.
        assert_eq!(&line[0..1], "[");
        assert_eq!(&line[20..21], "]");
        assert_eq!(
            &line[22..],
            "[SUCCESS] [APPLY] Applied tweak: Disable Cortana (privacy.disableCortana)"
        );
    }

    #[test]
    fn test_line_breaks_in_details_stay_on_one_line() {
        let dir = TempDir::new().unwrap();
        let logger = logger(&dir);
        logger
            .log_restore_point("Before\r\ndebloat\nrun", AuditStatus::Success)
            .unwrap();
        logger.log_session_end().unwrap();

        let lines = lines(&logger);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[SUCCESS] [RESTORE-POINT] Created restore point: Before debloat run"));
    }

    #[test]
    fn test_tags_and_statuses() {
        assert_eq!(AuditOperation::UndoSkip.to_string(), "UNDO-SKIP");
        assert_eq!(AuditOperation::RestorePoint.to_string(), "RESTORE-POINT");
        assert_eq!(AuditOperation::AdminCheck.to_string(), "ADMIN-CHECK");
        assert_eq!(AuditOperation::DryRun.to_string(), "DRY-RUN");
        assert_eq!(AuditStatus::Cancelled.to_string(), "CANCELLED");
    }

    #[test]
    fn test_admin_check_success_iff_matching() {
        let dir = TempDir::new().unwrap();
        let logger = logger(&dir);
        logger.log_admin_check("Apply", true, false).unwrap();
        logger.log_admin_check("Apply", false, false).unwrap();

        let lines = lines(&logger);
        assert!(lines[0].ends_with("[FAILED] [ADMIN-CHECK] Apply - Admin required: true, Has admin: false"));
        assert!(lines[1].contains("[SUCCESS] [ADMIN-CHECK]"));
    }

    #[test]
    fn test_concurrent_appends_keep_whole_lines() {
        let dir = TempDir::new().unwrap();
        let logger = Arc::new(logger(&dir));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let logger = Arc::clone(&logger);
                thread::spawn(move || {
                    for i in 0..25 {
                        logger
                            .log_operation(AuditOperation::Batch, &format!("thread {} entry {}", t, i), AuditStatus::Success)
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let lines = lines(&logger);
        assert_eq!(lines.len(), 200);
        assert!(lines.iter().all(|l| l.contains("[SUCCESS] [BATCH] thread ")));
    }

    #[test]
    fn test_export_and_clear_without_file() {
        let dir = TempDir::new().unwrap();
        let logger = logger(&dir);
        assert_eq!(logger.export(), "No log file found.");
        logger.clear();

        logger.log_session_start().unwrap();
        logger.log_session_end().unwrap();
        assert!(logger.export().contains("=== Debloater Session Ended ==="));
        logger.clear();
        assert_eq!(logger.export(), "No log file found.");
    }

    #[test]
    fn test_unwritable_location_reports_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a directory").unwrap();
        let logger = AuditLogger::new(blocker.join("debloater.log"));

        assert!(logger.log_session_start().is_err());
    }
}
