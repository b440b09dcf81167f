// src/engine.rs

use std::{collections::HashSet, sync::Arc};

use tracing::{debug, error, info, warn};

use crate::{
    audit::{AuditLogger, AuditOperation, AuditStatus},
    catalog::Catalog,
    errors::{AuditError, EngineError, ScriptError},
    host::Host,
    os_guard::OsGuard,
    progress::{CancellationToken, ProgressSink},
    tweaks::{Tweak, TweakStatus},
    utils::powershell::escape_single_quoted,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TweakOutcome {
    Applied,
    Reverted,
    /// Undo requested for a tweak that cannot be undone.
    Skipped,
    Failed(String),
}

/// Per-tweak result of one batch, plus the number of audit or snapshot writes
/// that failed and were swallowed along the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub outcomes: Vec<(String, TweakOutcome)>,
    pub instrumentation_failures: usize,
}

impl BatchReport {
    pub fn outcome(&self, id: &str) -> Option<&TweakOutcome> {
        self.outcomes
            .iter()
            .find(|(tweak_id, _)| tweak_id.eq_ignore_ascii_case(id))
            .map(|(_, outcome)| outcome)
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, TweakOutcome::Applied | TweakOutcome::Reverted))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| *o == TweakOutcome::Skipped)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, TweakOutcome::Failed(_)))
            .count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchKind {
    Apply,
    Undo,
}

impl BatchKind {
    fn name(self) -> &'static str {
        match self {
            BatchKind::Apply => "Apply",
            BatchKind::Undo => "Undo",
        }
    }
}

/// Runs batches of tweaks against one host, sequentially, isolating
/// per-tweak failures.
#[derive(Debug)]
pub struct Engine {
    catalog: Catalog,
    host: Host,
    audit: Option<Arc<AuditLogger>>,
}

impl Engine {
    pub fn new(catalog: Catalog, host: Host) -> Self {
        Self {
            catalog,
            host,
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn audit(&self) -> Option<&Arc<AuditLogger>> {
        self.audit.as_ref()
    }

    pub fn os_guard(&self) -> OsGuard {
        OsGuard::new(self.host.registry.clone())
    }

    /// True if any known tweak in `ids` needs elevation. Unknown ids are ignored.
    pub fn requires_admin<S: AsRef<str>>(&self, ids: &[S]) -> bool {
        ids.iter()
            .filter_map(|id| self.catalog.get(id.as_ref()))
            .any(|tweak| tweak.admin_required)
    }

    pub fn create_restore_point(
        &self,
        description: &str,
        cancel: &CancellationToken,
    ) -> Result<(), ScriptError> {
        let script = format!(
            "Checkpoint-Computer -Description '{}' -RestorePointType 'MODIFY_SETTINGS'",
            escape_single_quoted(description)
        );
        info!("Creating restore point '{}'", description);
        self.host.scripts.run(&script, cancel)
    }

    /// Status of one tweak, `NotSupported` when the OS build is too old.
    pub fn status(&self, id: &str) -> Option<TweakStatus> {
        let tweak = self.catalog.get(id)?;
        Some(self.gated_status(&self.os_guard(), tweak))
    }

    /// Status of every tweak in catalog order.
    pub fn statuses(&self) -> Vec<(&Tweak, TweakStatus)> {
        let guard = self.os_guard();
        self.catalog
            .tweaks()
            .map(|tweak| (tweak, self.gated_status(&guard, tweak)))
            .collect()
    }

    fn gated_status(&self, guard: &OsGuard, tweak: &Tweak) -> TweakStatus {
        if !guard.supports(tweak) {
            return TweakStatus::NotSupported;
        }
        tweak.status(&self.host)
    }

    pub fn apply<S: AsRef<str>>(
        &self,
        ids: &[S],
        create_restore_point: bool,
        description: &str,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, EngineError> {
        let tweaks = self.resolve(ids);
        let mut report = BatchReport::default();

        if create_restore_point {
            progress.report("Creating restore point...");
            match self.create_restore_point(description, cancel) {
                Ok(()) => {
                    let logged = self.audit_with(|a| a.log_restore_point(description, AuditStatus::Success));
                    self.note(&mut report, logged);
                }
                Err(ScriptError::Cancelled) => {
                    warn!("Restore point creation cancelled");
                    let logged = self.audit_with(|a| a.log_restore_point(description, AuditStatus::Cancelled));
                    self.note(&mut report, logged);
                    return Err(self.cancelled(BatchKind::Apply, report, tweaks.len(), progress));
                }
                Err(e) => {
                    error!("Failed to create restore point: {}", e);
                    progress.report(&format!("Failed to create restore point: {}", e));
                    let logged = self.audit_with(|a| a.log_restore_point(description, AuditStatus::Failed));
                    self.note(&mut report, logged);
                    let logged = self.audit_with(|a| {
                        a.log_operation(
                            AuditOperation::Batch,
                            &format!("Apply aborted: failed to create restore point: {}", e),
                            AuditStatus::Failed,
                        )
                    });
                    self.note(&mut report, logged);
                    return Err(EngineError::RestorePoint(e));
                }
            }
        }

        for tweak in &tweaks {
            if cancel.is_cancelled() {
                return Err(self.cancelled(BatchKind::Apply, report, tweaks.len(), progress));
            }

            self.snapshot_services(tweak, &mut report);

            progress.report(&format!("Applying: {}", tweak.title));
            info!("{} -> Applying", tweak.id);
            let outcome = match tweak.apply(&self.host) {
                Ok(()) => TweakOutcome::Applied,
                Err(e) => {
                    let message = format!("{:#}", e);
                    error!("{} -> Failed to apply: {}", tweak.id, message);
                    progress.report(&format!("Error applying {}: {}", tweak.title, message));
                    TweakOutcome::Failed(message)
                }
            };

            let success = outcome == TweakOutcome::Applied;
            let logged = self.audit_with(|a| a.log_apply(tweak.title, tweak.id, success));
            self.note(&mut report, logged);
            report.outcomes.push((tweak.id.to_string(), outcome));
        }

        self.finish(BatchKind::Apply, &mut report, progress);
        Ok(report)
    }

    pub fn undo<S: AsRef<str>>(
        &self,
        ids: &[S],
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, EngineError> {
        let tweaks = self.resolve(ids);
        let mut report = BatchReport::default();

        for tweak in &tweaks {
            if cancel.is_cancelled() {
                return Err(self.cancelled(BatchKind::Undo, report, tweaks.len(), progress));
            }

            if !tweak.supports_undo {
                progress.report(&format!("Skipping (no undo): {}", tweak.title));
                debug!("{} -> Undo not supported, skipping", tweak.id);
                let logged = self.audit_with(|a| a.log_undo_skip(tweak.title));
                self.note(&mut report, logged);
                report.outcomes.push((tweak.id.to_string(), TweakOutcome::Skipped));
                continue;
            }

            progress.report(&format!("Undoing: {}", tweak.title));
            info!("{} -> Undoing", tweak.id);
            let outcome = match tweak.revert(&self.host) {
                Ok(()) => TweakOutcome::Reverted,
                Err(e) => {
                    let message = format!("{:#}", e);
                    error!("{} -> Failed to undo: {}", tweak.id, message);
                    progress.report(&format!("Error undoing {}: {}", tweak.title, message));
                    TweakOutcome::Failed(message)
                }
            };

            let success = outcome == TweakOutcome::Reverted;
            let logged = self.audit_with(|a| a.log_undo(tweak.title, tweak.id, success));
            self.note(&mut report, logged);
            report.outcomes.push((tweak.id.to_string(), outcome));
        }

        self.finish(BatchKind::Undo, &mut report, progress);
        Ok(report)
    }

    /// Reports what `apply` would change, touching nothing but the audit log.
    pub fn dry_run<S: AsRef<str>>(
        &self,
        ids: &[S],
        progress: &dyn ProgressSink,
    ) -> Vec<(&'static str, Vec<String>)> {
        self.resolve(ids)
            .into_iter()
            .map(|tweak| {
                let changes = tweak.describe();
                progress.report(&format!("Would apply: {}", tweak.title));
                for change in &changes {
                    progress.report(&format!("  {}", change));
                }
                if let Some(Err(e)) = self.audit_with(|a| a.log_dry_run(tweak.title, tweak.id, &changes)) {
                    warn!("Failed to write audit entry: {}", e);
                }
                (tweak.id, changes)
            })
            .collect()
    }

    /// Known tweaks for `ids`, first occurrence wins, caller order kept.
    fn resolve<S: AsRef<str>>(&self, ids: &[S]) -> Vec<&Tweak> {
        let mut seen = HashSet::new();
        ids.iter()
            .map(|id| id.as_ref())
            .filter(|id| seen.insert(id.to_lowercase()))
            .filter_map(|id| {
                let tweak = self.catalog.get(id);
                if tweak.is_none() {
                    debug!("Skipping unknown tweak id '{}'", id);
                }
                tweak
            })
            .collect()
    }

    fn snapshot_services(&self, tweak: &Tweak, report: &mut BatchReport) {
        let Some(snapshots) = &self.host.snapshots else {
            return;
        };
        let services = tweak.affected_services();
        if services.is_empty() {
            return;
        }
        if let Err(e) = snapshots.create_snapshot(&services) {
            warn!("{} -> Failed to snapshot services: {}", tweak.id, e);
            report.instrumentation_failures += 1;
        }
    }

    fn audit_with<F>(&self, write: F) -> Option<Result<(), AuditError>>
    where
        F: FnOnce(&AuditLogger) -> Result<(), AuditError>,
    {
        self.audit.as_deref().map(write)
    }

    fn note(&self, report: &mut BatchReport, logged: Option<Result<(), AuditError>>) {
        if let Some(Err(e)) = logged {
            warn!("Failed to write audit entry: {}", e);
            report.instrumentation_failures += 1;
        }
    }

    fn cancelled(
        &self,
        kind: BatchKind,
        mut report: BatchReport,
        total: usize,
        progress: &dyn ProgressSink,
    ) -> EngineError {
        let details = format!(
            "{} cancelled after {} of {} tweak(s)",
            kind.name(),
            report.outcomes.len(),
            total
        );
        warn!("{}", details);
        progress.report("Operation cancelled");
        let logged = self.audit_with(|a| {
            a.log_operation(AuditOperation::Batch, &details, AuditStatus::Cancelled)
        });
        self.note(&mut report, logged);
        EngineError::Cancelled(report)
    }

    fn finish(&self, kind: BatchKind, report: &mut BatchReport, progress: &dyn ProgressSink) {
        let summary = match kind {
            BatchKind::Apply => format!(
                "Apply completed: {} applied, {} failed",
                report.succeeded(),
                report.failed()
            ),
            BatchKind::Undo => format!(
                "Undo completed: {} undone, {} skipped, {} failed",
                report.succeeded(),
                report.skipped(),
                report.failed()
            ),
        };
        info!("{}", summary);
        progress.report(&summary);
        let status = AuditStatus::from(!report.has_failures());
        let logged = self.audit_with(|a| a.log_operation(AuditOperation::Batch, &summary, status));
        self.note(report, logged);
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::{
        progress::NoProgress,
        snapshot::SnapshotManager,
        test_support::{
            memory_host, memory_host_with_services, scripted_tweak, RecordingProgress,
            ScriptedMethod,
        },
        tweaks::{
            registry::{disable_copilot, disable_cortana},
            services::disable_diag_track,
        },
        utils::{
            registry::{RegistryKeyValue, RegistryStore},
            services::{MemoryServices, ServiceManager, StartType},
        },
    };

    struct Fixture {
        _dir: TempDir,
        engine: Engine,
        audit: Arc<AuditLogger>,
    }

    impl Fixture {
        fn new(tweaks: Vec<Tweak>, host: Host) -> Self {
            let dir = TempDir::new().unwrap();
            let audit = Arc::new(AuditLogger::new(dir.path().join("logs").join("debloater.log")));
            let catalog = Catalog::new(tweaks, Vec::new()).unwrap();
            let engine = Engine::new(catalog, host).with_audit(audit.clone());
            Self {
                _dir: dir,
                engine,
                audit,
            }
        }

        fn lines_tagged(&self, tag: &str) -> Vec<String> {
            self.audit
                .export()
                .lines()
                .filter(|l| l.contains(tag))
                .map(str::to_string)
                .collect()
        }
    }

    fn method() -> Arc<ScriptedMethod> {
        Arc::new(ScriptedMethod::default())
    }

    fn failing_method() -> Arc<ScriptedMethod> {
        Arc::new(ScriptedMethod {
            fail: true,
            ..Default::default()
        })
    }

    fn applied(m: &ScriptedMethod) -> u32 {
        *m.applied.lock().unwrap()
    }

    fn reverted(m: &ScriptedMethod) -> u32 {
        *m.reverted.lock().unwrap()
    }

    #[test]
    fn test_failure_is_isolated_to_one_tweak() {
        let (a, b, c) = (method(), failing_method(), method());
        let (host, _) = memory_host();
        let fixture = Fixture::new(
            vec![
                scripted_tweak("t.a", a.clone()),
                scripted_tweak("t.b", b.clone()),
                scripted_tweak("t.c", c.clone()),
            ],
            host,
        );
        let progress = RecordingProgress::default();

        let report = fixture
            .engine
            .apply(&["t.a", "t.b", "t.c"], false, "", &progress, &CancellationToken::new())
            .unwrap();

        assert_eq!(applied(&a), 1);
        assert_eq!(applied(&c), 1);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert!(matches!(report.outcome("t.b"), Some(TweakOutcome::Failed(m)) if m.contains("exploded")));
        assert_eq!(report.instrumentation_failures, 0);

        let entries = fixture.lines_tagged("[APPLY]");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries.iter().filter(|l| l.contains("[FAILED]")).count(), 1);
        assert_eq!(entries.iter().filter(|l| l.contains("[SUCCESS]")).count(), 2);
        assert!(fixture.lines_tagged("[BATCH]")[0].contains("[FAILED]"));

        let lines = progress.lines();
        assert!(lines.contains(&"Error applying t.b: t.b exploded".to_string()));
        assert_eq!(lines.last().unwrap(), "Apply completed: 2 applied, 1 failed");
    }

    #[test]
    fn test_undo_skips_tweaks_without_undo() {
        let (no_undo, with_undo) = (method(), method());
        let mut removal = scripted_tweak("t.removal", no_undo.clone());
        removal.supports_undo = false;
        let (host, _) = memory_host();
        let fixture = Fixture::new(vec![removal, scripted_tweak("t.reg", with_undo.clone())], host);

        let report = fixture
            .engine
            .undo(&["t.removal", "t.reg"], &NoProgress, &CancellationToken::new())
            .unwrap();

        assert_eq!(reverted(&no_undo), 0);
        assert_eq!(reverted(&with_undo), 1);
        assert_eq!(report.outcome("t.removal"), Some(&TweakOutcome::Skipped));
        assert_eq!(report.outcome("t.reg"), Some(&TweakOutcome::Reverted));
        assert_eq!(fixture.lines_tagged("[UNDO-SKIP]").len(), 1);
        let undo = fixture.lines_tagged("[UNDO]");
        assert_eq!(undo.len(), 1);
        assert!(undo[0].contains("[SUCCESS]"));
    }

    #[test]
    fn test_cancellation_between_tweaks() {
        let token = CancellationToken::new();
        let first = Arc::new(ScriptedMethod {
            cancel_on_apply: Some(token.clone()),
            ..Default::default()
        });
        let (second, third) = (method(), method());
        let (host, _) = memory_host();
        let fixture = Fixture::new(
            vec![
                scripted_tweak("t.1", first.clone()),
                scripted_tweak("t.2", second.clone()),
                scripted_tweak("t.3", third.clone()),
            ],
            host,
        );

        let result = fixture
            .engine
            .apply(&["t.1", "t.2", "t.3"], false, "", &NoProgress, &token);

        let Err(EngineError::Cancelled(report)) = result else {
            panic!("expected the batch to be cancelled");
        };
        assert_eq!(applied(&first), 1);
        assert_eq!(applied(&second), 0);
        assert_eq!(applied(&third), 0);
        assert_eq!(report.outcomes, vec![("t.1".to_string(), TweakOutcome::Applied)]);
        let batch = fixture.lines_tagged("[BATCH]");
        assert_eq!(batch.len(), 1);
        assert!(batch[0].contains("[CANCELLED] [BATCH] Apply cancelled after 1 of 3 tweak(s)"));
    }

    #[test]
    fn test_undo_cancellation_between_tweaks() {
        let token = CancellationToken::new();
        let first = Arc::new(ScriptedMethod {
            cancel_on_revert: Some(token.clone()),
            ..Default::default()
        });
        let (second, third) = (method(), method());
        let (host, _) = memory_host();
        let fixture = Fixture::new(
            vec![
                scripted_tweak("t.1", first.clone()),
                scripted_tweak("t.2", second.clone()),
                scripted_tweak("t.3", third.clone()),
            ],
            host,
        );

        let result = fixture.engine.undo(&["t.1", "t.2", "t.3"], &NoProgress, &token);

        let Err(EngineError::Cancelled(report)) = result else {
            panic!("expected the batch to be cancelled");
        };
        assert_eq!(reverted(&first), 1);
        assert_eq!(reverted(&second), 0);
        assert_eq!(reverted(&third), 0);
        assert_eq!(report.outcomes, vec![("t.1".to_string(), TweakOutcome::Reverted)]);
        let batch = fixture.lines_tagged("[BATCH]");
        assert_eq!(batch.len(), 1);
        assert!(batch[0].contains("[CANCELLED] [BATCH] Undo cancelled after 1 of 3 tweak(s)"));
    }

    #[test]
    fn test_reapply_then_undo_restores_original_service_start() {
        let dir = TempDir::new().unwrap();
        let (host, _) = memory_host_with_services(
            MemoryServices::new().with_service("DiagTrack", StartType::Manual, true),
        );
        let services = host.services.clone();
        let snapshots = Arc::new(SnapshotManager::new(
            dir.path().join("service_snapshots.json"),
            services.clone(),
        ));
        let fixture = Fixture::new(
            vec![disable_diag_track()],
            host.with_snapshots(snapshots.clone()),
        );
        let ids = [crate::tweaks::ids::DISABLE_DIAG_TRACK];

        for _ in 0..2 {
            fixture
                .engine
                .apply(&ids, false, "", &NoProgress, &CancellationToken::new())
                .unwrap();
        }
        assert_eq!(services.start_type("DiagTrack"), Some(StartType::Disabled));
        assert_eq!(snapshots.load().len(), 2);

        fixture
            .engine
            .undo(&ids, &NoProgress, &CancellationToken::new())
            .unwrap();

        assert_eq!(services.start_type("DiagTrack"), Some(StartType::Manual));
    }

    #[test]
    fn test_restore_point_failure_aborts_batch() {
        let tweak = method();
        let (host, scripts) = memory_host();
        scripts.fail_when_contains("Checkpoint-Computer");
        let fixture = Fixture::new(vec![scripted_tweak("t.a", tweak.clone())], host);

        let result = fixture.engine.apply(
            &["t.a"],
            true,
            "Before debloat",
            &NoProgress,
            &CancellationToken::new(),
        );

        assert!(matches!(result, Err(EngineError::RestorePoint(ScriptError::NonZeroExit(Some(1))))));
        assert_eq!(applied(&tweak), 0);
        assert!(fixture.lines_tagged("[RESTORE-POINT]")[0].contains("[FAILED]"));
        assert!(fixture.lines_tagged("[APPLY]").is_empty());
    }

    #[test]
    fn test_restore_point_cancel_is_not_a_failure() {
        let tweak = method();
        let token = CancellationToken::new();
        let (host, scripts) = memory_host();
        scripts.cancel_while_running(token.clone());
        let fixture = Fixture::new(vec![scripted_tweak("t.a", tweak.clone())], host);
        let progress = RecordingProgress::default();

        let result = fixture.engine.apply(&["t.a"], true, "Debloater", &progress, &token);

        assert!(matches!(result, Err(EngineError::Cancelled(ref r)) if r.outcomes.is_empty()));
        assert_eq!(applied(&tweak), 0);
        assert!(fixture.lines_tagged("[RESTORE-POINT]")[0].contains("[CANCELLED]"));
        assert!(fixture.lines_tagged("[BATCH]")[0].contains("[CANCELLED]"));
        assert_eq!(progress.lines().last().unwrap(), "Operation cancelled");
    }

    #[test]
    fn test_restore_point_script_escapes_description() {
        let (host, scripts) = memory_host();
        let fixture = Fixture::new(Vec::new(), host);

        fixture
            .engine
            .apply(&[] as &[&str], true, "Bob's backup", &NoProgress, &CancellationToken::new())
            .unwrap();

        assert_eq!(
            scripts.scripts(),
            vec!["Checkpoint-Computer -Description 'Bob''s backup' -RestorePointType 'MODIFY_SETTINGS'"]
        );
        assert!(fixture.lines_tagged("[RESTORE-POINT]")[0].contains("[SUCCESS]"));
    }

    #[test]
    fn test_requires_admin_ignores_unknown_ids() {
        let mut elevated = scripted_tweak("t.b", method());
        elevated.admin_required = true;
        let (host, _) = memory_host();
        let fixture = Fixture::new(vec![scripted_tweak("t.a", method()), elevated], host);

        assert!(fixture.engine.requires_admin(&["t.a", "t.b"]));
        assert!(fixture.engine.requires_admin(&["T.B"]));
        assert!(!fixture.engine.requires_admin(&["t.a", "t.unknown"]));
        assert!(!fixture.engine.requires_admin::<&str>(&[]));
    }

    #[test]
    fn test_ids_deduplicated_unknown_skipped_caller_order_kept() {
        let (a, c) = (method(), method());
        let (host, _) = memory_host();
        let fixture = Fixture::new(
            vec![scripted_tweak("t.a", a.clone()), scripted_tweak("t.c", c.clone())],
            host,
        );

        let report = fixture
            .engine
            .apply(
                &["t.c", "t.a", "T.A", "t.gone", "t.c"],
                false,
                "",
                &NoProgress,
                &CancellationToken::new(),
            )
            .unwrap();

        assert_eq!(applied(&a), 1);
        assert_eq!(applied(&c), 1);
        let order: Vec<&str> = report.outcomes.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(order, vec!["t.c", "t.a"]);
    }

    #[test]
    fn test_service_tweaks_are_snapshotted_before_apply() {
        let dir = TempDir::new().unwrap();
        let (host, _) = memory_host_with_services(
            MemoryServices::new().with_service("Svc", StartType::Manual, true),
        );
        let snapshots = Arc::new(SnapshotManager::new(
            dir.path().join("service_snapshots.json"),
            host.services.clone(),
        ));
        let host = host.with_snapshots(snapshots.clone());
        let touches_service = Arc::new(ScriptedMethod {
            services: vec!["Svc".to_string()],
            ..Default::default()
        });
        let fixture = Fixture::new(
            vec![
                scripted_tweak("t.svc", touches_service),
                scripted_tweak("t.plain", method()),
            ],
            host,
        );

        fixture
            .engine
            .apply(&["t.svc", "t.plain"], false, "", &NoProgress, &CancellationToken::new())
            .unwrap();

        assert_eq!(snapshots.load().len(), 1);
        assert_eq!(snapshots.get_snapshot_start_type("Svc").as_deref(), Some("Manual"));
    }

    #[test]
    fn test_unwritable_audit_log_never_fails_the_batch() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let tweak = method();
        let (host, _) = memory_host();
        let catalog = Catalog::new(vec![scripted_tweak("t.a", tweak.clone())], Vec::new()).unwrap();
        let engine = Engine::new(catalog, host)
            .with_audit(Arc::new(AuditLogger::new(blocker.join("debloater.log"))));

        let report = engine
            .apply(&["t.a"], false, "", &NoProgress, &CancellationToken::new())
            .unwrap();

        assert_eq!(applied(&tweak), 1);
        assert_eq!(report.outcome("t.a"), Some(&TweakOutcome::Applied));
        // One APPLY entry plus the BATCH summary.
        assert_eq!(report.instrumentation_failures, 2);
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let (host, _) = memory_host();
        let fixture = Fixture::new(vec![disable_cortana()], host);

        let plan = fixture
            .engine
            .dry_run(&["privacy.disableCortana"], &NoProgress);

        assert_eq!(plan.len(), 1);
        assert!(!plan[0].1.is_empty());
        assert!(plan[0].1[0].starts_with("Set HKEY_LOCAL_MACHINE\\"));
        assert_eq!(
            fixture.engine.status("privacy.disableCortana"),
            Some(TweakStatus::NotApplied)
        );
        assert_eq!(fixture.lines_tagged("[DRY-RUN]").len(), 1);
        assert!(fixture.lines_tagged("[APPLY]").is_empty());
    }

    #[test]
    fn test_status_is_gated_by_os_build() {
        let (host, _) = memory_host();
        let fixture = Fixture::new(vec![disable_copilot()], host);
        let id = "privacy.disableCopilot";

        // Build unknown: not gated.
        assert_eq!(fixture.engine.status(id), Some(TweakStatus::NotApplied));

        fixture
            .engine
            .host()
            .registry
            .write_value(
                "HKEY_LOCAL_MACHINE\\SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion",
                "CurrentBuildNumber",
                &RegistryKeyValue::String("19045".into()),
            )
            .unwrap();

        assert_eq!(fixture.engine.status(id), Some(TweakStatus::NotSupported));
        assert_eq!(fixture.engine.statuses()[0].1, TweakStatus::NotSupported);
        assert_eq!(fixture.engine.status("privacy.nope"), None);
    }
}
