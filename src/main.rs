// src/main.rs

use std::{path::PathBuf, sync::Arc, thread};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use crossbeam::channel::unbounded;
use debloater::{
    audit::AuditLogger,
    catalog::Catalog,
    engine::{BatchReport, Engine},
    errors::{AuditError, EngineError},
    host::Host,
    progress::{CancellationToken, NoProgress, ProgressSink},
    settings::{DataPaths, Settings},
    snapshot::SnapshotManager,
    tweaks::{TweakCategory, TweakSeverity},
    utils::windows::is_elevated,
};
use tracing::{warn, Level};

#[derive(Parser, Debug)]
#[command(name = "debloater", version, about = "Apply and undo Windows debloat tweaks")]
struct Cli {
    /// Print debug diagnostics to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Override the directory holding settings, snapshots and the audit log.
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the tweak catalog.
    List {
        #[arg(long)]
        category: Option<TweakCategory>,
    },
    /// List the built-in profiles.
    Profiles,
    /// Show the current status of tweaks.
    Status { ids: Vec<String> },
    /// Apply tweaks by id or profile.
    Apply {
        ids: Vec<String>,
        #[arg(long)]
        profile: Option<String>,
        /// Skip the system restore point.
        #[arg(long)]
        no_restore_point: bool,
        /// Restore point description.
        #[arg(long)]
        description: Option<String>,
        /// Print the planned changes without touching the system.
        #[arg(long)]
        dry_run: bool,
        /// Confirm Dangerous tweaks.
        #[arg(short, long)]
        yes: bool,
    },
    /// Undo tweaks by id or profile.
    Undo {
        ids: Vec<String>,
        #[arg(long)]
        profile: Option<String>,
        #[arg(short, long)]
        yes: bool,
    },
    /// Show OS, edition and protection details.
    Info,
    #[command(subcommand)]
    Snapshot(SnapshotCommand),
    #[command(subcommand)]
    Log(LogCommand),
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Inspect recorded service start modes.
#[derive(Subcommand, Debug)]
enum SnapshotCommand {
    Show { service: String },
    Clear,
}

/// Inspect the audit log.
#[derive(Subcommand, Debug)]
enum LogCommand {
    Show,
    Clear,
    Path,
}

/// Inspect or change persisted settings.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    Show,
    /// Set one key, e.g. `lock_dangerous_tweaks true`.
    Set { key: String, value: String },
    Path,
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let paths = cli
        .data_dir
        .map(DataPaths::new)
        .unwrap_or_else(DataPaths::platform_default);
    let mut settings = Settings::load_or_default(&paths.settings_file());
    let audit = Arc::new(AuditLogger::new(paths.log_file()));

    match cli.command {
        Command::List { category } => list(&settings, category),
        Command::Profiles => profiles(&settings),
        Command::Status { ids } => status(&*build_engine(&paths, &settings, &audit)?, &ids),
        Command::Apply {
            ids,
            profile,
            no_restore_point,
            description,
            dry_run,
            yes,
        } => {
            let engine = build_engine(&paths, &settings, &audit)?;
            let ids = select_ids(engine.catalog(), ids, profile, &settings)?;
            if dry_run {
                return plan(&engine, &ids);
            }
            check_dangerous(&engine, &ids, &settings, yes)?;
            let create_restore_point = settings.create_restore_point && !no_restore_point;
            let description =
                description.unwrap_or_else(|| settings.restore_point_description.clone());
            run_session(&audit, || {
                check_admin(&engine, &audit, "Apply", &ids)?;
                let report = run_batch(engine, move |engine, progress, cancel| {
                    engine.apply(&ids, create_restore_point, &description, progress, cancel)
                })?;
                finish(report)
            })
        }
        Command::Undo { ids, profile, yes } => {
            let engine = build_engine(&paths, &settings, &audit)?;
            let ids = select_ids(engine.catalog(), ids, profile, &settings)?;
            check_dangerous(&engine, &ids, &settings, yes)?;
            run_session(&audit, || {
                check_admin(&engine, &audit, "Undo", &ids)?;
                let report = run_batch(engine, move |engine, progress, cancel| {
                    engine.undo(&ids, progress, cancel)
                })?;
                finish(report)
            })
        }
        Command::Info => info(&*build_engine(&paths, &settings, &audit)?),
        Command::Snapshot(command) => {
            let host = Host::system()?;
            let snapshots = SnapshotManager::new(paths.snapshot_file(), host.services);
            match command {
                SnapshotCommand::Show { service } => {
                    match snapshots.get_snapshot_start_type(&service) {
                        Some(start_type) => println!("{}: {}", service, start_type),
                        None => println!("No snapshot recorded for {}", service),
                    }
                }
                SnapshotCommand::Clear => snapshots.clear_snapshots(),
            }
            Ok(())
        }
        Command::Log(command) => {
            match command {
                LogCommand::Show => print!("{}", audit.export()),
                LogCommand::Clear => audit.clear(),
                LogCommand::Path => println!("{}", audit.path().display()),
            }
            Ok(())
        }
        Command::Config(command) => {
            match command {
                ConfigCommand::Show => print!("{}", settings.to_toml()?),
                ConfigCommand::Set { key, value } => {
                    settings.set(&key, &value)?;
                    settings.save(&paths.settings_file())?;
                    println!("{} = {}", key, value);
                }
                ConfigCommand::Path => println!("{}", paths.settings_file().display()),
            }
            Ok(())
        }
    }
}

fn build_engine(paths: &DataPaths, settings: &Settings, audit: &Arc<AuditLogger>) -> Result<Arc<Engine>> {
    let catalog = Catalog::with_defaults(settings.bloatware_scope)?;
    let host = Host::system()?;
    let snapshots = Arc::new(SnapshotManager::new(paths.snapshot_file(), host.services.clone()));
    let engine = Engine::new(catalog, host.with_snapshots(snapshots)).with_audit(audit.clone());
    Ok(Arc::new(engine))
}

/// Explicit ids plus the ids of `--profile`; the configured profile when both are absent.
fn select_ids(
    catalog: &Catalog,
    ids: Vec<String>,
    profile: Option<String>,
    settings: &Settings,
) -> Result<Vec<String>> {
    let profile = match profile {
        Some(profile) => Some(profile),
        None if ids.is_empty() => Some(settings.selected_profile.clone()),
        None => None,
    };

    let mut selected = Vec::new();
    if let Some(profile) = profile {
        let profile = catalog
            .profile(&profile)
            .ok_or_else(|| anyhow!("Unknown profile '{}'", profile))?;
        selected.extend(profile.tweak_ids.iter().map(|id| id.to_string()));
    }
    selected.extend(ids);
    Ok(selected)
}

fn check_dangerous(engine: &Engine, ids: &[String], settings: &Settings, yes: bool) -> Result<()> {
    let dangerous: Vec<&str> = ids
        .iter()
        .filter_map(|id| engine.catalog().get(id))
        .filter(|tweak| tweak.severity == TweakSeverity::Dangerous)
        .map(|tweak| tweak.id)
        .collect();
    if dangerous.is_empty() {
        return Ok(());
    }
    if settings.lock_dangerous_tweaks {
        bail!("Dangerous tweaks are locked in settings: {}", dangerous.join(", "));
    }
    if !yes {
        bail!(
            "Dangerous tweaks selected ({}); pass --yes to confirm",
            dangerous.join(", ")
        );
    }
    Ok(())
}

fn check_admin(engine: &Engine, audit: &AuditLogger, operation: &str, ids: &[String]) -> Result<()> {
    let required = engine.requires_admin(ids);
    let elevated = is_elevated();
    log_best_effort(audit.log_admin_check(operation, required, elevated));
    if required && !elevated {
        bail!("Administrator privileges are required; rerun from an elevated prompt");
    }
    Ok(())
}

fn run_session<F>(audit: &AuditLogger, body: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    log_best_effort(audit.log_session_start());
    let result = body();
    log_best_effort(audit.log_session_end());
    result
}

/// Runs `job` on a worker thread, printing its progress until it finishes.
/// Ctrl-C requests cancellation, observed between tweaks.
fn run_batch<F>(engine: Arc<Engine>, job: F) -> Result<BatchReport>
where
    F: FnOnce(&Engine, &dyn ProgressSink, &CancellationToken) -> Result<BatchReport, EngineError>
        + Send
        + 'static,
{
    let cancel = CancellationToken::new();
    if let Err(e) = cancel.cancel_on_interrupt() {
        warn!("Ctrl-C will not cancel this run: {}", e);
    }

    let (sender, receiver) = unbounded::<String>();
    let worker = {
        let cancel = cancel.clone();
        thread::spawn(move || {
            let sink: &dyn ProgressSink = &sender;
            job(engine.as_ref(), sink, &cancel)
        })
    };

    for line in receiver.iter() {
        println!("{}", line);
    }

    match worker.join().map_err(|_| anyhow!("Worker thread panicked"))? {
        Ok(report) => Ok(report),
        Err(EngineError::Cancelled(report)) => {
            bail!("Cancelled after {} tweak(s)", report.outcomes.len())
        }
        Err(e) => Err(e).context("Batch aborted"),
    }
}

fn finish(report: BatchReport) -> Result<()> {
    if report.instrumentation_failures > 0 {
        warn!(
            "{} audit or snapshot write(s) failed during the batch",
            report.instrumentation_failures
        );
    }
    if report.has_failures() {
        bail!("{} tweak(s) failed", report.failed());
    }
    Ok(())
}

fn log_best_effort(result: Result<(), AuditError>) {
    if let Err(e) = result {
        warn!("Failed to write audit entry: {}", e);
    }
}

fn list(settings: &Settings, category: Option<TweakCategory>) -> Result<()> {
    let catalog = Catalog::with_defaults(settings.bloatware_scope)?;
    for tweak in catalog
        .tweaks()
        .filter(|t| category.map_or(true, |c| t.category == c))
    {
        println!(
            "{:<38} {:<12} {:<10} {:<6} {:<8} {}",
            tweak.id,
            tweak.category,
            tweak.severity,
            if tweak.admin_required { "admin" } else { "" },
            if tweak.supports_undo { "undo" } else { "no-undo" },
            tweak.title
        );
    }
    Ok(())
}

fn profiles(settings: &Settings) -> Result<()> {
    let catalog = Catalog::with_defaults(settings.bloatware_scope)?;
    for profile in catalog.profiles() {
        println!("{} - {}", profile.id, profile.title);
        println!("  {}", profile.description);
        for id in &profile.tweak_ids {
            println!("    {}", id);
        }
    }
    Ok(())
}

fn status(engine: &Engine, ids: &[String]) -> Result<()> {
    if ids.is_empty() {
        for (tweak, status) in engine.statuses() {
            println!("{:<38} {:<14} {}", tweak.id, status, tweak.title);
        }
        return Ok(());
    }
    for id in ids {
        match engine.status(id) {
            Some(status) => println!("{:<38} {}", id, status),
            None => println!("{:<38} unknown tweak", id),
        }
    }
    Ok(())
}

fn plan(engine: &Engine, ids: &[String]) -> Result<()> {
    for (id, changes) in engine.dry_run(ids, &NoProgress) {
        println!("{}", id);
        for change in changes {
            println!("  {}", change);
        }
    }
    Ok(())
}

fn info(engine: &Engine) -> Result<()> {
    let guard = engine.os_guard();
    println!("Device:   {}", guard.device_name());
    println!("System:   {}", guard.system_info());
    println!("Elevated: {}", if is_elevated() { "Yes" } else { "No" });
    Ok(())
}
