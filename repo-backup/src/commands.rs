//! Command objects invoked by the CLI.
//!
//! Each command validates its inputs, builds a plan and hands it to a
//! [`BatchExecutor`]; nothing here talks to a terminal.

use crate::executor::{BatchExecutor, BatchResult, BatchStatus, Direction};
use crate::fs::{select_files, select_folders, WalkOptions};
use crate::plan::{plan_backup, plan_restore, TransferPlan};
use crate::remote::{RemoteObjectMetadata, RemoteStore};
use crate::transfer::progress::{format_bytes, format_duration, format_speed, BatchProgress};
use crate::utils::Result;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Back up picked files and folders under a remote prefix.
#[derive(Debug, Clone, Default)]
pub struct BackupCommand {
    pub files: Vec<PathBuf>,
    pub folders: Vec<PathBuf>,
    /// Remote directory; empty selects the default prefix
    pub prefix: String,
    pub walk_options: WalkOptions,
}

impl BackupCommand {
    /// Enumerate the selection and map it onto remote paths.
    pub fn plan(&self) -> Result<TransferPlan> {
        let files = select_files(&self.files)?;
        let folders = select_folders(&self.folders, &self.walk_options)?;
        plan_backup(&files, &folders, &self.prefix)
    }

    /// Fails before planning when the store has no destination.
    pub async fn run<F>(&self, executor: &BatchExecutor<'_>, on_progress: F) -> Result<BatchResult>
    where
        F: FnMut(&BatchProgress),
    {
        executor.store().ensure_target()?;
        let plan = self.plan()?;
        Ok(executor.execute(&plan, Direction::Backup, on_progress).await)
    }
}

/// Restore picked remote files into one local directory.
#[derive(Debug, Clone)]
pub struct RestoreCommand {
    pub remote_paths: Vec<String>,
    pub destination: PathBuf,
}

impl RestoreCommand {
    pub fn plan(&self) -> Result<TransferPlan> {
        plan_restore(&self.remote_paths, &self.destination)
    }

    pub async fn run<F>(&self, executor: &BatchExecutor<'_>, on_progress: F) -> Result<BatchResult>
    where
        F: FnMut(&BatchProgress),
    {
        executor.store().ensure_target()?;
        let plan = self.plan()?;
        Ok(executor.execute(&plan, Direction::Restore, on_progress).await)
    }
}

/// List one remote directory level.
#[derive(Debug, Clone, Default)]
pub struct ListCommand {
    pub dir: String,
    /// Drop directories from the result, leaving restorable entries only
    pub files_only: bool,
}

impl ListCommand {
    pub async fn run(&self, store: &dyn RemoteStore) -> Result<Vec<RemoteObjectMetadata>> {
        store.ensure_target()?;
        let mut entries = store.list(&self.dir).await?;
        if self.files_only {
            entries.retain(|entry| entry.is_file());
        }
        Ok(entries)
    }
}

/// `[completed/total pct%] label` line for one progress snapshot
pub fn format_progress(progress: &BatchProgress) -> String {
    let label = match (&progress.current, progress.finished) {
        (_, true) => "done",
        (Some(current), false) => current.as_str(),
        (None, false) => "",
    };
    format!(
        "[{}/{} {:>3.0}%] {}",
        progress.completed,
        progress.total,
        progress.percent(),
        label
    )
}

/// Human-readable summary of a finished batch
pub fn format_report(result: &BatchResult, target: &str) -> String {
    let verb = match result.direction {
        Direction::Backup => "Backed up",
        Direction::Restore => "Restored",
    };

    let mut report = match result.status() {
        BatchStatus::Complete => format!(
            "Success: {} {} file(s) ({}) to {} in {} ({})",
            verb,
            result.succeeded,
            format_bytes(result.transferred_bytes),
            target,
            format_duration(result.elapsed().as_secs()),
            format_speed(result.average_speed())
        ),
        BatchStatus::Empty => format!("Nothing to transfer to {}", target),
        BatchStatus::Partial | BatchStatus::Failed => format!(
            "Partial success: {} {}/{} file(s) to {}",
            verb, result.succeeded, result.attempted, target
        ),
    };

    if result.cancelled {
        report.push_str(" (cancelled)");
    }

    let mut failures = result.failures().peekable();
    if failures.peek().is_some() {
        report.push_str("\nErrors:");
        for (name, message) in failures {
            let _ = write!(report, "\n  {}: {}", name, message);
        }
    }
    report
}
