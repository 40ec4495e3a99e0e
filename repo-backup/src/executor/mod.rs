//! Batch transfer executor - drives a plan one unit at a time.
//!
//! Exactly one unit is in flight at any moment. A failing unit is recorded
//! and the batch moves on; nothing short of cancellation stops it early, and
//! cancellation is only observed between units.

use crate::plan::{TransferPlan, TransferUnit};
use crate::remote::{upsert, RemoteStore, UpsertAction};
use crate::transfer::progress::{format_bytes, format_duration, BatchProgress, ProgressTracker};
use crate::utils::{ErrorKind, Result, SyncError};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Which side of each unit is remote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Local source, remote destination
    Backup,
    /// Remote source, local destination
    Restore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferAction {
    /// New remote object
    Created,
    /// Existing remote object replaced under its content id
    Updated,
    /// Local file written (any previous file at the path is replaced)
    Restored,
}

#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub unit: TransferUnit,
    pub succeeded: bool,
    pub error_message: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub action: Option<TransferAction>,
    pub bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// Every unit succeeded
    Complete,
    /// Some units failed
    Partial,
    /// Units were attempted and none succeeded
    Failed,
    /// Nothing was attempted
    Empty,
}

#[derive(Debug, Clone)]
pub struct BatchResult {
    pub direction: Direction,
    pub attempted: usize,
    pub succeeded: usize,
    /// One entry per attempted unit, in plan order
    pub outcomes: Vec<TransferOutcome>,
    pub transferred_bytes: u64,
    /// Stopped before the end of the plan
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchResult {
    pub fn status(&self) -> BatchStatus {
        match (self.attempted, self.succeeded) {
            (0, _) => BatchStatus::Empty,
            (_, 0) => BatchStatus::Failed,
            (attempted, succeeded) if succeeded == attempted => BatchStatus::Complete,
            _ => BatchStatus::Partial,
        }
    }

    /// Every planned unit ran and succeeded
    pub fn is_complete(&self) -> bool {
        self.status() == BatchStatus::Complete && !self.cancelled
    }

    /// Wall-clock time between the first and last unit
    pub fn elapsed(&self) -> Duration {
        (self.finished_at - self.started_at).to_std().unwrap_or_default()
    }

    /// Bytes per second over the whole batch; 0 for an instant batch
    pub fn average_speed(&self) -> u64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            (self.transferred_bytes as f64 / elapsed) as u64
        } else {
            0
        }
    }

    pub fn failed(&self) -> usize {
        self.attempted - self.succeeded
    }

    /// `(display name, error message)` for every failed unit
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter(|o| !o.succeeded).map(|o| {
            (
                o.unit.display_name.as_str(),
                o.error_message.as_deref().unwrap_or("unknown error"),
            )
        })
    }
}

/// Sequential executor bound to one remote store
pub struct BatchExecutor<'a> {
    store: &'a dyn RemoteStore,
    cancel_token: CancellationToken,
}

impl<'a> BatchExecutor<'a> {
    /// Create an executor (no cancellation support)
    pub fn new(store: &'a dyn RemoteStore) -> Self {
        Self {
            store,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Create an executor that stops between units once `cancel_token` fires
    pub fn with_cancel(store: &'a dyn RemoteStore, cancel_token: CancellationToken) -> Self {
        Self {
            store,
            cancel_token,
        }
    }

    pub fn store(&self) -> &'a dyn RemoteStore {
        self.store
    }

    /// Run every unit of `plan` in order.
    ///
    /// `on_progress` sees a snapshot before each unit and a final snapshot at
    /// 100% once the batch is over, whether or not units failed.
    pub async fn execute<F>(
        &self,
        plan: &TransferPlan,
        direction: Direction,
        mut on_progress: F,
    ) -> BatchResult
    where
        F: FnMut(&BatchProgress),
    {
        let started_at = Utc::now();
        let total = plan.len();
        let mut tracker = ProgressTracker::new(total);
        let mut outcomes = Vec::with_capacity(total);
        let mut cancelled = false;

        info!("Starting {:?} batch: {} units", direction, total);

        for unit in plan {
            if self.cancel_token.is_cancelled() {
                info!("Batch cancelled after {} of {} units", outcomes.len(), total);
                cancelled = true;
                break;
            }

            on_progress(tracker.begin_unit(&unit.display_name));

            let outcome = match self.run_unit(unit, direction).await {
                Ok((action, bytes)) => {
                    info!(
                        "{:?} {} ({}) -> {}",
                        action,
                        unit.source,
                        format_bytes(bytes),
                        unit.destination
                    );
                    TransferOutcome {
                        unit: unit.clone(),
                        succeeded: true,
                        error_message: None,
                        error_kind: None,
                        action: Some(action),
                        bytes,
                    }
                }
                Err(e) => {
                    warn!("Failed to transfer {}: {}", unit.display_name, e);
                    TransferOutcome {
                        unit: unit.clone(),
                        succeeded: false,
                        error_message: Some(e.to_string()),
                        error_kind: Some(e.kind()),
                        action: None,
                        bytes: 0,
                    }
                }
            };

            tracker.finish_unit(outcome.bytes);
            outcomes.push(outcome);
        }

        on_progress(tracker.finish());

        let succeeded = outcomes.iter().filter(|o| o.succeeded).count();
        let transferred_bytes = tracker.progress().transferred_bytes;

        info!(
            "Batch finished: {}/{} units succeeded, {} in {}",
            succeeded,
            outcomes.len(),
            format_bytes(transferred_bytes),
            format_duration(tracker.elapsed().as_secs())
        );

        BatchResult {
            direction,
            attempted: outcomes.len(),
            succeeded,
            outcomes,
            transferred_bytes,
            cancelled,
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn run_unit(&self, unit: &TransferUnit, direction: Direction) -> Result<(TransferAction, u64)> {
        match direction {
            Direction::Backup => {
                let content = tokio::fs::read(&unit.local_path)
                    .await
                    .map_err(|e| SyncError::local_io(&unit.local_path, e))?;

                let outcome = upsert(self.store, &unit.destination, &content).await?;
                let action = match outcome.action {
                    UpsertAction::Created => TransferAction::Created,
                    UpsertAction::Updated => TransferAction::Updated,
                };
                Ok((action, content.len() as u64))
            }
            Direction::Restore => {
                let content = self.store.get_content(&unit.source).await?;

                let destination = unit.local_path.as_path();
                if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| SyncError::local_io(parent, e))?;
                }
                tokio::fs::write(destination, &content)
                    .await
                    .map_err(|e| SyncError::local_io(destination, e))?;

                Ok((TransferAction::Restored, content.len() as u64))
            }
        }
    }
}
