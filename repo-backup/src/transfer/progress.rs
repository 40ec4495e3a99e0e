//! Unit-level progress tracking for transfer batches.
//!
//! Percentages count finished units, not bytes, so they only move forward.

use std::time::{Duration, Instant};

/// Snapshot handed to the progress sink
#[derive(Debug, Clone, PartialEq)]
pub struct BatchProgress {
    /// Units finished so far, successful or not
    pub completed: usize,

    /// Units in the plan
    pub total: usize,

    /// Unit about to run; `None` once the batch is over
    pub current: Option<String>,

    /// Bytes moved by successful units
    pub transferred_bytes: u64,

    /// Set on the final update only
    pub finished: bool,
}

impl BatchProgress {
    pub fn new(total: usize) -> Self {
        Self {
            completed: 0,
            total,
            current: None,
            transferred_bytes: 0,
            finished: false,
        }
    }

    /// Percentage complete (0-100). A finished batch always reads 100.
    pub fn percent(&self) -> f64 {
        if self.finished || self.total == 0 {
            100.0
        } else {
            (self.completed as f64 / self.total as f64) * 100.0
        }
    }
}

/// Progress tracker with elapsed-time bookkeeping
pub struct ProgressTracker {
    start_time: Instant,
    progress: BatchProgress,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            start_time: Instant::now(),
            progress: BatchProgress::new(total),
        }
    }

    /// Mark `name` as the unit now running.
    pub fn begin_unit(&mut self, name: &str) -> &BatchProgress {
        self.progress.current = Some(name.to_string());
        &self.progress
    }

    /// Count the running unit as done.
    pub fn finish_unit(&mut self, bytes: u64) {
        self.progress.completed += 1;
        self.progress.transferred_bytes += bytes;
    }

    /// Final snapshot; reads 100% whatever the outcomes were.
    pub fn finish(&mut self) -> &BatchProgress {
        self.progress.current = None;
        self.progress.finished = true;
        &self.progress
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn progress(&self) -> &BatchProgress {
        &self.progress
    }
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Format speed as human-readable string
pub fn format_speed(bytes_per_second: u64) -> String {
    format!("{}/s", format_bytes(bytes_per_second))
}

/// Format duration as human-readable string
pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}
