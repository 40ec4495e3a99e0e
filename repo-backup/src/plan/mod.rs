//! Transfer planning.
//!
//! A plan is built once, up front, and is read-only while it executes.

pub mod backup;
pub mod restore;

pub use backup::build_plan as plan_backup;
pub use restore::build_plan as plan_restore;

use std::path::PathBuf;

/// Remote directory used when a backup is given no prefix
pub const DEFAULT_PREFIX: &str = "backups/";

/// One file's movement. Which locator is remote depends on the direction the
/// plan is executed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferUnit {
    pub source: String,
    pub destination: String,
    pub display_name: String,
    /// Local side as an OS path; the local string locator may be lossy
    pub local_path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct TransferPlan {
    units: Vec<TransferUnit>,
}

impl TransferPlan {
    pub fn units(&self) -> &[TransferUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TransferUnit> {
        self.units.iter()
    }

    pub fn destinations(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(|u| u.destination.as_str())
    }
}

impl From<Vec<TransferUnit>> for TransferPlan {
    fn from(units: Vec<TransferUnit>) -> Self {
        Self { units }
    }
}

impl<'a> IntoIterator for &'a TransferPlan {
    type Item = &'a TransferUnit;
    type IntoIter = std::slice::Iter<'a, TransferUnit>;

    fn into_iter(self) -> Self::IntoIter {
        self.units.iter()
    }
}
