//! repo-backup library
//!
//! Backs up local files and folders into a hosted content repository and
//! restores remote files to local disk, one transfer at a time.

pub mod commands;
pub mod config;
pub mod executor;
pub mod fs;
pub mod plan;
pub mod remote;
pub mod transfer;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use executor::{BatchExecutor, BatchResult, BatchStatus, Direction, TransferOutcome};
pub use plan::{TransferPlan, TransferUnit};
pub use remote::{GitHubClient, RemoteStore};
pub use utils::errors::{ErrorKind, SyncError};
pub type Result<T> = std::result::Result<T, SyncError>;
