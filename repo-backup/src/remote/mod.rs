//! Remote object store abstraction.
//!
//! Stores accept updates to an existing path only when the caller presents
//! that object's current content id; writes without one may only create.

pub mod github;
pub mod memory;

use crate::utils::{Result, SyncError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use github::GitHubClient;
pub use memory::MemoryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObjectMetadata {
    pub path: String,
    pub name: String,
    /// Opaque version token (hex digest) required to update this object
    pub content_id: String,
    pub size: u64,
    pub kind: ObjectKind,
}

impl RemoteObjectMetadata {
    pub fn is_file(&self) -> bool {
        self.kind == ObjectKind::File
    }
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Metadata for `path`, or `None` when nothing exists there.
    async fn get_metadata(&self, path: &str) -> Result<Option<RemoteObjectMetadata>>;

    /// Full content of the file at `path`; `NotFound` when absent.
    async fn get_content(&self, path: &str) -> Result<Vec<u8>>;

    /// Create `path` (`expected_content_id` absent) or update it (id of the
    /// current object present). Any mismatch is a `Conflict`.
    async fn put_content(
        &self,
        path: &str,
        content: &[u8],
        expected_content_id: Option<&str>,
    ) -> Result<RemoteObjectMetadata>;

    /// One level of `dir`; `NotFound` when the directory does not exist.
    async fn list(&self, dir: &str) -> Result<Vec<RemoteObjectMetadata>>;

    /// `InvalidInput` when the store has no destination to read or write.
    fn ensure_target(&self) -> Result<()> {
        Ok(())
    }
}

/// What an upsert did to the remote path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertAction {
    Created,
    Updated,
}

#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub action: UpsertAction,
    pub metadata: RemoteObjectMetadata,
}

/// Create-or-update `path`, reading the current content id first.
///
/// The read and the write are not atomic; another writer slipping in between
/// surfaces as a `Conflict` from the store and is not retried.
pub async fn upsert<S>(store: &S, path: &str, content: &[u8]) -> Result<UpsertOutcome>
where
    S: RemoteStore + ?Sized,
{
    let existing = store.get_metadata(path).await?;

    let expected = match &existing {
        Some(meta) if meta.kind == ObjectKind::Directory => {
            return Err(SyncError::conflict(path, "a directory exists at this path"));
        }
        Some(meta) => Some(meta.content_id.as_str()),
        None => None,
    };

    debug!(path, update = expected.is_some(), "upserting remote object");
    let metadata = store.put_content(path, content, expected).await?;

    let action = if existing.is_some() {
        UpsertAction::Updated
    } else {
        UpsertAction::Created
    };
    Ok(UpsertOutcome { action, metadata })
}

/// Final `/`-separated component of a remote path.
pub fn basename(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or("")
}
