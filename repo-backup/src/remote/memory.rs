//! In-process object store with content-id guarded writes.
//!
//! Directories exist implicitly while at least one file lives beneath them.

use super::{ObjectKind, RemoteObjectMetadata, RemoteStore};
use crate::utils::{Result, SyncError};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn normalize(path: &str) -> &str {
    path.trim_matches('/')
}

fn file_metadata(path: &str, content: &[u8]) -> RemoteObjectMetadata {
    RemoteObjectMetadata {
        path: path.to_string(),
        name: super::basename(path).to_string(),
        content_id: digest(content),
        size: content.len() as u64,
        kind: ObjectKind::File,
    }
}

fn dir_metadata(path: &str) -> RemoteObjectMetadata {
    RemoteObjectMetadata {
        path: path.to_string(),
        name: super::basename(path).to_string(),
        content_id: digest(format!("tree:{}", path).as_bytes()),
        size: 0,
        kind: ObjectKind::Directory,
    }
}

fn is_dir(files: &BTreeMap<String, Vec<u8>>, path: &str) -> bool {
    let prefix = format!("{}/", path);
    files
        .range(prefix.clone()..)
        .next()
        .is_some_and(|(key, _)| key.starts_with(&prefix))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files held.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        // A poisoned map is still consistent: every mutation is a single insert
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get_metadata(&self, path: &str) -> Result<Option<RemoteObjectMetadata>> {
        let path = normalize(path);
        let files = self.lock();

        if let Some(content) = files.get(path) {
            return Ok(Some(file_metadata(path, content)));
        }
        if path.is_empty() || is_dir(&files, path) {
            return Ok(Some(dir_metadata(path)));
        }
        Ok(None)
    }

    async fn get_content(&self, path: &str) -> Result<Vec<u8>> {
        let path = normalize(path);
        self.lock()
            .get(path)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(path.to_string()))
    }

    async fn put_content(
        &self,
        path: &str,
        content: &[u8],
        expected_content_id: Option<&str>,
    ) -> Result<RemoteObjectMetadata> {
        let path = normalize(path);
        if path.is_empty() {
            return Err(SyncError::InvalidInput("empty remote path".to_string()));
        }

        let mut files = self.lock();

        if is_dir(&files, path) {
            return Err(SyncError::conflict(path, "a directory exists at this path"));
        }
        let mut parent = path;
        while let Some((head, _)) = parent.rsplit_once('/') {
            if files.contains_key(head) {
                return Err(SyncError::conflict(path, format!("{} is a file", head)));
            }
            parent = head;
        }

        match (files.get(path), expected_content_id) {
            (Some(current), Some(expected)) if digest(current) != expected => {
                return Err(SyncError::conflict(path, "content id does not match"));
            }
            (Some(_), None) => {
                return Err(SyncError::conflict(path, "content id was not supplied"));
            }
            (None, Some(_)) => {
                return Err(SyncError::conflict(path, "object does not exist"));
            }
            _ => {}
        }

        files.insert(path.to_string(), content.to_vec());
        Ok(file_metadata(path, content))
    }

    async fn list(&self, dir: &str) -> Result<Vec<RemoteObjectMetadata>> {
        let dir = normalize(dir);
        let files = self.lock();

        if let Some(content) = files.get(dir) {
            return Ok(vec![file_metadata(dir, content)]);
        }

        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{}/", dir)
        };

        let mut children: BTreeMap<String, RemoteObjectMetadata> = BTreeMap::new();
        for (key, content) in files.range(prefix.clone()..) {
            let Some(rest) = key.strip_prefix(&prefix) else {
                break;
            };
            match rest.split_once('/') {
                Some((child, _)) => {
                    let child_path = format!("{}{}", prefix, child);
                    children
                        .entry(child.to_string())
                        .or_insert_with(|| dir_metadata(&child_path));
                }
                None => {
                    children.insert(rest.to_string(), file_metadata(key, content));
                }
            }
        }

        if children.is_empty() && !dir.is_empty() {
            return Err(SyncError::NotFound(dir.to_string()));
        }
        Ok(children.into_values().collect())
    }
}
