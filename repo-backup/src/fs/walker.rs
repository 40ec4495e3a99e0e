//! Best-effort directory traversal producing backup file descriptors.
//!
//! Unreadable subtrees are logged and skipped; a walk never fails as a whole.

use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// Entry names skipped at any depth unless the caller overrides them.
pub const DEFAULT_EXCLUDES: &[&str] = &[".git", "node_modules", ".DS_Store"];

/// Options for directory walking. Symlinked directories are never descended.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Entry names excluded by exact match, files and directories alike
    pub exclude_names: Vec<String>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self::with_excludes(DEFAULT_EXCLUDES.iter().map(|name| name.to_string()).collect())
    }
}

impl WalkOptions {
    pub fn with_excludes(exclude_names: Vec<String>) -> Self {
        Self { exclude_names }
    }
}

/// A regular file discovered on local disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Full path to the file
    pub absolute_path: PathBuf,

    /// Path from the traversal root, always `/`-separated
    pub relative_path: String,

    /// Final path component
    pub name: String,

    /// File size in bytes
    pub size: u64,
}

impl FileDescriptor {
    /// Create a descriptor from a DirEntry.
    /// Symlinks are resolved to their target; links to directories and broken
    /// links yield `None`.
    fn from_entry(entry: &DirEntry, root: &Path) -> std::io::Result<Option<Self>> {
        let raw_metadata = entry.metadata()?;
        let path = entry.path().to_path_buf();

        let size = if raw_metadata.is_symlink() {
            match std::fs::metadata(&path) {
                Ok(resolved) if resolved.is_file() => resolved.len(),
                _ => return Ok(None),
            }
        } else if raw_metadata.is_file() {
            raw_metadata.len()
        } else {
            return Ok(None);
        };

        Ok(Some(Self {
            relative_path: relative_slash_path(&path, root),
            name: entry.file_name().to_string_lossy().into_owned(),
            absolute_path: path,
            size,
        }))
    }
}

/// Join the components of `path` below `root` with forward slashes.
fn relative_slash_path(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Walk a directory tree and collect every regular file
///
/// # Example
/// ```no_run
/// use repo_backup::fs::walker::{enumerate, WalkOptions};
/// use std::path::Path;
///
/// let files = enumerate(Path::new("/data"), &WalkOptions::default());
/// println!("Found {} files", files.len());
/// ```
pub fn enumerate(root: &Path, options: &WalkOptions) -> Vec<FileDescriptor> {
    let mut files = Vec::new();

    let entries = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !should_exclude(entry, &options.exclude_names));

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let location = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| root.display().to_string());
                warn!("Skipping unreadable entry {}: {}", location, e);
                continue;
            }
        };

        if entry.file_type().is_dir() {
            continue;
        }

        match FileDescriptor::from_entry(&entry, root) {
            Ok(Some(file)) => files.push(file),
            Ok(None) => {}
            Err(e) => warn!("Skipping {}: {}", entry.path().display(), e),
        }
    }

    files
}

fn should_exclude(entry: &DirEntry, names: &[String]) -> bool {
    let file_name = entry.file_name().to_string_lossy();
    names.iter().any(|name| *name == file_name)
}
