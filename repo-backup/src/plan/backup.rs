//! Local selection → remote destinations.

use super::{TransferPlan, TransferUnit, DEFAULT_PREFIX};
use crate::fs::{FileDescriptor, FolderSelection};
use crate::utils::{Result, SyncError};

/// Normalise a destination prefix into `""` (repository root) or `dir/`.
///
/// An empty prefix selects [`DEFAULT_PREFIX`]; a prefix of only slashes is the root.
pub fn normalize_prefix(prefix: &str) -> String {
    let prefix = prefix.trim();
    if prefix.is_empty() {
        return DEFAULT_PREFIX.to_string();
    }
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

/// Map individual files and folder selections under `prefix`.
///
/// Individual files come first, then each folder's files in enumeration
/// order. Folder structure is kept below `prefix/<folder name>/`. Units that
/// land on the same destination are all kept; the later one wins on execution.
pub fn build_plan(
    files: &[FileDescriptor],
    folders: &[FolderSelection],
    prefix: &str,
) -> Result<TransferPlan> {
    if files.is_empty() && folders.is_empty() {
        return Err(SyncError::InvalidInput(
            "select at least one file or folder to back up".to_string(),
        ));
    }

    let prefix = normalize_prefix(prefix);
    let folder_files: usize = folders.iter().map(|f| f.file_count()).sum();
    let mut units = Vec::with_capacity(files.len() + folder_files);

    for file in files {
        units.push(TransferUnit {
            source: file.absolute_path.to_string_lossy().into_owned(),
            destination: format!("{}{}", prefix, file.name),
            display_name: file.name.clone(),
            local_path: file.absolute_path.clone(),
        });
    }

    for folder in folders {
        for file in &folder.files {
            let display_name = format!("{}/{}", folder.name, file.relative_path);
            units.push(TransferUnit {
                source: file.absolute_path.to_string_lossy().into_owned(),
                destination: format!("{}{}", prefix, display_name),
                display_name,
                local_path: file.absolute_path.clone(),
            });
        }
    }

    Ok(units.into())
}
