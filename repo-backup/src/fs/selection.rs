//! Turning picked paths into backup inputs.

use super::walker::{enumerate, FileDescriptor, WalkOptions};
use crate::utils::{Result, SyncError};
use std::path::{Path, PathBuf};

/// A folder picked for backup together with everything enumerated under it.
#[derive(Debug, Clone)]
pub struct FolderSelection {
    pub path: PathBuf,
    pub name: String,
    pub files: Vec<FileDescriptor>,
}

impl FolderSelection {
    /// Enumerate `path` into a selection.
    ///
    /// The path is canonicalized first so `.` and `..` get a real folder name.
    pub fn from_dir(path: &Path, options: &WalkOptions) -> Result<Self> {
        let canonical = std::fs::canonicalize(path).map_err(|e| picked_path_error(path, e))?;
        let path = canonical.as_path();
        let metadata =
            std::fs::metadata(path).map_err(|e| SyncError::local_io(path, e))?;
        if !metadata.is_dir() {
            return Err(SyncError::InvalidInput(format!(
                "{} is not a directory",
                path.display()
            )));
        }

        Ok(Self {
            name: file_name(path)?,
            files: enumerate(path, options),
            path: path.to_path_buf(),
        })
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// Stat each picked file into a descriptor whose relative path is its name.
pub fn select_files<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<FileDescriptor>> {
    paths
        .iter()
        .map(|path| {
            let path = path.as_ref();
            let metadata = std::fs::metadata(path).map_err(|e| picked_path_error(path, e))?;
            if !metadata.is_file() {
                return Err(SyncError::InvalidInput(format!(
                    "{} is not a regular file",
                    path.display()
                )));
            }
            let name = file_name(path)?;
            Ok(FileDescriptor {
                absolute_path: path.to_path_buf(),
                relative_path: name.clone(),
                name,
                size: metadata.len(),
            })
        })
        .collect()
}

pub fn select_folders<P: AsRef<Path>>(
    paths: &[P],
    options: &WalkOptions,
) -> Result<Vec<FolderSelection>> {
    paths
        .iter()
        .map(|path| FolderSelection::from_dir(path.as_ref(), options))
        .collect()
}

/// A picked path that does not exist is bad input; anything else is I/O.
fn picked_path_error(path: &Path, error: std::io::Error) -> SyncError {
    if error.kind() == std::io::ErrorKind::NotFound {
        SyncError::InvalidInput(format!("{} does not exist", path.display()))
    } else {
        SyncError::local_io(path, error)
    }
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| SyncError::InvalidInput(format!("{} has no file name", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_select_files() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let report = temp_dir.path().join("report.pdf");
        fs::write(&report, vec![0u8; 1500])?;

        let files = select_files(&[&report]).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "report.pdf");
        assert_eq!(files[0].relative_path, "report.pdf");
        assert_eq!(files[0].size, 1500);
        Ok(())
    }

    #[test]
    fn test_select_missing_file() {
        let err = select_files(&["/nonexistent_path_12345/a.txt"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = select_folders(&["/nonexistent_path_12345"], &WalkOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_select_directory_as_file() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let err = select_files(&[temp_dir.path()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        Ok(())
    }

    #[test]
    fn test_select_folders() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let notes = temp_dir.path().join("notes");
        fs::create_dir_all(notes.join("sub"))?;
        fs::write(notes.join("a.txt"), b"aaa")?;
        fs::write(notes.join("sub/b.txt"), b"bb")?;

        let folders = select_folders(&[&notes], &WalkOptions::default()).unwrap();
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].name, "notes");
        assert_eq!(folders[0].file_count(), 2);
        assert_eq!(folders[0].total_size(), 5);
        Ok(())
    }

    #[test]
    fn test_select_dot_segments_use_real_folder_name() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let notes = temp_dir.path().join("notes");
        fs::create_dir_all(notes.join("sub"))?;
        fs::write(notes.join("a.txt"), b"aaa")?;

        let via_dot = select_folders(&[notes.join(".")], &WalkOptions::default()).unwrap();
        assert_eq!(via_dot[0].name, "notes");
        assert_eq!(via_dot[0].file_count(), 1);

        let via_parent = select_folders(&[notes.join("sub/..")], &WalkOptions::default()).unwrap();
        assert_eq!(via_parent[0].name, "notes");
        Ok(())
    }

    #[test]
    fn test_select_file_as_folder() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let file = temp_dir.path().join("plain.txt");
        fs::write(&file, b"x")?;

        let err = select_folders(&[&file], &WalkOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        Ok(())
    }
}
