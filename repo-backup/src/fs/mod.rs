//! Local filesystem side of a backup: enumeration and selection.

pub mod selection;
pub mod walker;

pub use selection::{select_files, select_folders, FolderSelection};
pub use walker::{enumerate, FileDescriptor, WalkOptions};
