//! Remote paths → one flat local directory.

use super::{TransferPlan, TransferUnit};
use crate::remote::basename;
use crate::utils::{Result, SyncError};
use std::path::Path;

/// Map each remote path to `destination/<basename>`.
///
/// Remote directory structure is not reproduced: two remote files with the
/// same name land on the same local path and the later unit wins.
pub fn build_plan<S: AsRef<str>>(remote_paths: &[S], destination: &Path) -> Result<TransferPlan> {
    if remote_paths.is_empty() {
        return Err(SyncError::InvalidInput(
            "select at least one remote file to restore".to_string(),
        ));
    }
    if destination.as_os_str().is_empty() {
        return Err(SyncError::InvalidInput(
            "a local destination directory is required".to_string(),
        ));
    }

    let units = remote_paths
        .iter()
        .map(|remote| {
            let remote = remote.as_ref();
            let name = basename(remote);
            if name.is_empty() {
                return Err(SyncError::InvalidInput(format!(
                    "remote path {:?} has no file name",
                    remote
                )));
            }
            let local_path = destination.join(name);
            Ok(TransferUnit {
                source: remote.to_string(),
                destination: local_path.to_string_lossy().into_owned(),
                display_name: name.to_string(),
                local_path,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(units.into())
}
