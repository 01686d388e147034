//! Removal of consumed frames.

use std::{fs, path::PathBuf, sync::Arc};

use crate::{
    error::ReelError,
    progress::{OperationType, ProgressCallback, ProgressTracker},
};

/// Delete every path in `paths`, in order.
///
/// Stops at the first failure. Returns the number of files removed.
///
/// # Errors
///
/// Returns [`ReelError::Cleanup`] naming the file that could not be removed.
pub fn remove_frames(
    paths: &[PathBuf],
    progress: Arc<dyn ProgressCallback>,
) -> Result<usize, ReelError> {
    log::info!("Removing {} consumed frame(s)", paths.len());

    let mut tracker = ProgressTracker::new(progress, OperationType::Cleanup, Some(paths.len() as u64));
    for path in paths {
        fs::remove_file(path).map_err(|source| ReelError::Cleanup {
            path: path.clone(),
            source,
        })?;
        tracker.advance();
    }
    Ok(paths.len())
}
