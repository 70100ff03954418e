use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Deletes artifacts left behind by a previous crawl
///
/// Missing files are skipped. A file that cannot be deleted is logged and
/// left in place; cleanup never fails the run.
///
/// # Returns
///
/// The paths that were actually removed
pub fn remove_stale_artifacts<P: AsRef<Path>>(paths: &[P]) -> Vec<PathBuf> {
    tracing::info!("Removing stale artifacts from previous run");
    let mut removed = Vec::new();

    for path in paths {
        let path = path.as_ref();
        match std::fs::remove_file(path) {
            Ok(()) => {
                tracing::info!("Deleted {}", path.display());
                removed.push(path.to_path_buf());
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("{} not found, skipping deletion", path.display());
            }
            Err(e) => {
                tracing::warn!("Could not delete {}: {}", path.display(), e);
            }
        }
    }

    removed
}
