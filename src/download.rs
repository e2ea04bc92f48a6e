//! Saving artifacts to disk.
//!
//! Bytes are first materialized in a transient temp file next to the
//! destination, then persisted under the suggested name. The transient
//! handle is dropped on every path, so nothing lingers between downloads.

use crate::error::SessionError;
use crate::models::Artifact;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Write `artifact` into `dir` as `suggested_name` and return the final path.
pub fn save_artifact(
    artifact: &Artifact,
    dir: &Path,
    suggested_name: &str,
) -> Result<PathBuf, SessionError> {
    validate_name(suggested_name)?;

    std::fs::create_dir_all(dir)?;
    let destination = dir.join(suggested_name);

    let mut transient = NamedTempFile::new_in(dir)?;
    debug!(
        "Staging {} bytes of {} at {}",
        artifact.len(),
        artifact.media_type,
        transient.path().display()
    );

    transient.write_all(&artifact.bytes)?;
    transient.flush()?;

    // On failure the error owns the temp file and deletes it when dropped.
    transient
        .persist(&destination)
        .map_err(|e| SessionError::Io(e.error))?;

    info!("Saved {} to {}", artifact.kind, destination.display());
    Ok(destination)
}

/// Only bare file names are accepted.
fn validate_name(name: &str) -> Result<(), SessionError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\');

    if invalid {
        return Err(SessionError::InvalidArtifactName(name.to_string()));
    }
    Ok(())
}
