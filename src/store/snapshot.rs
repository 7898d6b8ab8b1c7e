//! Flat-file snapshot plumbing shared by the stores.
//!
//! Every store persists by rewriting its whole snapshot. Writes land in a
//! `<path>.new` sibling first and are renamed over the target, so a crash
//! mid-write leaves the previous snapshot intact.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Read a snapshot file, treating a missing file as "no snapshot yet".
pub async fn read_to_string_opt(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => {
            Err(err).with_context(|| format!("failed to read snapshot {}", path.display()))
        }
    }
}

/// Create the snapshot's parent directory if it is missing.
///
/// Stores call this once at load time, so later writes only touch files.
pub async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    Ok(())
}

/// Replace the snapshot at `path` with `contents`.
///
/// The rename is atomic on the filesystems we target, so a reader never
/// observes a half-written file. The parent directory must already exist;
/// [`ensure_parent`] handles that at load time.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let staging = staging_path(path);
    tokio::fs::write(&staging, contents)
        .await
        .with_context(|| format!("failed to write {}", staging.display()))?;
    tokio::fs::rename(&staging, path)
        .await
        .with_context(|| format!("failed to move {} into place", staging.display()))?;

    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".new");
    PathBuf::from(name)
}
