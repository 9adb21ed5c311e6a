//! Atomic file writes.
//!
//! Updates are all-or-nothing: data goes to a temporary sibling file, is
//! fsynced, then renamed over the target.

use std::path::{Path, PathBuf};

use murmur_core::error::{MurmurError, Result};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Writes `contents` to `path` via temp file + rename, creating parent
/// directories as needed.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let tmp_path = temp_path(path)?;
    let mut tmp_file = fs::File::create(&tmp_path).await?;
    tmp_file.write_all(contents).await?;
    tmp_file.sync_all().await?;
    drop(tmp_file);

    fs::rename(&tmp_path, path).await?;
    Ok(())
}

/// Reads `path` as UTF-8, returning `None` when it is missing or blank.
pub async fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(content) if content.trim().is_empty() => Ok(None),
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn temp_path(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| MurmurError::io(format!("{} has no file name", path.display())))?;
    let tmp_name = format!(".{}.tmp", file_name.to_string_lossy());
    Ok(path.with_file_name(tmp_name))
}
