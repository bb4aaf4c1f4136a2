//! # File I/O Module
//!
//! Reading target files and writing them back. Writes go through a temporary
//! file in the same directory that is renamed over the target, so a file is
//! either fully rewritten or left as it was.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::trace;

use crate::tokens::FileInfo;

/// File I/O operations for the replacer.
pub struct FileIO;

/// Content and metadata of a file read from disk.
#[derive(Debug, Clone)]
pub struct LoadedFile {
  pub content: String,
  pub info: Option<FileInfo>,
}

impl FileIO {
  /// Read a whole file as UTF-8 along with its metadata.
  ///
  /// # Parameters
  ///
  /// * `path` - Path to the file to read
  pub async fn read(path: &Path) -> Result<LoadedFile> {
    let bytes = tokio::fs::read(path)
      .await
      .with_context(|| format!("Failed to read file: {}", path.display()))?;
    let content =
      String::from_utf8(bytes).with_context(|| format!("File is not valid UTF-8: {}", path.display()))?;

    let info = tokio::fs::metadata(path)
      .await
      .ok()
      .and_then(|metadata| FileInfo::from_metadata(&metadata));
    let info = match (info, tokio::fs::canonicalize(path).await) {
      (Some(info), Ok(resolved)) => Some(info.with_resolved_path(resolved)),
      (info, Err(err)) => {
        trace!("Could not resolve {}: {}", path.display(), err);
        info
      }
      (None, Ok(_)) => None,
    };

    Ok(LoadedFile { content, info })
  }

  /// Atomically replace the content of a file.
  ///
  /// # Parameters
  ///
  /// * `path` - Path to the file to write
  /// * `content` - Complete new content
  pub async fn write_atomic(path: &Path, content: String) -> Result<()> {
    let target: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_atomic_sync(&target, content.as_bytes()))
      .await
      .with_context(|| format!("Write task for {} failed", path.display()))?
  }
}

/// Blocking implementation of [`FileIO::write_atomic`]. Keeps the target's
/// permissions.
pub fn write_atomic_sync(path: &Path, bytes: &[u8]) -> Result<()> {
  let parent = match path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent,
    _ => Path::new("."),
  };

  let mut tmp = tempfile::Builder::new()
    .prefix(".headerkit-")
    .tempfile_in(parent)
    .with_context(|| format!("Failed to create temporary file in {}", parent.display()))?;

  tmp
    .write_all(bytes)
    .with_context(|| format!("Failed to write temporary file for {}", path.display()))?;
  tmp
    .as_file()
    .sync_all()
    .with_context(|| format!("Failed to sync temporary file for {}", path.display()))?;

  if let Ok(metadata) = std::fs::metadata(path) {
    std::fs::set_permissions(tmp.path(), metadata.permissions())
      .with_context(|| format!("Failed to copy permissions of {}", path.display()))?;
  }

  tmp
    .persist(path)
    .map_err(|err| err.error)
    .with_context(|| format!("Failed to write file: {}", path.display()))?;
  Ok(())
}
