//! Atomic whole-file writes
//!
//! Content is written to a temporary file in the destination directory,
//! flushed to disk, then renamed over the destination. Readers observe either
//! the previous file or the complete new one, never a truncated file. If the
//! write fails at any point the temporary file is removed when the
//! `NamedTempFile` guard drops and the destination is left untouched.

use crate::{Error, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically replace `path` with `contents`
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    write_atomic_with(path, |writer| writer.write_all(contents))
}

/// Atomically replace `path` with whatever `fill` writes
///
/// The parent directory is created if it does not exist.
pub fn write_atomic_with<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    std::fs::create_dir_all(&parent)?;

    let mut temp = NamedTempFile::new_in(&parent)?;
    {
        let mut writer = std::io::BufWriter::new(temp.as_file_mut());
        fill(&mut writer)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;

    temp.persist(path).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.error.kind(),
            format!("rename into {} failed: {}", path.display(), e.error),
        ))
    })?;

    tracing::debug!(path = %path.display(), "Atomic write complete");
    Ok(())
}
