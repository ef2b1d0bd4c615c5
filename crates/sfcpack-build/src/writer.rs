//! Change-aware output writing.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// What happened to an output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// New content was written
    Written,
    /// The file already held identical content and was left untouched
    Unchanged,
}

/// Write `contents` to `path` unless the file already holds exactly these bytes.
///
/// New content goes to a sibling temporary file first and is renamed into place,
/// so a failed write never leaves a truncated output behind.
pub fn write_if_changed(path: &Path, contents: &str) -> io::Result<WriteOutcome> {
    match fs::read(path) {
        Ok(existing) if existing == contents.as_bytes() => {
            tracing::debug!("Unchanged {}", path.display());
            return Ok(WriteOutcome::Unchanged);
        }
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let temp = temp_path(path);
    fs::write(&temp, contents)?;
    if let Err(e) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(e);
    }

    tracing::info!("Wrote {}", path.display());
    Ok(WriteOutcome::Written)
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}
