//! Whole-file helpers used for save files and embedded resources.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::PersistError;

/// Read a whole file.
pub fn read_file(path: &Path) -> Result<Vec<u8>, PersistError> {
    fs::read(path).map_err(|source| PersistError::io(path, source))
}

/// Write `bytes` to `path` through a sibling `<name>.tmp` file that is
/// renamed over the destination once fully flushed. Readers see either
/// the old contents or the new, never a partial file.
pub fn write_file_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| PersistError::io(parent, source))?;
    }

    let tmp_path = temp_path_for(path);
    if let Err(source) = write_and_sync(&tmp_path, bytes) {
        let _ = fs::remove_file(&tmp_path);
        return Err(PersistError::io(&tmp_path, source));
    }
    if let Err(source) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(PersistError::io(path, source));
    }
    Ok(())
}

fn write_and_sync(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// `<dir>/<name>.tmp` next to `path`.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("save");
    path.with_file_name(format!("{file_name}.tmp"))
}
