use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::engine::tools::remove_if_exists;
use crate::error::{ChunkError, Result};
use crate::utils::config::TEMP_SUFFIX;

/// Sibling path used for write-then-rename: `<name>.tmp` in the same directory.
pub fn temp_path_for(final_path: &Path) -> PathBuf {
    let name = final_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    final_path
        .parent()
        .unwrap_or(Path::new("."))
        .join(format!("{name}{TEMP_SUFFIX}"))
}

pub fn rename_temp_to_final(temp_path: &Path, final_path: &Path) -> Result<()> {
    fs::rename(temp_path, final_path)
        .map_err(|e| ChunkError::io("rename temp file into", final_path, e))
}

/// Write `final_path` atomically: `fill` writes into `<final>.tmp`, which is flushed, synced and
/// renamed over `final_path`. On any error the temp file is removed and `final_path` is untouched.
pub fn write_atomic<F>(final_path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let temp_path = temp_path_for(final_path);
    let outcome =
        write_temp(&temp_path, fill).and_then(|()| rename_temp_to_final(&temp_path, final_path));
    if outcome.is_err()
        && let Err(e) = remove_if_exists(&temp_path)
    {
        log::warn!("Could not remove {}: {}", temp_path.display(), e);
    }
    outcome
}

fn write_temp<F>(temp_path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let file = File::create(temp_path).map_err(|e| ChunkError::io("create", temp_path, e))?;
    let mut writer = BufWriter::new(file);
    fill(&mut writer).map_err(|e| ChunkError::io("write", temp_path, e))?;
    writer.flush().map_err(|e| ChunkError::io("flush", temp_path, e))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| ChunkError::io("sync", temp_path, e))?;
    Ok(())
}
