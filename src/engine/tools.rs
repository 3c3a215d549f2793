//! Chunk naming, directory discovery and small file helpers

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use crate::error::{ChunkError, Result};
use crate::utils::config::CHUNK_PREFIX;

/// Artifact name for chunk `order`: `part_<order>`, base 10, no padding.
pub fn part_name(order: usize) -> String {
    format!("{CHUNK_PREFIX}{order}")
}

/// Order index encoded in a chunk artifact name, or `None` if `name` is not one.
pub fn parse_part_index(name: &str) -> Option<usize> {
    let digits = name.strip_prefix(CHUNK_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Names are unpadded; `part_07` is not the artifact for chunk 7.
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    digits.parse().ok()
}

/// List chunk artifacts in `dir` as `(order, name)`, sorted by numeric order (so `part_2` < `part_10`).
pub fn discover_chunks(dir: &Path) -> Result<Vec<(usize, String)>> {
    let entries = fs::read_dir(dir).map_err(|e| ChunkError::io("list", dir, e))?;
    let mut chunks = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ChunkError::io("list", dir, e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !name.starts_with(CHUNK_PREFIX) {
            continue;
        }
        match parse_part_index(name) {
            Some(order) => chunks.push((order, name.to_string())),
            None => log::debug!("Ignoring {} (no numeric chunk index)", name),
        }
    }
    chunks.sort_unstable_by_key(|(order, _)| *order);
    Ok(chunks)
}

/// Read until `buf` is full or EOF. Returns bytes read; fewer than `buf.len()` only at EOF.
pub fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Remove a file, treating "already gone" as success.
pub fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
