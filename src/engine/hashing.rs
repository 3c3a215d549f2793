//! SHA-256 digests for chunks and whole files

use memmap2::Mmap;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{ChunkError, Result};
use crate::utils::config::HashingConsts;

pub fn digest_bytes(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Lowercase hex SHA-256 of `data`, as stored in the manifest.
pub fn digest_hex(data: &[u8]) -> String {
    hex::encode(digest_bytes(data))
}

/// Hash a whole file. Uses memory-mapped I/O for files above threshold, chunked reading otherwise.
pub fn digest_file(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| ChunkError::io("open", path, e))?;
    let size = file
        .metadata()
        .map_err(|e| ChunkError::io("stat", path, e))?
        .len();
    let mut hasher = Sha256::new();

    if size > HashingConsts::HASH_MMAP_THRESHOLD {
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| ChunkError::io("map", path, e))?;
        hasher.update(&mmap[..]);
    } else {
        let mut reader =
            std::io::BufReader::with_capacity(HashingConsts::HASH_READ_CHUNK_SIZE, file);
        let mut buffer = vec![0u8; HashingConsts::HASH_READ_CHUNK_SIZE];
        loop {
            let n = reader
                .read(&mut buffer)
                .map_err(|e| ChunkError::io("read", path, e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compare an expected manifest digest with a computed one, ignoring hex case.
pub fn digest_matches(expected: &str, actual: &str) -> bool {
    expected.eq_ignore_ascii_case(actual)
}
