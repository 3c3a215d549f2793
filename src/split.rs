//! Split a file into ordered chunk artifacts plus a digest manifest.

use log::{debug, info, warn};
use std::fs::{self, File};
use std::io;
use std::path::Path;

use crate::engine::hashing::digest_hex;
use crate::engine::pool::WorkerPool;
use crate::engine::progress::{chunk_progress, finish_progress_bar};
use crate::engine::tools::{part_name, read_full, remove_if_exists};
use crate::error::{ChunkError, Result};
use crate::manifest::Manifest;
use crate::types::{Chunk, SplitOpts, SplitSummary};
use crate::utils::config::{MANIFEST_FILENAME, WorkerLimits};

/// Split `source` into `part_<i>` files under `dest_dir` and write `hashes.sha256` last.
///
/// The source is read sequentially on the dispatcher thread; each chunk's write and digest run
/// on the worker pool. On any failure the chunk artifacts dispatched by this call are removed
/// and no manifest is left behind.
pub fn split_file(source: &Path, dest_dir: &Path, opts: &SplitOpts) -> Result<SplitSummary> {
    let part_size = opts.part_size();
    let mut input = File::open(source).map_err(|e| ChunkError::io("open", source, e))?;
    let total_bytes = input
        .metadata()
        .map_err(|e| ChunkError::io("stat", source, e))?
        .len();
    let count = usize::try_from(part_size.chunk_count(total_bytes))
        .map_err(|_| ChunkError::SizeOverflow { size: total_bytes })?;
    let buffer_len = usize::try_from(part_size.get().min(total_bytes))
        .map_err(|_| ChunkError::SizeOverflow { size: total_bytes })?;

    fs::create_dir_all(dest_dir).map_err(|e| ChunkError::io("create directory", dest_dir, e))?;

    let (bar, hook) = chunk_progress(opts.verbose, count, "Splitting");
    let workers = WorkerLimits::current().resolve(opts.num_workers);
    let pool = WorkerPool::new(workers).with_progress(hook);
    debug!(
        "Splitting {} ({} bytes) into {} chunks of {} bytes, {} workers",
        source.display(),
        total_bytes,
        count,
        part_size.get(),
        pool.limit()
    );

    // Reused across reads; each chunk gets its own copy before dispatch.
    let mut buffer = vec![0u8; buffer_len];
    let mut dispatched = 0_usize;
    let outcome = pool.dispatch(count, &opts.cancel, |order| {
        let n = read_full(&mut input, &mut buffer).map_err(|e| ChunkError::io("read", source, e))?;
        if n == 0 {
            return Err(ChunkError::io(
                "read",
                source,
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("source ended before chunk {order}"),
                ),
            ));
        }
        let chunk = Chunk::new(order, buffer[..n].to_vec());
        dispatched = order + 1;
        Ok(move || write_chunk(dest_dir, chunk))
    });
    finish_progress_bar(bar);

    let manifest_path = dest_dir.join(MANIFEST_FILENAME);
    let written = outcome.and_then(|entries| {
        let manifest: Manifest = entries.into_iter().collect();
        manifest.write_atomic(&manifest_path)
    });
    if let Err(err) = written {
        remove_partial_chunks(dest_dir, dispatched);
        if dispatched > 0 {
            remove_stale_manifest(&manifest_path);
        }
        return Err(err);
    }

    info!(
        "Split {} into {} chunks; digests written to {}",
        source.display(),
        count,
        manifest_path.display()
    );
    Ok(SplitSummary {
        chunk_count: count,
        total_bytes,
        part_size,
        manifest_path,
    })
}

/// Worker unit: persist one chunk and return its manifest entry.
fn write_chunk(dest_dir: &Path, chunk: Chunk) -> Result<(String, String)> {
    let path = dest_dir.join(&chunk.name);
    fs::write(&path, &chunk.bytes).map_err(|e| ChunkError::io("write chunk", &path, e))?;
    let digest = digest_hex(&chunk.bytes);
    debug!("{} ({} bytes) {}", chunk.name, chunk.bytes.len(), digest);
    Ok((chunk.name, digest))
}

/// Best-effort removal of `part_0..part_<dispatched>` after a failed split.
fn remove_partial_chunks(dest_dir: &Path, dispatched: usize) {
    let mut failed = 0_usize;
    for order in 0..dispatched {
        let path = dest_dir.join(part_name(order));
        if let Err(e) = remove_if_exists(&path) {
            warn!("Could not remove partial chunk {}: {}", path.display(), e);
            failed += 1;
        }
    }
    debug!(
        "Split failed; removed {} of {} dispatched chunks",
        dispatched - failed,
        dispatched
    );
}

/// A manifest from an earlier split no longer matches chunks this call overwrote or removed.
fn remove_stale_manifest(manifest_path: &Path) {
    if let Err(e) = remove_if_exists(manifest_path) {
        warn!(
            "Could not remove stale manifest {}: {}",
            manifest_path.display(),
            e
        );
    }
}
