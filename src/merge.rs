//! Verify chunk artifacts against the manifest and reassemble them in order.

use log::{debug, info, warn};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::engine::hashing::{digest_hex, digest_matches};
use crate::engine::pool::WorkerPool;
use crate::engine::progress::{chunk_progress, finish_progress_bar};
use crate::engine::tools::{discover_chunks, part_name};
use crate::error::{ChunkError, Result};
use crate::manifest::Manifest;
use crate::types::{MergeOpts, MergeSummary, VerifySummary};
use crate::utils::config::{MANIFEST_FILENAME, WorkerLimits};
use crate::utils::tempfiles::write_atomic;

/// Chunk artifacts found in a directory, checked against its manifest.
struct ChunkSet {
    manifest: Manifest,
    manifest_path: PathBuf,
    /// Artifact names in order; `names[i]` is chunk `i`.
    names: Vec<String>,
}

/// Reassemble the chunks in `chunk_dir` into `output`, verifying every digest first.
///
/// Nothing is written unless every chunk verifies; `output` appears via temp file + rename.
/// Afterwards the chunks and manifest are deleted (unless `keep_chunks`); deletion failures are
/// logged and counted but do not fail the merge.
pub fn merge_chunks(chunk_dir: &Path, output: &Path, opts: &MergeOpts) -> Result<MergeSummary> {
    let set = load_chunk_set(chunk_dir, opts)?;
    let chunks = verify_all(chunk_dir, &set, opts, "Merging", |bytes| bytes)?;
    let total_bytes: u64 = chunks.iter().map(|c| c.len() as u64).sum();

    write_atomic(output, |w| {
        for data in &chunks {
            w.write_all(data)?;
        }
        Ok(())
    })?;
    info!(
        "Merged and verified {} chunks into {}",
        chunks.len(),
        output.display()
    );

    let cleanup_failures = if opts.keep_chunks {
        debug!("Keeping chunks in {}", chunk_dir.display());
        0
    } else {
        remove_chunk_set(chunk_dir, &set)
    };

    Ok(MergeSummary {
        chunk_count: chunks.len(),
        total_bytes,
        output_path: output.to_path_buf(),
        cleanup_failures,
    })
}

/// Check every chunk in `chunk_dir` against the manifest without writing or deleting anything.
pub fn verify_chunks(chunk_dir: &Path, opts: &MergeOpts) -> Result<VerifySummary> {
    let set = load_chunk_set(chunk_dir, opts)?;
    let lengths = verify_all(chunk_dir, &set, opts, "Verifying", |bytes| bytes.len() as u64)?;
    info!("All {} chunks in {} verified", lengths.len(), chunk_dir.display());
    Ok(VerifySummary {
        chunk_count: lengths.len(),
        total_bytes: lengths.iter().sum(),
    })
}

/// Parse the manifest, discover `part_<n>` files in numeric order, and check the two agree on
/// which chunks exist: indices must run `0..n` with no gap and every manifest entry needs a file.
fn load_chunk_set(chunk_dir: &Path, opts: &MergeOpts) -> Result<ChunkSet> {
    let manifest_path = chunk_dir.join(MANIFEST_FILENAME);
    let manifest = Manifest::read(&manifest_path, opts.manifest_policy)?;
    let discovered = discover_chunks(chunk_dir)?;

    let mut names = Vec::with_capacity(discovered.len());
    for (expected, (order, name)) in discovered.into_iter().enumerate() {
        if order != expected {
            return Err(ChunkError::MissingChunk {
                name: part_name(expected),
            });
        }
        names.push(name);
    }

    let present: HashSet<&str> = names.iter().map(String::as_str).collect();
    if let Some((name, _)) = manifest
        .entries()
        .into_iter()
        .find(|(name, _)| !present.contains(name))
    {
        return Err(ChunkError::MissingChunk {
            name: name.to_string(),
        });
    }

    debug!(
        "{} chunks discovered, {} manifest entries",
        names.len(),
        manifest.len()
    );
    Ok(ChunkSet {
        manifest,
        manifest_path,
        names,
    })
}

/// Read and verify every chunk on the pool; `keep` turns verified bytes into the payload.
fn verify_all<T, K>(
    chunk_dir: &Path,
    set: &ChunkSet,
    opts: &MergeOpts,
    desc: &'static str,
    keep: K,
) -> Result<Vec<T>>
where
    T: Send,
    K: Fn(Vec<u8>) -> T + Sync,
{
    let count = set.names.len();
    let (bar, hook) = chunk_progress(opts.verbose, count, desc);
    let workers = WorkerLimits::current().resolve(opts.num_workers);
    let pool = WorkerPool::new(workers).with_progress(hook);
    let keep = &keep;

    let outcome = pool.dispatch(count, &opts.cancel, |order| {
        let name = set.names[order].as_str();
        let expected = set.manifest.get(name);
        Ok(move || read_verified(chunk_dir, name, expected).map(keep))
    });
    finish_progress_bar(bar);
    outcome
}

/// Worker unit: read one chunk and compare its digest with the manifest's.
fn read_verified(chunk_dir: &Path, name: &str, expected: Option<&str>) -> Result<Vec<u8>> {
    let path = chunk_dir.join(name);
    let data = fs::read(&path).map_err(|e| ChunkError::io("read chunk", &path, e))?;
    let expected = expected.ok_or_else(|| ChunkError::MissingDigest {
        name: name.to_string(),
    })?;
    let actual = digest_hex(&data);
    if !digest_matches(expected, &actual) {
        return Err(ChunkError::DigestMismatch {
            name: name.to_string(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(data)
}

/// Delete every chunk artifact, then the manifest. Returns how many deletions failed.
fn remove_chunk_set(chunk_dir: &Path, set: &ChunkSet) -> usize {
    let mut failures = 0_usize;
    for name in &set.names {
        let path = chunk_dir.join(name);
        if let Err(e) = fs::remove_file(&path) {
            warn!("Could not delete chunk {}: {}", path.display(), e);
            failures += 1;
        }
    }
    if let Err(e) = fs::remove_file(&set.manifest_path) {
        warn!(
            "Could not delete manifest {}: {}",
            set.manifest_path.display(),
            e
        );
        failures += 1;
    }
    if failures == 0 {
        debug!(
            "Removed {} chunks and {}",
            set.names.len(),
            set.manifest_path.display()
        );
    }
    failures
}
