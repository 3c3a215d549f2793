//! Public and internal types for the splitmerge API and pipelines.

use std::path::PathBuf;

use crate::engine::cancel::CancelToken;
use crate::engine::tools::part_name;
use crate::manifest::ManifestPolicy;
use crate::utils::config::PartSizeLimits;

/// One contiguous segment of the source file.
///
/// `bytes` is an owned copy: the splitter reuses its read buffer, so a dispatched chunk
/// must never borrow from it.
#[derive(Clone, Debug)]
pub struct Chunk {
    pub order: usize,
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Chunk {
    pub fn new(order: usize, bytes: Vec<u8>) -> Self {
        Self {
            order,
            name: part_name(order),
            bytes,
        }
    }
}

/// A validated chunk size in bytes. Always at least 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct PartSize(u64);

impl PartSize {
    /// Clamp `requested` up to `min` (a `min` of 0 counts as 1 byte).
    pub fn clamped(requested: u64, min: u64) -> Self {
        PartSize(requested.max(min).max(1))
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// Number of chunks needed for `file_size` bytes. No trailing empty chunk.
    pub fn chunk_count(self, file_size: u64) -> u64 {
        file_size.div_ceil(self.0)
    }
}

impl Default for PartSize {
    fn default() -> Self {
        PartSize(PartSizeLimits::DEFAULT_MIN)
    }
}

/// Options for [`split_file`](crate::split::split_file).
#[derive(Clone, Debug)]
pub struct SplitOpts {
    /// Requested chunk size in bytes; clamped up to `min_part_size`.
    pub part_size: u64,
    /// Smallest chunk size accepted. Default 1 MiB.
    pub min_part_size: u64,
    /// Pool size override. When None, derived from available parallelism and the FD limit.
    pub num_workers: Option<usize>,
    /// Show a progress bar (CLI).
    pub verbose: bool,
    /// Fired externally to abort the split while units wait for a slot.
    pub cancel: CancelToken,
}

impl Default for SplitOpts {
    fn default() -> Self {
        Self {
            part_size: PartSizeLimits::DEFAULT_MIN,
            min_part_size: PartSizeLimits::DEFAULT_MIN,
            num_workers: None,
            verbose: false,
            cancel: CancelToken::new(),
        }
    }
}

impl SplitOpts {
    /// Effective chunk size after clamping.
    pub fn part_size(&self) -> PartSize {
        PartSize::clamped(self.part_size, self.min_part_size)
    }
}

/// Options for [`merge_chunks`](crate::merge::merge_chunks) and [`verify_chunks`](crate::merge::verify_chunks).
#[derive(Clone, Debug)]
pub struct MergeOpts {
    /// Pool size override. When None, derived from available parallelism and the FD limit.
    pub num_workers: Option<usize>,
    /// How malformed manifest lines are treated. Default strict.
    pub manifest_policy: ManifestPolicy,
    /// Leave chunk artifacts and manifest in place after a successful merge.
    pub keep_chunks: bool,
    /// Show a progress bar (CLI).
    pub verbose: bool,
    /// Fired externally to abort the merge while units wait for a slot.
    pub cancel: CancelToken,
}

impl Default for MergeOpts {
    fn default() -> Self {
        Self {
            num_workers: None,
            manifest_policy: ManifestPolicy::Strict,
            keep_chunks: false,
            verbose: false,
            cancel: CancelToken::new(),
        }
    }
}

/// Returned by a successful split.
#[derive(Clone, Debug)]
pub struct SplitSummary {
    pub chunk_count: usize,
    pub total_bytes: u64,
    pub part_size: PartSize,
    pub manifest_path: PathBuf,
}

/// Returned by a successful merge.
#[derive(Clone, Debug)]
pub struct MergeSummary {
    pub chunk_count: usize,
    pub total_bytes: u64,
    pub output_path: PathBuf,
    /// Chunk artifacts or manifest that could not be deleted afterwards (logged, not fatal).
    pub cleanup_failures: usize,
}

/// Returned by a successful verify.
#[derive(Clone, Debug)]
pub struct VerifySummary {
    pub chunk_count: usize,
    pub total_bytes: u64,
}
