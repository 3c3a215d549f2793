//! Application configuration constants.
//! Tuning, file names and size limits in one place.

use std::sync::OnceLock;

use crate::utils::fd_limit::max_workers_by_fd_limit;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    config_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                config_filename: format!(".{pkg}.toml"),
            }
        })
    }

    /// Optional settings file looked up in the working directory (CLI only).
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }
}

// ---- Chunk artifacts ----

/// Prefix of every chunk artifact; the order index follows in base 10, unpadded.
pub const CHUNK_PREFIX: &str = "part_";

/// Digest manifest written next to the chunks.
pub const MANIFEST_FILENAME: &str = "hashes.sha256";

/// Separator between digest and chunk name on a manifest line.
pub const MANIFEST_SEPARATOR: &str = "  ";

/// Suffix for files written first and renamed into place.
pub const TEMP_SUFFIX: &str = ".tmp";

// ---- Part size ----

/// Chunk size limits applied by [`PartSize::clamped`](crate::types::PartSize::clamped).
pub struct PartSizeLimits;

impl PartSizeLimits {
    /// Minimum (and default) part size: 1 MiB.
    pub const DEFAULT_MIN: u64 = 1 << 20;
}

// ---- Worker threads ----

/// Concurrency limit for the chunk worker pool.
/// Use [`WorkerLimits::current()`] to fill `all_threads` from rayon.
#[derive(Clone, Copy, Debug)]
pub struct WorkerLimits {
    /// Available threads (from rayon); set by [`WorkerLimits::current()`].
    pub all_threads: usize,
    /// Never go below this many units in flight.
    pub floor: usize,
}

impl Default for WorkerLimits {
    fn default() -> Self {
        Self {
            all_threads: 0, // use current() to set from rayon
            floor: Self::FLOOR_THREADS,
        }
    }
}

impl WorkerLimits {
    pub const FLOOR_THREADS: usize = 1;

    /// Build limits with `all_threads` set from `rayon::current_num_threads()`.
    pub fn current() -> Self {
        Self {
            all_threads: rayon::current_num_threads(),
            ..Self::default()
        }
    }

    /// Effective pool size: `requested` or all threads, capped by the FD limit, at least `floor`.
    pub fn resolve(&self, requested: Option<usize>) -> usize {
        let wanted = requested.unwrap_or(self.all_threads);
        let capped = match max_workers_by_fd_limit() {
            Some(fd_cap) if fd_cap < wanted => {
                log::debug!("Capping workers {} -> {} (open file limit)", wanted, fd_cap);
                fd_cap
            }
            _ => wanted,
        };
        capped.max(self.floor)
    }
}

// ---- Hashing ----

/// Hashing I/O thresholds and buffer sizes.
pub struct HashingConsts;

impl HashingConsts {
    /// File size above which whole-file hashing uses memory-mapped I/O (bytes). 100 MB.
    pub const HASH_MMAP_THRESHOLD: u64 = 100 * 1024 * 1024;
    /// Chunk size for reading files below mmap threshold (bytes). 1 MB.
    pub const HASH_READ_CHUNK_SIZE: usize = 1024 * 1024;
    /// Length of a hex-encoded SHA-256 digest.
    pub const HEX_DIGEST_LEN: usize = 64;
}
