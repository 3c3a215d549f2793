//! Cap the worker pool by RLIMIT_NOFILE so chunk units never hit EMFILE (Unix).

/// Descriptors one chunk unit holds while it runs: the chunk file itself.
pub const FDS_PER_WORKER: usize = 1;

/// Held outside the units for the whole run: stdio, the source or output file, the manifest
/// temp file and the directory scan.
pub const RESERVED_FDS: usize = 16;

/// Soft RLIMIT_NOFILE, or `None` when unlimited or unknown.
#[cfg(unix)]
pub fn max_open_fds() -> Option<u64> {
    let mut rlim = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: `rlim` is a valid, writable rlimit for the duration of the call.
    let rc = unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut rlim) };
    if rc != 0 || rlim.rlim_cur == libc::RLIM_INFINITY {
        return None;
    }
    u64::try_from(rlim.rlim_cur).ok()
}

#[cfg(not(unix))]
pub fn max_open_fds() -> Option<u64> {
    None
}

/// Workers that fit in `limit` descriptors after [`RESERVED_FDS`]; never below 1.
pub fn workers_for_fd_limit(limit: u64) -> usize {
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    (limit.saturating_sub(RESERVED_FDS) / FDS_PER_WORKER).max(1)
}

/// Pool cap from the current process limit; `None` means no cap.
pub fn max_workers_by_fd_limit() -> Option<usize> {
    max_open_fds().map(workers_for_fd_limit)
}
