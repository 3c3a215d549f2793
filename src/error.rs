//! Error type for split, merge and verify.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("digest mismatch for {name}: expected {expected}, got {actual}")]
    DigestMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("no manifest digest for chunk {name}")]
    MissingDigest { name: String },

    #[error("chunk {name} is missing from the chunk directory")]
    MissingChunk { name: String },

    #[error("manifest line {line} is malformed: {reason}")]
    ManifestCorrupt { line: usize, reason: String },

    #[error("chunk {order} failed: {source}")]
    Worker {
        order: usize,
        #[source]
        source: Box<ChunkError>,
    },

    #[error("worker for chunk {order} panicked")]
    WorkerPanicked { order: usize },

    #[error("failed to spawn a pool thread: {source}")]
    Spawn {
        #[source]
        source: io::Error,
    },

    #[error("no result recorded for chunk {order}")]
    MissingResult { order: usize },

    #[error("operation cancelled")]
    Cancelled,

    #[error("file size {size} cannot be addressed in chunks on this platform")]
    SizeOverflow { size: u64 },
}

pub type Result<T> = std::result::Result<T, ChunkError>;

impl ChunkError {
    /// Attach the failed action and path to an I/O error.
    pub fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
        ChunkError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Innermost error, looking through [`ChunkError::Worker`] wrappers.
    pub fn root(&self) -> &ChunkError {
        match self {
            ChunkError::Worker { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), ChunkError::Cancelled)
    }

    /// True when a chunk failed digest verification or had nothing to verify against.
    pub fn is_verification(&self) -> bool {
        matches!(
            self.root(),
            ChunkError::DigestMismatch { .. } | ChunkError::MissingDigest { .. }
        )
    }
}
