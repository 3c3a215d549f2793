//! splitmerge: split large files into SHA-256 verified chunks in parallel and merge them back in order.

pub mod engine;
pub mod error;
pub mod manifest;
pub mod merge;
pub mod split;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use engine::cancel::CancelToken;
pub use error::{ChunkError, Result};
pub use manifest::{Manifest, ManifestPolicy};
pub use merge::{merge_chunks, verify_chunks};
pub use split::split_file;
