//! Engine module: worker pool, hashing, cancellation and CLI plumbing

pub mod arg_parser;
pub mod cancel;
pub mod cli;
pub mod hashing;
pub mod pool;
pub mod progress;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::{Cli, Commands, parse_size};
pub use cancel::CancelToken;
pub use cli::handle_run;
pub use hashing::{digest_bytes, digest_file, digest_hex, digest_matches};
pub use pool::{Record, WorkerPool};
pub use tools::{discover_chunks, parse_part_index, part_name, read_full};
