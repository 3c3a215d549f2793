use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Split large files into digest-verified chunks and merge them back.
#[derive(Clone, Parser)]
#[command(name = "splitmerge", version)]
#[command(about = "Split a file into SHA-256 verified chunks, or merge chunks back into one file.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output: debug logs and progress bars.
    #[arg(long, short = 'v', global = true, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,

    /// Max chunks processed concurrently. Default: available parallelism.
    #[arg(long, short = 'j', global = true, value_parser = clap::value_parser!(usize))]
    pub jobs: Option<usize>,

    /// Skip malformed manifest lines instead of failing.
    #[arg(long, global = true, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub lenient_manifest: Option<bool>,
}

#[derive(Clone, Subcommand)]
pub enum Commands {
    /// Split INPUT into part_<n> chunks plus hashes.sha256 under OUTPUT_DIR.
    Split {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        #[arg(value_name = "OUTPUT_DIR")]
        output_dir: PathBuf,
        /// Chunk size in bytes, or with K/M/G suffix (e.g. 30M). Minimum and default 1M.
        #[arg(value_name = "CHUNK_SIZE", value_parser = parse_size)]
        chunk_size: Option<u64>,
    },
    /// Verify the chunks in CHUNK_DIR and merge them into OUTPUT_FILE, then delete them.
    Merge {
        #[arg(value_name = "CHUNK_DIR")]
        chunk_dir: PathBuf,
        #[arg(value_name = "OUTPUT_FILE")]
        output_file: PathBuf,
        /// Keep chunks and manifest after a successful merge.
        #[arg(long, short = 'k', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
        keep: Option<bool>,
    },
    /// Verify the chunks in CHUNK_DIR against hashes.sha256 without merging.
    Verify {
        #[arg(value_name = "CHUNK_DIR")]
        chunk_dir: PathBuf,
    },
    /// Print the SHA-256 of a whole file.
    Checksum {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

/// Parse a byte size: plain digits, or digits followed by K, M or G (binary multiples, optional `B`/`iB`).
pub fn parse_size(s: &str) -> Result<u64, String> {
    let trimmed = s.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, suffix) = trimmed.split_at(split);
    if digits.is_empty() {
        return Err(format!("invalid size {s:?}: expected a number"));
    }
    let value: u64 = digits
        .parse()
        .map_err(|e| format!("invalid size {s:?}: {e}"))?;
    let shift = match suffix.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 0,
        "K" | "KB" | "KIB" => 10,
        "M" | "MB" | "MIB" => 20,
        "G" | "GB" | "GIB" => 30,
        other => return Err(format!("invalid size {s:?}: unknown unit {other:?}")),
    };
    value
        .checked_mul(1_u64 << shift)
        .ok_or_else(|| format!("invalid size {s:?}: too large"))
}
