//! CLI command handler: split, merge, verify, checksum.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::Path;

use crate::engine::arg_parser::{Cli, Commands};
use crate::engine::cancel::CancelToken;
use crate::engine::hashing::digest_file;
use crate::manifest::ManifestPolicy;
use crate::merge::{merge_chunks, verify_chunks};
use crate::split::split_file;
use crate::types::{MergeOpts, SplitOpts};
use crate::utils::config::PartSizeLimits;
use crate::utils::{RunSettings, apply_file_to_settings, load_splitmerge_toml, setup_logging};

/// Defaults, then `.splitmerge.toml` in the working directory, then CLI flags.
fn resolve_settings(cli: &Cli) -> RunSettings {
    let mut settings = RunSettings::default();
    if let Some(file) = load_splitmerge_toml(Path::new(".")) {
        apply_file_to_settings(&file, &mut settings);
    }
    if let Some(v) = cli.verbose {
        settings.verbose = v;
    }
    if cli.jobs.is_some() {
        settings.jobs = cli.jobs;
    }
    if let Some(v) = cli.lenient_manifest {
        settings.lenient_manifest = v;
    }
    settings
}

fn merge_opts(settings: &RunSettings, cancel: &CancelToken) -> MergeOpts {
    MergeOpts {
        num_workers: settings.jobs,
        manifest_policy: if settings.lenient_manifest {
            ManifestPolicy::Lenient
        } else {
            ManifestPolicy::Strict
        },
        keep_chunks: settings.keep_chunks,
        verbose: settings.verbose,
        cancel: cancel.clone(),
    }
}

/// Run the selected subcommand. Any error bubbles up to `main`, which exits non-zero.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let mut settings = resolve_settings(cli);
    setup_logging(settings.verbose);
    debug!("{} SETTINGS:{:#?}", env!("CARGO_PKG_NAME").to_uppercase(), settings);

    let cancel = CancelToken::new();
    cancel.install_ctrlc_handler()?;

    match &cli.command {
        Commands::Split {
            input,
            output_dir,
            chunk_size,
        } => {
            let opts = SplitOpts {
                part_size: chunk_size
                    .or(settings.chunk_size)
                    .unwrap_or(PartSizeLimits::DEFAULT_MIN),
                min_part_size: PartSizeLimits::DEFAULT_MIN,
                num_workers: settings.jobs,
                verbose: settings.verbose,
                cancel,
            };
            if opts.part_size().get() != opts.part_size {
                warn!(
                    "Chunk size {} is below the minimum; using {} bytes",
                    opts.part_size,
                    opts.part_size().get()
                );
            }
            let summary = split_file(input, output_dir, &opts)
                .with_context(|| format!("split {} failed", input.display()))?;
            debug!("{:?}", summary);
        }
        Commands::Merge {
            chunk_dir,
            output_file,
            keep,
        } => {
            if let Some(v) = keep {
                settings.keep_chunks = *v;
            }
            let opts = merge_opts(&settings, &cancel);
            let summary = merge_chunks(chunk_dir, output_file, &opts)
                .with_context(|| format!("merge {} failed", chunk_dir.display()))?;
            if summary.cleanup_failures > 0 {
                warn!(
                    "Merge succeeded but {} chunk artifacts could not be deleted",
                    summary.cleanup_failures
                );
            } else if !opts.keep_chunks {
                info!("Chunks and manifest removed from {}", chunk_dir.display());
            }
        }
        Commands::Verify { chunk_dir } => {
            let opts = merge_opts(&settings, &cancel);
            let summary = verify_chunks(chunk_dir, &opts)
                .with_context(|| format!("verify {} failed", chunk_dir.display()))?;
            debug!("{:?}", summary);
        }
        Commands::Checksum { file } => {
            let digest = digest_file(file).with_context(|| format!("checksum {}", file.display()))?;
            println!("{}  {}", digest, file.display());
        }
    }
    Ok(())
}
