//! splitmerge CLI: split a file into verified chunks, or merge them back.

use anyhow::Result;
use clap::Parser;
use splitmerge::engine::arg_parser::Cli;
use splitmerge::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
