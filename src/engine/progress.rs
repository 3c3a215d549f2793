//! Progress bar utilities for displaying chunk processing status

use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex};

use crate::engine::pool::ProgressHook;

// Progress bar type alias
pub type ProgressBar = Arc<Mutex<Bar>>;

/// Configuration for creating a progress bar
pub struct ProgressBarConfig {
    pub total: usize,
    pub desc: &'static str,
    pub animation: Animation,
}

impl ProgressBarConfig {
    pub fn new(total: usize, desc: &'static str, animation: Animation) -> Self {
        Self {
            total,
            desc,
            animation,
        }
    }
}

/// Create a progress bar with the given configuration
pub fn create_progress_bar(config: ProgressBarConfig) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = config.total,
        desc = config.desc,
        animation = config.animation,
        unit = " chunks"
    )))
}

/// Update progress bar; try_lock so a contended bar never blocks the collector.
pub fn update_progress_bar(pb: &ProgressBar, n: usize) {
    if let Ok(mut pb) = pb.try_lock() {
        let _ = pb.update(n);
    }
}

/// Bar over `total` chunks plus the collector hook feeding it, or `(None, None)` when not verbose.
pub fn chunk_progress(
    verbose: bool,
    total: usize,
    desc: &'static str,
) -> (Option<ProgressBar>, Option<ProgressHook>) {
    if !verbose || total == 0 {
        return (None, None);
    }
    let bar = create_progress_bar(ProgressBarConfig::new(total, desc, Animation::Classic));
    let hook_bar = Arc::clone(&bar);
    let hook: ProgressHook = Box::new(move |n: usize| update_progress_bar(&hook_bar, n));
    (Some(bar), Some(hook))
}

/// Finish the bar line so following log output starts on a fresh line.
pub fn finish_progress_bar(pb: Option<ProgressBar>) {
    if let Some(pb) = pb
        && let Ok(mut bar) = pb.lock()
    {
        let _ = bar.refresh();
        eprintln!();
    }
}
