pub mod config;
pub mod fd_limit;
pub mod logger;
pub mod splitmerge_toml;
pub mod tempfiles;

pub use config::*;
pub use fd_limit::{
    FDS_PER_WORKER, RESERVED_FDS, max_open_fds, max_workers_by_fd_limit, workers_for_fd_limit,
};
pub use logger::setup_logging;
pub use splitmerge_toml::{
    RunSettings, SplitmergeToml, apply_file_to_settings, load_splitmerge_toml,
    parse_splitmerge_toml,
};
pub use tempfiles::{rename_temp_to_final, temp_path_for, write_atomic};
