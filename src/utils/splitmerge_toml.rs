//! Load `.splitmerge.toml` from the working directory (CLI only). The library takes everything via opts.

use serde::Deserialize;
use std::path::Path;

use crate::engine::arg_parser::parse_size;
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub struct SplitmergeToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    chunk_size: Option<SizeSetting>,
    jobs: Option<usize>,
    verbose: Option<bool>,
    lenient_manifest: Option<bool>,
    keep_chunks: Option<bool>,
}

/// `chunk_size = 31457280` or `chunk_size = "30M"`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SizeSetting {
    Bytes(u64),
    Text(String),
}

/// Effective CLI settings: defaults, then the file, then flags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSettings {
    pub chunk_size: Option<u64>,
    pub jobs: Option<usize>,
    pub verbose: bool,
    pub lenient_manifest: bool,
    pub keep_chunks: bool,
}

/// Load the settings file from `dir` if present. Returns None if missing or unreadable.
pub fn load_splitmerge_toml(dir: &Path) -> Option<SplitmergeToml> {
    let path = dir.join(PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    parse_splitmerge_toml(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

pub fn parse_splitmerge_toml(s: &str) -> Result<SplitmergeToml, String> {
    toml::from_str(s).map_err(|e| e.to_string())
}

/// Overwrite settings field from file when present.
macro_rules! apply_file_opt {
    ($section:expr, $settings:expr, $field:ident) => {
        if let Some(v) = $section.$field {
            $settings.$field = v;
        }
    };
}

/// Apply file config (only fields present in the file). Call before applying CLI flags.
pub fn apply_file_to_settings(file: &SplitmergeToml, settings: &mut RunSettings) {
    let section = &file.settings;
    match &section.chunk_size {
        Some(SizeSetting::Bytes(n)) => settings.chunk_size = Some(*n),
        Some(SizeSetting::Text(text)) => match parse_size(text) {
            Ok(n) => settings.chunk_size = Some(n),
            Err(e) => log::warn!("settings.chunk_size ignored: {}", e),
        },
        None => {}
    }
    if section.jobs.is_some() {
        settings.jobs = section.jobs;
    }
    apply_file_opt!(section, settings, verbose);
    apply_file_opt!(section, settings, lenient_manifest);
    apply_file_opt!(section, settings, keep_chunks);
}
