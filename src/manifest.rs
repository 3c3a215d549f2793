//! Digest manifest: `<hex digest>  <chunk name>` per line, stored as `hashes.sha256` next to the chunks.

use log::warn;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::engine::tools::parse_part_index;
use crate::error::{ChunkError, Result};
use crate::utils::config::{HashingConsts, MANIFEST_SEPARATOR};
use crate::utils::tempfiles::write_atomic;

/// What to do with a manifest line that is not `<digest>  <name>`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ManifestPolicy {
    /// Fail with [`ChunkError::ManifestCorrupt`]. Also rejects bad digests and repeated names.
    #[default]
    Strict,
    /// Skip the line with a warning; a repeated name keeps the last digest.
    Lenient,
}

/// Chunk name → lowercase hex digest.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Manifest {
    digests: HashMap<String, String>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, digest: impl Into<String>) {
        self.digests
            .insert(name.into(), digest.into().to_ascii_lowercase());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.digests.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.digests.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    /// Entries sorted by chunk order index; names that are not chunk artifacts sort last, by name.
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .digests
            .iter()
            .map(|(name, digest)| (name.as_str(), digest.as_str()))
            .collect();
        let key = |name: &str| parse_part_index(name).unwrap_or(usize::MAX);
        entries.sort_by(|&(a, _), &(b, _)| key(a).cmp(&key(b)).then_with(|| a.cmp(b)));
        entries
    }

    /// Serialize in ascending order index, one `<digest>  <name>\n` line per chunk.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (name, digest) in self.entries() {
            out.push_str(digest);
            out.push_str(MANIFEST_SEPARATOR);
            out.push_str(name);
            out.push('\n');
        }
        out
    }

    /// Parse manifest text. Lines may come in any order; blank lines are ignored.
    pub fn parse(text: &str, policy: ManifestPolicy) -> Result<Self> {
        let mut manifest = Manifest::new();
        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            if line.trim().is_empty() {
                continue;
            }
            let (digest, name) = match split_line(line) {
                Ok(fields) => fields,
                Err(reason) => match policy {
                    ManifestPolicy::Strict => {
                        return Err(ChunkError::ManifestCorrupt {
                            line: line_no,
                            reason,
                        });
                    }
                    ManifestPolicy::Lenient => {
                        warn!("Skipping manifest line {}: {}", line_no, reason);
                        continue;
                    }
                },
            };
            if policy == ManifestPolicy::Strict {
                if let Err(reason) = check_digest(digest) {
                    return Err(ChunkError::ManifestCorrupt {
                        line: line_no,
                        reason,
                    });
                }
                if manifest.contains(name) {
                    return Err(ChunkError::ManifestCorrupt {
                        line: line_no,
                        reason: format!("duplicate entry for {name}"),
                    });
                }
            }
            manifest.insert(name, digest);
        }
        Ok(manifest)
    }

    pub fn read(path: &Path, policy: ManifestPolicy) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| ChunkError::io("read manifest", path, e))?;
        Self::parse(&text, policy)
    }

    /// Write via temp file + rename so a reader never sees a partial manifest.
    pub fn write_atomic(&self, path: &Path) -> Result<()> {
        let rendered = self.render();
        write_atomic(path, |w| w.write_all(rendered.as_bytes()))
    }
}

impl FromIterator<(String, String)> for Manifest {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut manifest = Manifest::new();
        for (name, digest) in iter {
            manifest.insert(name, digest);
        }
        manifest
    }
}

/// `<digest>  <name>` → `(digest, name)`. Exactly one separator, both fields non-empty.
fn split_line(line: &str) -> std::result::Result<(&str, &str), String> {
    let fields: Vec<&str> = line.split(MANIFEST_SEPARATOR).collect();
    match fields.as_slice() {
        [digest, name] if !digest.is_empty() && !name.is_empty() => Ok((*digest, *name)),
        _ => Err(format!(
            "expected `<digest>{MANIFEST_SEPARATOR}<name>`, got {line:?}"
        )),
    }
}

fn check_digest(digest: &str) -> std::result::Result<(), String> {
    if digest.len() != HashingConsts::HEX_DIGEST_LEN {
        return Err(format!(
            "digest has {} characters, expected {}",
            digest.len(),
            HashingConsts::HEX_DIGEST_LEN
        ));
    }
    if !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(format!("digest {digest:?} is not hex"));
    }
    Ok(())
}
