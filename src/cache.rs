use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Default cache file name, kept next to the binary's working directory.
pub const CACHE_FILE: &str = ".squid_id";

/// Single-line file holding the last used squid id, overwritten on update.
///
/// A loaded id is a hint, not a promise: the orchestrator verifies it still
/// exists remotely before reusing it.
pub struct SquidCache {
    path: PathBuf,
}

impl SquidCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SquidCache { path: path.into() }
    }

    pub fn default_location() -> Self {
        SquidCache::new(CACHE_FILE)
    }

    pub fn load(&self) -> Option<String> {
        let id = fs::read_to_string(&self.path).ok()?.trim().to_string();
        if id.is_empty() {
            None
        } else {
            Some(id)
        }
    }

    pub fn store(&self, id: &str) -> Result<()> {
        fs::write(&self.path, id)
            .with_context(|| format!("Failed to write squid cache {}", self.path.display()))
    }

    pub fn clear(&self) {
        // A missing file is already cleared.
        let _ = fs::remove_file(&self.path);
    }
}
