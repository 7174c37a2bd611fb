use std::path::{Path, PathBuf};

use crate::error::{Result, SyncError};

pub const BASELINE_FILE: &str = "baseline.json";

/// Return the cache directory for price-sync data files.
/// Creates it if it doesn't exist.
pub fn cache_dir() -> Option<PathBuf> {
    let dir = dirs::cache_dir()?.join("price-sync");
    if !dir.exists() {
        std::fs::create_dir_all(&dir).ok()?;
    }
    Some(dir)
}

/// Return the path to a cached data file, if the cache directory is available.
pub fn cache_path(filename: &str) -> Option<PathBuf> {
    Some(cache_dir()?.join(filename))
}

/// Default location of the baseline kept for offline runs.
pub fn baseline_cache_path() -> Option<PathBuf> {
    cache_path(BASELINE_FILE)
}

/// Keep the last successfully fetched baseline for offline runs.
pub fn store_baseline(path: &Path, raw: &str) -> Result<()> {
    std::fs::write(path, raw)
        .map_err(|e| SyncError::Io(format!("failed to write baseline cache: {e}")))
}

pub fn load_cached_baseline(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| SyncError::Io(format!("no cached baseline at {}: {e}", path.display())))
}
