//! Merge a directory of snapshot files into a single JSON array, for
//! viewers that want the whole run in one download.

use crate::error::FlowResult;
use std::path::{Path, PathBuf};

/// `data-*.json` files in `dir`, sorted by name (zero-padded names sort
/// in model-time order).
pub fn snapshot_files(dir: &Path) -> FlowResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_snapshot = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("data-") && n.ends_with(".json"));
        if is_snapshot && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Concatenate every snapshot file in `dir` into `[a,b,...]`.
pub fn consolidate_dir(dir: &Path) -> FlowResult<String> {
    let mut parts = Vec::new();
    for path in snapshot_files(dir)? {
        let content = std::fs::read_to_string(&path)?;
        parts.push(content.trim().to_string());
    }
    Ok(format!("[{}]", parts.join(",")))
}

/// Write the consolidated array to `out`. Returns the number of snapshots.
pub fn consolidate_into(dir: &Path, out: &Path) -> FlowResult<usize> {
    let count = snapshot_files(dir)?.len();
    std::fs::write(out, consolidate_dir(dir)?)?;
    log::info!("Consolidated {count} snapshots from {} into {}", dir.display(), out.display());
    Ok(count)
}
