use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::UsageDocument;
use crate::store::StorageError;

/// Writes `doc` next to `path` and renames it into place.
pub(crate) fn write_atomic(path: &Path, doc: &UsageDocument) -> Result<(), StorageError> {
    let parent = parent_dir(path);
    std::fs::create_dir_all(parent)?;

    let mut contents = serde_json::to_vec_pretty(doc)?;
    contents.push(b'\n');

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(&contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

/// `<dir>/<stem>.<label>-<stamp>.json`, suffixed `-N` until the name is free.
pub(crate) fn sibling_path(path: &Path, label: &str, stamp: i128) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("provider_usage");
    let dir = parent_dir(path);
    let mut candidate = dir.join(format!("{stem}.{label}-{stamp}.json"));
    let mut n = 1u32;
    while candidate.exists() {
        candidate = dir.join(format!("{stem}.{label}-{stamp}-{n}.json"));
        n += 1;
    }
    candidate
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
