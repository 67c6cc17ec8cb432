//! Content fingerprints for cache invalidation.
//!
//! A fingerprint hashes the sorted relative paths, modification times,
//! and sizes of every file under a course directory. No file contents
//! are read, so checking freshness costs one directory walk. Adding,
//! removing, or editing any file changes the fingerprint.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::time::UNIX_EPOCH;

use async_walkdir::WalkDir;
use futures::StreamExt;

/// Fingerprint of a directory tree.
pub async fn fingerprint_dir(dir: &Path) -> u64 {
    let mut files: Vec<(String, u128, u64)> = Vec::new();
    let mut walker = WalkDir::new(dir);

    while let Some(entry) = walker.next().await {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("Walk error while fingerprinting {}: {e}", dir.display());
                continue;
            }
        };

        let path = entry.path();
        let Ok(meta) = tokio::fs::metadata(&path).await else {
            continue;
        };
        if meta.is_dir() {
            continue;
        }

        let relative = path
            .strip_prefix(dir)
            .unwrap_or(&path)
            .to_string_lossy()
            .to_string();
        files.push((relative, mtime_nanos(&meta), meta.len()));
    }

    files.sort();

    let mut hasher = DefaultHasher::new();
    files.len().hash(&mut hasher);
    for file in files {
        file.hash(&mut hasher);
    }
    hasher.finish()
}

/// Fingerprint of a single file, or 0 if it cannot be read.
pub async fn fingerprint_file(path: &Path) -> u64 {
    match tokio::fs::metadata(path).await {
        Ok(meta) => {
            let mut hasher = DefaultHasher::new();
            mtime_nanos(&meta).hash(&mut hasher);
            meta.len().hash(&mut hasher);
            hasher.finish()
        }
        Err(_) => 0,
    }
}

fn mtime_nanos(meta: &std::fs::Metadata) -> u128 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}
