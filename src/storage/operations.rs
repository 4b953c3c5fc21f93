//! Storage operations
//!
//! Read-only operations: directory listing, single-entry stat and volume
//! usage.

use log::{debug, info, warn};
use std::fs;
use std::path::Path;

use crate::error::FileActionError;
use crate::storage::filesystem::{describe, volume_space};
use crate::storage::results::{DirectoryListing, FileEntry, VolumeSpace};
use crate::storage::validation::{canonical_path, canonicalize_request_path, ensure_confined};

/// Lists the immediate children of a directory with volume statistics.
///
/// Metadata is best-effort per entry: an unreadable entry is still listed,
/// with zero size and the default timestamp.
pub fn list_directory(
    root: &Path,
    directory: &FileEntry,
) -> Result<DirectoryListing, FileActionError> {
    let real_path = canonical_path(root, directory)?;
    ensure_confined(root, &real_path)?;

    let metadata = fs::metadata(&real_path).map_err(|e| FileActionError::from_io(e, &real_path))?;
    if !metadata.is_dir() {
        return Err(FileActionError::NotADirectory(real_path));
    }

    let read_dir = fs::read_dir(&real_path).map_err(|e| FileActionError::from_io(e, &real_path))?;
    let dir_str = real_path.to_string_lossy().to_string();

    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", real_path.display(), e);
                continue;
            }
        };

        let mut item = FileEntry::new(dir_str.clone(), entry.file_name().to_string_lossy());

        // Follow symlinks so a link to a directory lists as a directory
        match fs::metadata(entry.path()).or_else(|_| entry.metadata()) {
            Ok(metadata) => describe(&mut item, &metadata),
            Err(e) => {
                debug!("No metadata for {}: {}", entry.path().display(), e);
                item.is_directory = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            }
        }

        entries.push(item);
    }

    let space = volume_space(&real_path).unwrap_or_else(|e| {
        warn!("Volume statistics unavailable for {}: {}", real_path.display(), e);
        VolumeSpace::default()
    });

    info!(
        "Listed directory {} - {} entries",
        real_path.display(),
        entries.len()
    );

    Ok(DirectoryListing {
        entries,
        total_space_bytes: space.total_space_bytes,
        free_space_bytes: space.free_space_bytes,
    })
}

/// Metadata for a single existing entry.
pub fn stat_entry(root: &Path, entry: &FileEntry) -> Result<FileEntry, FileActionError> {
    let real_path = canonical_path(root, entry)?;
    ensure_confined(root, &real_path)?;
    let metadata = fs::metadata(&real_path).map_err(|e| FileActionError::from_io(e, &real_path))?;

    let parent = real_path
        .parent()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "/".to_string());
    let name = real_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut item = FileEntry::new(parent, name);
    describe(&mut item, &metadata);
    Ok(item)
}

/// Total and free bytes on the volume holding `raw_path`.
pub fn query_volume_space(root: &Path, raw_path: &str) -> Result<VolumeSpace, FileActionError> {
    let real_path = canonicalize_request_path(root, raw_path)?;
    ensure_confined(root, &real_path)?;
    volume_space(&real_path).map_err(|e| FileActionError::from_io(e, &real_path))
}
