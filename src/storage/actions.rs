//! Action dispatcher
//!
//! Maps an [`ActionRequest`] onto one filesystem mutation. Every legality
//! check runs before the first mutating call; once a mutation starts there is
//! no retry and no rollback.

use log::{error, info};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::FileActionError;
use crate::storage::filesystem::{self, Relocation};
use crate::storage::results::{ActionKind, ActionRequest, ActionResult, FileEntry};
use crate::storage::validation::{
    EntryKind, Resolution, canonical_path, classify, ensure_confined, resolve_pair,
};

/// Execute `request` and report the outcome in the uniform result shape.
pub fn perform(root: &Path, request: &ActionRequest) -> ActionResult {
    let outcome = execute(root, request);
    match &outcome {
        Ok(message) => info!("{} succeeded: {}", request.kind, message),
        Err(e) => error!("{} failed: {}", request.kind, e),
    }
    ActionResult::from(outcome)
}

/// Execute `request`, returning the success message or the typed error.
pub fn execute(root: &Path, request: &ActionRequest) -> Result<String, FileActionError> {
    match request.kind {
        ActionKind::Copy => copy(root, &request.source, required_target(request)?),
        ActionKind::Move | ActionKind::Rename => {
            relocate(root, &request.source, required_target(request)?)
        }
        ActionKind::Delete => delete(root, &request.source),
        ActionKind::CreateDirectory => create_directory(root, &request.source),
    }
}

fn required_target(request: &ActionRequest) -> Result<&FileEntry, FileActionError> {
    request.target.as_ref().ok_or_else(|| {
        FileActionError::InvalidRequest(format!("{} requires a target", request.kind))
    })
}

/// Copy a file or a directory tree.
///
/// An existing directory target receives the source under its own name.
pub fn copy(
    root: &Path,
    source: &FileEntry,
    target: &FileEntry,
) -> Result<String, FileActionError> {
    let resolution = resolve_pair(root, source, target)?;
    let destination = plan_destination(&resolution)?;
    confine_endpoints(root, &resolution, &destination, false)?;
    let from = &resolution.source.path;

    let bytes = match resolution.source.kind {
        EntryKind::Directory => filesystem::copy_dir_recursive(from, &destination)?,
        EntryKind::File => filesystem::copy_file(from, &destination)?,
    };

    Ok(format!(
        "Copied '{}' to '{}' ({} bytes)",
        from.display(),
        destination.display(),
        bytes
    ))
}

/// Move or rename; both relocate the source path.
pub fn relocate(
    root: &Path,
    source: &FileEntry,
    target: &FileEntry,
) -> Result<String, FileActionError> {
    let resolution = resolve_pair(root, source, target)?;
    if resolution.source.path == root {
        return Err(FileActionError::PermissionDenied(root.to_path_buf()));
    }
    let destination = plan_destination(&resolution)?;
    confine_endpoints(root, &resolution, &destination, true)?;
    let from = &resolution.source.path;

    let how = filesystem::relocate(from, &destination, resolution.source.is_directory())?;
    let note = match how {
        Relocation::Renamed => "",
        Relocation::CopiedAndRemoved => " across devices",
    };

    Ok(format!(
        "Moved '{}' to '{}'{}",
        from.display(),
        destination.display(),
        note
    ))
}

/// Remove a file or a whole directory tree.
pub fn delete(root: &Path, source: &FileEntry) -> Result<String, FileActionError> {
    let path = canonical_path(root, source)?;
    if path == root {
        return Err(FileActionError::PermissionDenied(path));
    }
    confine_entry(root, &path)?;

    filesystem::remove_path(&path)?;
    Ok(format!("Deleted '{}'", path.display()))
}

/// Create a directory and any missing parents. Existing directories are left
/// untouched.
pub fn create_directory(root: &Path, source: &FileEntry) -> Result<String, FileActionError> {
    let path = canonical_path(root, source)?;
    ensure_confined(root, &path)?;

    match classify(&path)? {
        Some(EntryKind::Directory) => {
            return Ok(format!("Directory '{}' already exists", path.display()));
        }
        Some(EntryKind::File) => return Err(FileActionError::TypeConflict(path)),
        None => {}
    }

    fs::create_dir_all(&path).map_err(|e| FileActionError::from_io(e, &path))?;
    Ok(format!("Created directory '{}'", path.display()))
}

/// Work out where the source lands and check the move is legal.
///
/// A target that is an existing directory receives the source under its leaf
/// name, the way `cp` and `mv` treat a directory operand.
fn plan_destination(resolution: &Resolution) -> Result<PathBuf, FileActionError> {
    let source = &resolution.source;
    let target = &resolution.target;

    let nested = target.exists && target.is_directory();
    let destination = if nested {
        let leaf = source.path.file_name().ok_or_else(|| {
            FileActionError::UnsupportedCombination("the filesystem root has no name".into())
        })?;
        target.path.join(leaf)
    } else {
        target.path.clone()
    };

    if destination == source.path {
        return Err(FileActionError::UnsupportedCombination(format!(
            "'{}' is both source and destination",
            source.path.display()
        )));
    }

    if source.is_directory() && destination.starts_with(&source.path) {
        return Err(FileActionError::UnsupportedCombination(format!(
            "cannot place directory '{}' inside itself",
            source.path.display()
        )));
    }

    if let Some(parent) = destination.parent() {
        match classify(parent)? {
            Some(EntryKind::Directory) => {}
            Some(EntryKind::File) => {
                return Err(FileActionError::NotADirectory(parent.to_path_buf()));
            }
            None => return Err(FileActionError::NotFound(parent.to_path_buf())),
        }
    }

    if nested {
        match (source.kind, classify(&destination)?) {
            (EntryKind::Directory, Some(EntryKind::File)) => {
                return Err(FileActionError::TypeConflict(destination));
            }
            (EntryKind::File, Some(EntryKind::Directory)) => {
                return Err(FileActionError::UnsupportedCombination(format!(
                    "cannot overwrite directory '{}' with a file",
                    destination.display()
                )));
            }
            _ => {}
        }
    }

    Ok(destination)
}

/// Check both endpoints against the root with symbolic links resolved.
///
/// A relocation acts on the source entry itself, so only its parent is
/// followed. The destination is always followed since writes go through it.
fn confine_endpoints(
    root: &Path,
    resolution: &Resolution,
    destination: &Path,
    relocating: bool,
) -> Result<(), FileActionError> {
    let source = &resolution.source;
    let real_source = if relocating {
        confine_entry(root, &source.path)?
    } else {
        ensure_confined(root, &source.path)?
    };
    let real_destination = ensure_confined(root, destination)?;

    if real_destination == real_source {
        return Err(FileActionError::UnsupportedCombination(format!(
            "'{}' and '{}' are the same entry",
            source.path.display(),
            destination.display()
        )));
    }

    if source.is_directory() && real_destination.starts_with(&real_source) {
        return Err(FileActionError::UnsupportedCombination(format!(
            "cannot place directory '{}' inside itself",
            source.path.display()
        )));
    }

    Ok(())
}

/// Confinement for an entry that is acted on without following it.
fn confine_entry(root: &Path, path: &Path) -> Result<PathBuf, FileActionError> {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => Ok(ensure_confined(root, parent)?.join(name)),
        _ => ensure_confined(root, path),
    }
}
