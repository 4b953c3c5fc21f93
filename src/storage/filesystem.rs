//! File system operations
//!
//! Direct OS calls used by the action dispatcher and lister. Paths passed
//! here are already canonical and inside the server root.

use chrono::{DateTime, Utc};
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use walkdir::WalkDir;

use crate::error::FileActionError;
use crate::storage::results::{FileEntry, VolumeSpace};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Recursively copy `from` into `to`, creating `to` if needed.
///
/// Existing files under `to` are overwritten; existing directories are
/// merged. Symbolic links are recreated, not followed. Returns bytes copied.
pub fn copy_dir_recursive(from: &Path, to: &Path) -> Result<u64, FileActionError> {
    let mut total_bytes = 0u64;

    for entry in WalkDir::new(from).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            FileActionError::from_io(io::Error::from(e), &path)
        })?;

        let relative = entry.path().strip_prefix(from).map_err(|_| {
            FileActionError::InvalidRequest(format!(
                "'{}' is outside '{}'",
                entry.path().display(),
                from.display()
            ))
        })?;
        let destination = to.join(relative);
        let file_type = entry.file_type();

        // Never write through a link already sitting in the destination tree
        let existing_link = fs::symlink_metadata(&destination)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);

        if file_type.is_dir() {
            if existing_link {
                return Err(FileActionError::UnsupportedCombination(format!(
                    "cannot merge directory into symbolic link '{}'",
                    destination.display()
                )));
            }
            fs::create_dir_all(&destination)
                .map_err(|e| FileActionError::from_io(e, &destination))?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &destination)?;
        } else {
            if existing_link {
                remove_path(&destination)?;
            }
            total_bytes += copy_file(entry.path(), &destination)?;
        }
    }

    Ok(total_bytes)
}

/// Copy one regular file, keeping its permissions.
///
/// Errors are reported against the side that failed: opening or reading the
/// source against `from`, creating or writing the destination against `to`.
pub fn copy_file(from: &Path, to: &Path) -> Result<u64, FileActionError> {
    let mut reader = fs::File::open(from).map_err(|e| FileActionError::from_io(e, from))?;
    let permissions = reader
        .metadata()
        .map_err(|e| FileActionError::from_io(e, from))?
        .permissions();

    let mut writer = fs::File::create(to).map_err(|e| FileActionError::from_io(e, to))?;
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut total_bytes = 0u64;
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(FileActionError::from_io(e, from)),
        };
        writer
            .write_all(&buffer[..n])
            .map_err(|e| FileActionError::from_io(e, to))?;
        total_bytes += n as u64;
    }

    writer
        .set_permissions(permissions)
        .map_err(|e| FileActionError::from_io(e, to))?;
    Ok(total_bytes)
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> Result<(), FileActionError> {
    let link = fs::read_link(from).map_err(|e| FileActionError::from_io(e, from))?;
    if fs::symlink_metadata(to).is_ok() {
        remove_path(to)?;
    }
    std::os::unix::fs::symlink(&link, to).map_err(|e| FileActionError::from_io(e, to))
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> Result<(), FileActionError> {
    copy_file(from, to).map(|_| ())
}

/// Remove a file, symbolic link or whole directory tree.
///
/// Uses `lstat`, so a link to a directory removes the link only.
pub fn remove_path(path: &Path) -> Result<(), FileActionError> {
    let metadata = fs::symlink_metadata(path).map_err(|e| FileActionError::from_io(e, path))?;

    let removed = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    removed.map_err(|e| FileActionError::from_io(e, path))
}

/// How a relocation was carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relocation {
    Renamed,
    CopiedAndRemoved,
}

/// Rename `from` to `to`, falling back to copy-then-delete across devices.
pub fn relocate(from: &Path, to: &Path, is_directory: bool) -> Result<Relocation, FileActionError> {
    match fs::rename(from, to) {
        Ok(()) => Ok(Relocation::Renamed),
        Err(e) if is_cross_device(&e) => {
            if is_directory {
                copy_dir_recursive(from, to)?;
            } else {
                copy_file(from, to)?;
            }
            remove_path(from)?;
            Ok(Relocation::CopiedAndRemoved)
        }
        Err(e) => Err(FileActionError::from_io(e, from)),
    }
}

#[cfg(unix)]
fn is_cross_device(e: &io::Error) -> bool {
    e.raw_os_error() == Some(nix::errno::Errno::EXDEV as i32)
}

#[cfg(not(unix))]
fn is_cross_device(_e: &io::Error) -> bool {
    false
}

/// Total and available bytes on the volume holding `path`.
#[cfg(unix)]
pub fn volume_space(path: &Path) -> io::Result<VolumeSpace> {
    let stat = nix::sys::statvfs::statvfs(path).map_err(io::Error::from)?;
    let fragment_size = stat.fragment_size() as u64;

    Ok(VolumeSpace {
        total_space_bytes: (stat.blocks() as u64).saturating_mul(fragment_size),
        free_space_bytes: (stat.blocks_available() as u64).saturating_mul(fragment_size),
    })
}

#[cfg(not(unix))]
pub fn volume_space(_path: &Path) -> io::Result<VolumeSpace> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "volume statistics are only available on unix",
    ))
}

/// Fill size, type and modification time from `metadata`.
pub fn describe(entry: &mut FileEntry, metadata: &fs::Metadata) {
    entry.is_directory = metadata.is_dir();
    entry.size = i64::try_from(metadata.len()).unwrap_or(i64::MAX);
    entry.modified_at = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_default();
}
