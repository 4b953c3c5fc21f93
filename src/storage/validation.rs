//! Path validation
//!
//! Turns request entries into canonical paths inside the server root and
//! classifies them as file or directory.
//!
//! Canonicalization is lexical: separators are collapsed, `.` is dropped and
//! `..` pops a component. It never touches the filesystem, so a traversal
//! attempt is rejected before any OS call is made. Symbolic links are
//! checked separately by [`ensure_confined`] before anything is read or
//! changed.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::FileActionError;
use crate::storage::results::FileEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// A canonical path plus its classification.
///
/// For a target that does not exist yet, `kind` is inferred from the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub path: PathBuf,
    pub kind: EntryKind,
    pub exists: bool,
}

impl ResolvedPath {
    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Classified endpoints of a two-path action.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub source: ResolvedPath,
    pub target: ResolvedPath,
}

/// Canonical path for `entry.path + "/" + entry.name`.
///
/// An empty `path` means the name is relative to the root.
pub fn canonical_path(root: &Path, entry: &FileEntry) -> Result<PathBuf, FileActionError> {
    if entry.path.is_empty() {
        canonicalize_request_path(root, &entry.name)
    } else {
        canonicalize_request_path(root, &entry.joined())
    }
}

/// Canonical path for a raw request path.
///
/// Absolute paths are host paths; relative ones are taken from the root.
/// Either way the result must stay inside `root`.
pub fn canonicalize_request_path(root: &Path, raw: &str) -> Result<PathBuf, FileActionError> {
    if raw.contains('\0') {
        return Err(FileActionError::InvalidRequest(
            "path contains a NUL byte".into(),
        ));
    }

    let anchored = if raw.starts_with('/') {
        raw.to_string()
    } else {
        format!("{}/{}", root.to_string_lossy(), raw)
    };

    let mut components: Vec<&str> = Vec::new();
    for component in anchored.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                if components.pop().is_none() {
                    return Err(FileActionError::PathTraversal(raw.to_string()));
                }
            }
            part => components.push(part),
        }
    }

    let mut path = PathBuf::from("/");
    path.extend(components);

    if !path.starts_with(root) {
        return Err(FileActionError::PathTraversal(raw.to_string()));
    }

    Ok(path)
}

/// Classify the entry at `path`: `None` when nothing is there.
pub fn classify(path: &Path) -> Result<Option<EntryKind>, FileActionError> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(Some(EntryKind::Directory)),
        Ok(_) => Ok(Some(EntryKind::File)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        // A parent component is a regular file
        Err(e) if is_not_a_directory(&e) => Ok(None),
        Err(e) => Err(FileActionError::from_io(e, path)),
    }
}

#[cfg(unix)]
fn is_not_a_directory(e: &io::Error) -> bool {
    e.raw_os_error() == Some(nix::errno::Errno::ENOTDIR as i32)
}

#[cfg(not(unix))]
fn is_not_a_directory(_e: &io::Error) -> bool {
    false
}

/// Dangling link hops followed before giving up, as the kernel's MAXSYMLINKS
const MAX_LINK_DEPTH: usize = 40;

/// Checks that `path` stays inside `root` once symbolic links are resolved,
/// returning the resolved path.
///
/// Components that do not exist yet are judged by their nearest existing
/// ancestor; a dangling link is judged by where it points.
pub fn ensure_confined(root: &Path, path: &Path) -> Result<PathBuf, FileActionError> {
    let real_root = fs::canonicalize(root).map_err(|e| FileActionError::from_io(e, root))?;
    let resolved = resolve_links(path, 0)?;

    if resolved.starts_with(&real_root) {
        Ok(resolved)
    } else {
        Err(FileActionError::PathTraversal(format!(
            "{} resolves to {}",
            path.display(),
            resolved.display()
        )))
    }
}

fn resolve_links(path: &Path, depth: usize) -> Result<PathBuf, FileActionError> {
    match fs::canonicalize(path) {
        Ok(real) => return Ok(real),
        Err(e) if e.kind() == io::ErrorKind::NotFound || is_not_a_directory(&e) => {}
        Err(e) => return Err(FileActionError::from_io(e, path)),
    }

    if depth >= MAX_LINK_DEPTH {
        return Err(FileActionError::Io {
            path: path.to_path_buf(),
            source: io::Error::other("too many levels of symbolic links"),
        });
    }

    let Some(parent) = path.parent() else {
        return Ok(path.to_path_buf());
    };

    let is_link = fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);
    if is_link {
        let target = fs::read_link(path).map_err(|e| FileActionError::from_io(e, path))?;
        return resolve_links(&parent.join(target), depth + 1);
    }

    let resolved_parent = resolve_links(parent, depth)?;
    Ok(match path.components().next_back() {
        Some(Component::Normal(name)) => resolved_parent.join(name),
        Some(Component::ParentDir) => resolved_parent
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or(resolved_parent),
        _ => resolved_parent,
    })
}

/// Resolve and classify both endpoints of a copy/move/rename.
///
/// The source must exist. A missing target takes the source's type. An
/// existing plain-file target for a directory source is a type conflict.
pub fn resolve_pair(
    root: &Path,
    source: &FileEntry,
    target: &FileEntry,
) -> Result<Resolution, FileActionError> {
    // Both paths are validated before the first classification
    let source_path = canonical_path(root, source)?;
    let target_path = canonical_path(root, target)?;

    let source_kind = classify(&source_path)?
        .ok_or_else(|| FileActionError::NotFound(source_path.clone()))?;

    let target = match classify(&target_path)? {
        Some(EntryKind::File) if source_kind == EntryKind::Directory => {
            return Err(FileActionError::TypeConflict(target_path));
        }
        Some(kind) => ResolvedPath {
            path: target_path,
            kind,
            exists: true,
        },
        None => ResolvedPath {
            path: target_path,
            kind: source_kind,
            exists: false,
        },
    };

    Ok(Resolution {
        source: ResolvedPath {
            path: source_path,
            kind: source_kind,
            exists: true,
        },
        target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn root() -> PathBuf {
        PathBuf::from("/srv/data")
    }

    #[test]
    fn duplicate_separators_collapse() {
        let entry = FileEntry::new("/srv/data//docs/", "report.txt");
        assert_eq!(
            canonical_path(&root(), &entry).unwrap(),
            PathBuf::from("/srv/data/docs/report.txt")
        );
    }

    #[test]
    fn dot_components_resolve_inside_root() {
        let entry = FileEntry::new("/srv/data/a/./b/..", "c");
        assert_eq!(
            canonical_path(&root(), &entry).unwrap(),
            PathBuf::from("/srv/data/a/c")
        );
    }

    #[test]
    fn relative_paths_are_rooted() {
        let entry = FileEntry::new("", "");
        assert_eq!(canonical_path(&root(), &entry).unwrap(), root());

        let entry = FileEntry::new("docs", "x");
        assert_eq!(
            canonical_path(&root(), &entry).unwrap(),
            PathBuf::from("/srv/data/docs/x")
        );
    }

    #[test]
    fn escape_through_dotdot_rejected() {
        let entry = FileEntry::new("/srv/data/../../etc", "passwd");
        let err = canonical_path(&root(), &entry).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathTraversalRejected);

        let entry = FileEntry::new("..", "data2");
        let err = canonical_path(&root(), &entry).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathTraversalRejected);
    }

    #[test]
    fn popping_above_filesystem_root_rejected() {
        let err = canonicalize_request_path(Path::new("/"), "/../../x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathTraversalRejected);
    }

    #[test]
    fn sibling_with_shared_prefix_is_outside() {
        let err = canonicalize_request_path(&root(), "/srv/database/x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathTraversalRejected);
    }

    #[test]
    fn nul_byte_rejected() {
        let err = canonicalize_request_path(&root(), "/srv/data/a\0b").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn classify_reports_kinds() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("f"), "x").unwrap();
        assert_eq!(classify(dir.path()).unwrap(), Some(EntryKind::Directory));
        assert_eq!(classify(&dir.path().join("f")).unwrap(), Some(EntryKind::File));
        assert_eq!(classify(&dir.path().join("missing")).unwrap(), None);
        assert_eq!(classify(&dir.path().join("f").join("under_file")).unwrap(), None);
    }

    #[test]
    fn missing_target_inherits_source_type() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        let base = dir.path().to_str().unwrap();

        let resolution = resolve_pair(
            dir.path(),
            &FileEntry::new(base, "src"),
            &FileEntry::new(base, "dst"),
        )
        .unwrap();
        assert!(resolution.source.is_directory());
        assert!(resolution.target.is_directory());
        assert!(!resolution.target.exists);
    }

    #[test]
    fn directory_onto_file_is_type_conflict() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();
        std::fs::write(dir.path().join("b"), "file").unwrap();
        let base = dir.path().to_str().unwrap();

        let err = resolve_pair(
            dir.path(),
            &FileEntry::new(base, "a"),
            &FileEntry::new(base, "b"),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeConflict);
    }

    #[cfg(unix)]
    #[test]
    fn link_out_of_root_is_not_confined() {
        let base = TempDir::new().unwrap();
        let root = base.path().join("root");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::create_dir_all(base.path().join("outside")).unwrap();
        std::os::unix::fs::symlink("../outside", root.join("link")).unwrap();

        let err = ensure_confined(&root, &root.join("link/new.txt")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathTraversalRejected);
    }

    #[cfg(unix)]
    #[test]
    fn dangling_link_judged_by_its_target() {
        let base = TempDir::new().unwrap();
        let root = base.path().join("root");
        std::fs::create_dir_all(&root).unwrap();
        std::os::unix::fs::symlink("../escaped.txt", root.join("dangling")).unwrap();
        std::os::unix::fs::symlink("later.txt", root.join("pending")).unwrap();

        let err = ensure_confined(&root, &root.join("dangling")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathTraversalRejected);

        let resolved = ensure_confined(&root, &root.join("pending")).unwrap();
        assert_eq!(resolved, std::fs::canonicalize(&root).unwrap().join("later.txt"));
    }

    #[test]
    fn missing_components_resolve_through_existing_ancestor() {
        let dir = TempDir::new().unwrap();
        let resolved = ensure_confined(dir.path(), &dir.path().join("a/b/c")).unwrap();
        assert_eq!(resolved, std::fs::canonicalize(dir.path()).unwrap().join("a/b/c"));
    }

    #[test]
    fn missing_source_is_not_found() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().to_str().unwrap();
        let err = resolve_pair(
            dir.path(),
            &FileEntry::new(base, "nope"),
            &FileEntry::new(base, "dst"),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
