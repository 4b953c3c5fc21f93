//! Storage result types
//!
//! Request and result shapes exchanged with callers. Every type here is
//! request-scoped: built from a request, consumed, then dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ErrorKind, FileActionError};

/// A named filesystem location plus cached metadata.
///
/// `path` is the containing directory and `name` the leaf component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileEntry {
    pub path: String,
    pub name: String,
    pub is_directory: bool,
    pub size: i64,
    pub modified_at: DateTime<Utc>,
}

impl FileEntry {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// `path + "/" + name`, before any normalization
    pub fn joined(&self) -> String {
        format!("{}/{}", self.path, self.name)
    }
}

/// Operation requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    Copy,
    #[serde(alias = "cut")]
    Move,
    Delete,
    Rename,
    #[serde(alias = "newFolder")]
    CreateDirectory,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy => write!(f, "copy"),
            Self::Move => write!(f, "move"),
            Self::Delete => write!(f, "delete"),
            Self::Rename => write!(f, "rename"),
            Self::CreateDirectory => write!(f, "createDirectory"),
        }
    }
}

/// A single mutating request.
///
/// `target` is required for copy, move and rename; delete and
/// create-directory act on `source` alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    #[serde(alias = "action")]
    pub kind: ActionKind,
    pub source: FileEntry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<FileEntry>,
}

impl ActionRequest {
    pub fn new(kind: ActionKind, source: FileEntry, target: Option<FileEntry>) -> Self {
        Self {
            kind,
            source,
            target,
        }
    }
}

/// Immediate children of a directory plus its volume usage.
///
/// Entries come back in filesystem enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryListing {
    pub entries: Vec<FileEntry>,
    pub total_space_bytes: u64,
    pub free_space_bytes: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSpace {
    pub total_space_bytes: u64,
    pub free_space_bytes: u64,
}

/// Uniform outcome of an action, success or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub message: String,
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl ActionResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error: false,
            error_kind: None,
        }
    }

    pub fn failure(err: &FileActionError) -> Self {
        Self {
            message: err.to_string(),
            is_error: true,
            error_kind: Some(err.kind()),
        }
    }
}

impl From<Result<String, FileActionError>> for ActionResult {
    fn from(outcome: Result<String, FileActionError>) -> Self {
        match outcome {
            Ok(message) => ActionResult::success(message),
            Err(e) => ActionResult::failure(&e),
        }
    }
}
