//! Error types
//!
//! Defines domain-specific error types for each module of the file server.
//! Engine errors stay typed until the protocol layer flattens them to text.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error taxonomy reported to callers alongside the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    NotFound,
    TypeConflict,
    UnsupportedCombination,
    PermissionDenied,
    IoFailure,
    PathTraversalRejected,
    InvalidRequest,
}

/// File action engine errors
#[derive(Debug, Error)]
pub enum FileActionError {
    #[error("'{}' does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("'{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("cannot overwrite a file with a directory: '{}' is a file", .0.display())]
    TypeConflict(PathBuf),

    #[error("unsupported combination: {0}")]
    UnsupportedCombination(String),

    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("path escapes the server root: {0}")]
    PathTraversal(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FileActionError {
    /// Map an OS error on `path` to the matching engine error.
    pub fn from_io(source: io::Error, path: &Path) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => FileActionError::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => {
                FileActionError::PermissionDenied(path.to_path_buf())
            }
            _ => FileActionError::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FileActionError::NotFound(_) | FileActionError::NotADirectory(_) => {
                ErrorKind::NotFound
            }
            FileActionError::TypeConflict(_) => ErrorKind::TypeConflict,
            FileActionError::UnsupportedCombination(_) => ErrorKind::UnsupportedCombination,
            FileActionError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            FileActionError::PathTraversal(_) => ErrorKind::PathTraversalRejected,
            FileActionError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            FileActionError::Io { .. } => ErrorKind::IoFailure,
        }
    }
}

/// Authentication module errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid password for user: {0}")]
    InvalidPassword(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Please enter the username first")]
    UsernameRequired,

    #[error("Not logged in")]
    NotLoggedIn,
}

/// Request line errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Missing argument for {0}")]
    MissingArgument(&'static str),

    #[error("Malformed argument for {verb}: {source}")]
    MalformedArgument {
        verb: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Command too long")]
    CommandTooLong,
}

/// Top-level server error, used at startup and for session I/O
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Server root unavailable: {0}")]
    ServerRoot(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
