//! File action execution engine
//!
//! Path resolution, the action dispatcher, directory listing and the
//! request/result types they share. Everything here is synchronous; callers
//! on an async runtime run it on the blocking pool.

pub mod actions;
pub mod filesystem;
pub mod operations;
pub mod results;
pub mod validation;

pub use actions::{execute, perform};
pub use operations::{list_directory, query_volume_space, stat_entry};
pub use results::{
    ActionKind, ActionRequest, ActionResult, DirectoryListing, FileEntry, VolumeSpace,
};
pub use validation::{EntryKind, canonicalize_request_path};
