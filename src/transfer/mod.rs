//! File transfer
//!
//! Validates a download path and streams file bytes to the caller.

pub mod file_ops;
pub mod results;

pub use file_ops::{encode_rfc5987, prepare_download, stream_download};
pub use results::DownloadPlan;
