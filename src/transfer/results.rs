//! Transfer result types

use serde::Serialize;
use std::path::PathBuf;

/// A validated download, ready to stream.
///
/// Serializes to the header line sent before the file bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadPlan {
    #[serde(skip)]
    pub file_path: PathBuf,
    pub file_name: String,
    pub content_length: u64,
    pub content_disposition: String,
    pub content_type: &'static str,
}
