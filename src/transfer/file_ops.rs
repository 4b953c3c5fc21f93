//! Module `file_ops`
//!
//! Handles file downloads: path validation before anything is sent, then a
//! chunked copy from disk to the caller's stream.

use log::{error, info};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::fs;
use std::io;
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::FileActionError;
use crate::storage::validation::{canonicalize_request_path, ensure_confined};
use crate::transfer::results::DownloadPlan;

/// Everything outside RFC 5987 `attr-char` gets percent-encoded.
const ATTR_CHAR_ESCAPES: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Encode a filename for `filename*=UTF-8''...` (RFC 5987).
pub fn encode_rfc5987(name: &str) -> String {
    utf8_percent_encode(name, ATTR_CHAR_ESCAPES).to_string()
}

/// Validates `raw_path` for download.
///
/// Applies the same root confinement as every other request, then requires
/// an existing regular file.
pub fn prepare_download(root: &Path, raw_path: &str) -> Result<DownloadPlan, FileActionError> {
    if raw_path.trim().is_empty() {
        return Err(FileActionError::InvalidRequest("missing path".into()));
    }

    let file_path = canonicalize_request_path(root, raw_path)?;
    ensure_confined(root, &file_path)?;
    let metadata =
        fs::metadata(&file_path).map_err(|e| FileActionError::from_io(e, &file_path))?;

    if metadata.is_dir() {
        return Err(FileActionError::InvalidRequest(format!(
            "cannot download directory '{}'",
            file_path.display()
        )));
    }

    let file_name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let content_disposition = format!("attachment; filename*=UTF-8''{}", encode_rfc5987(&file_name));

    info!(
        "Prepared download for {} ({} bytes)",
        file_path.display(),
        metadata.len()
    );

    Ok(DownloadPlan {
        file_path,
        file_name,
        content_length: metadata.len(),
        content_disposition,
        content_type: "application/octet-stream",
    })
}

/// Streams exactly `plan.content_length` bytes of the file into `writer`.
///
/// The header has already gone out by the time this runs, so a failure here
/// can only be logged and returned; the caller must drop the connection.
pub async fn stream_download<W>(
    writer: &mut W,
    plan: &DownloadPlan,
    buffer_size: usize,
) -> io::Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let file = tokio::fs::File::open(&plan.file_path).await.inspect_err(|e| {
        error!("Failed to open {}: {}", plan.file_path.display(), e);
    })?;

    // The file may grow after the header was sent; never exceed it
    let mut reader = file.take(plan.content_length);
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut total_bytes_sent = 0u64;

    loop {
        let n = match reader.read(&mut buffer).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                error!("Read error on {}: {}", plan.file_path.display(), e);
                return Err(e);
            }
        };

        if let Err(e) = writer.write_all(&buffer[..n]).await {
            error!(
                "Error streaming {} after {} bytes: {}",
                plan.file_path.display(),
                total_bytes_sent,
                e
            );
            return Err(e);
        }
        total_bytes_sent += n as u64;
    }

    if total_bytes_sent < plan.content_length {
        error!(
            "File {} shrank during download: sent {} of {} bytes",
            plan.file_path.display(),
            total_bytes_sent,
            plan.content_length
        );
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "file shrank during download",
        ));
    }

    writer.flush().await?;

    info!(
        "Download completed: {} ({} bytes)",
        plan.file_path.display(),
        total_bytes_sent
    );
    Ok(total_bytes_sent)
}
