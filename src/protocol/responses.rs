//! Response handling
//!
//! Defines response codes and formatting. Every response is one line:
//! `<code> <payload>\r\n`, where the payload is free text or a JSON document.

use log::error;
use serde::Serialize;

/// Response codes
pub const FILE_STATUS_OK: u16 = 150;
pub const OK: u16 = 200;
pub const READY: u16 = 220;
pub const GOODBYE: u16 = 221;
pub const LOGIN_SUCCESS: u16 = 230;
pub const PASSWORD_REQUIRED: u16 = 331;
pub const TOO_MANY_CONNECTIONS: u16 = 421;
pub const SYNTAX_ERROR: u16 = 500;
pub const BAD_ARGUMENT: u16 = 501;
pub const NOT_LOGGED_IN: u16 = 530;
pub const ACTION_FAILED: u16 = 550;

/// Format a response line
pub fn format_response(code: u16, message: &str) -> String {
    format!("{} {}\r\n", code, message)
}

/// Format a response line carrying `payload` as compact JSON.
///
/// Serialization of the engine's own types cannot realistically fail; if it
/// does, the client gets a 550 instead of a truncated document.
pub fn format_json_response<T: Serialize>(code: u16, payload: &T) -> String {
    match serde_json::to_string(payload) {
        Ok(json) => format_response(code, &json),
        Err(e) => {
            error!("Failed to serialize response payload: {}", e);
            format_response(ACTION_FAILED, "Internal serialization error")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ActionResult;

    #[test]
    fn plain_response_has_crlf() {
        assert_eq!(format_response(OK, "NOOP ok"), "200 NOOP ok\r\n");
    }

    #[test]
    fn json_response_is_single_line() {
        let line = format_json_response(OK, &ActionResult::success("Deleted '/srv/x'"));
        assert_eq!(
            line,
            "200 {\"message\":\"Deleted '/srv/x'\",\"isError\":false}\r\n"
        );
        assert_eq!(line.matches('\n').count(), 1);
    }
}
