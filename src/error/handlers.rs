//! Error handlers
//!
//! Maps errors onto protocol response codes.

use crate::error::types::{AuthError, FileActionError, ProtocolError};
use crate::protocol::responses;

/// Response code for a failed engine request outside of `ACTION`
pub fn file_error_code(err: &FileActionError) -> u16 {
    match err {
        FileActionError::InvalidRequest(_) => responses::BAD_ARGUMENT,
        _ => responses::ACTION_FAILED,
    }
}

/// Every authentication failure answers 530
pub fn auth_error_code(_err: &AuthError) -> u16 {
    responses::NOT_LOGGED_IN
}

pub fn protocol_error_code(err: &ProtocolError) -> u16 {
    match err {
        ProtocolError::UnknownCommand(_) | ProtocolError::CommandTooLong => {
            responses::SYNTAX_ERROR
        }
        ProtocolError::MissingArgument(_) | ProtocolError::MalformedArgument { .. } => {
            responses::BAD_ARGUMENT
        }
    }
}
