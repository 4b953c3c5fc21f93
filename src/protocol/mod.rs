//! Control protocol implementation
//!
//! Handles request line parsing, dispatch to the file engine, and response
//! generation.

pub mod commands;
pub mod handlers;
pub mod responses;

pub use commands::{Command, CommandData, CommandResult, CommandStatus, parse_command};
pub use handlers::{handle_auth_command, handle_command};
