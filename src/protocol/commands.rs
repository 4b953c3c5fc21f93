//! Module `commands`
//!
//! Defines request line parsing and the data structures used to represent
//! commands, their status, associated data, and results.

use serde::de::DeserializeOwned;

use crate::error::ProtocolError;
use crate::storage::{ActionRequest, FileEntry};
use crate::transfer::DownloadPlan;

/// A command parsed from one client request line.
///
/// Structured arguments arrive as a single JSON document after the verb.
#[derive(Debug, PartialEq)]
pub enum Command {
    USER(String),
    PASS(String),
    LIST(FileEntry),       // List a directory
    ACTION(ActionRequest), // Copy, move, delete, rename or create directory
    STAT(FileEntry),       // Metadata for one entry
    SPACE(String),         // Volume usage for a path
    RETR(String),          // Download a file
    NOOP,
    QUIT,
}

/// Represents the outcome status of executing a command.
#[derive(Debug, PartialEq)]
pub enum CommandStatus {
    Success,
    Failure(String),
    CloseConnection,
}

/// Additional data the session loop acts on after sending the message.
#[derive(Debug)]
pub enum CommandData {
    /// Stream this file right after the header line
    Download(DownloadPlan),
}

/// Struct encapsulating the full result of a command execution.
#[derive(Debug)]
pub struct CommandResult {
    pub status: CommandStatus,
    pub message: Option<String>,
    pub data: Option<CommandData>,
}

impl CommandResult {
    pub fn success(message: String) -> Self {
        Self {
            status: CommandStatus::Success,
            message: Some(message),
            data: None,
        }
    }

    pub fn failure(reason: impl Into<String>, message: String) -> Self {
        Self {
            status: CommandStatus::Failure(reason.into()),
            message: Some(message),
            data: None,
        }
    }
}

/// Parses a raw request line into a [`Command`].
///
/// The verb is case-insensitive. `LIST` without an argument lists the root
/// and `SPACE` without one reports the root's volume.
pub fn parse_command(raw: &str, max_length: usize) -> Result<Command, ProtocolError> {
    if raw.len() > max_length {
        return Err(ProtocolError::CommandTooLong);
    }

    let trimmed = raw.trim();
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let verb = parts.next().unwrap_or("").to_ascii_uppercase();
    let arg = parts.next().unwrap_or("").trim();

    match verb.as_str() {
        "USER" => Ok(Command::USER(required(arg, "USER")?.to_string())),
        "PASS" => Ok(Command::PASS(required(arg, "PASS")?.to_string())),
        "LIST" if arg.is_empty() => Ok(Command::LIST(FileEntry::default())),
        "LIST" => Ok(Command::LIST(json_argument(arg, "LIST")?)),
        "ACTION" => Ok(Command::ACTION(json_argument(
            required(arg, "ACTION")?,
            "ACTION",
        )?)),
        "STAT" => Ok(Command::STAT(json_argument(required(arg, "STAT")?, "STAT")?)),
        "SPACE" => Ok(Command::SPACE(arg.to_string())),
        "RETR" => Ok(Command::RETR(required(arg, "RETR")?.to_string())),
        "NOOP" => Ok(Command::NOOP),
        "QUIT" | "Q" => Ok(Command::QUIT),
        _ => Err(ProtocolError::UnknownCommand(verb)),
    }
}

fn required<'a>(arg: &'a str, verb: &'static str) -> Result<&'a str, ProtocolError> {
    if arg.is_empty() {
        Err(ProtocolError::MissingArgument(verb))
    } else {
        Ok(arg)
    }
}

fn json_argument<T: DeserializeOwned>(arg: &str, verb: &'static str) -> Result<T, ProtocolError> {
    serde_json::from_str(arg).map_err(|source| ProtocolError::MalformedArgument { verb, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ActionKind;

    const MAX: usize = 4096;

    #[test]
    fn verbs_are_case_insensitive() {
        assert_eq!(parse_command("noop", MAX).unwrap(), Command::NOOP);
        assert_eq!(parse_command("Quit\r\n", MAX).unwrap(), Command::QUIT);
        assert_eq!(
            parse_command("user alice", MAX).unwrap(),
            Command::USER("alice".into())
        );
    }

    #[test]
    fn list_without_argument_lists_root() {
        assert_eq!(
            parse_command("LIST", MAX).unwrap(),
            Command::LIST(FileEntry::default())
        );
    }

    #[test]
    fn list_parses_file_entry_json() {
        let cmd = parse_command(r#"LIST {"path":"/srv","name":"docs"}"#, MAX).unwrap();
        assert_eq!(cmd, Command::LIST(FileEntry::new("/srv", "docs")));
    }

    #[test]
    fn action_accepts_client_field_names() {
        let line = r#"ACTION {"action":"cut","source":{"path":"/a","name":"x"},"target":{"path":"/b","name":"x"}}"#;
        match parse_command(line, MAX).unwrap() {
            Command::ACTION(request) => {
                assert_eq!(request.kind, ActionKind::Move);
                assert_eq!(request.target, Some(FileEntry::new("/b", "x")));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn action_without_target_parses() {
        let line = r#"ACTION {"kind":"delete","source":{"path":"/a","name":"x"}}"#;
        match parse_command(line, MAX).unwrap() {
            Command::ACTION(request) => {
                assert_eq!(request.kind, ActionKind::Delete);
                assert!(request.target.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = parse_command("ACTION {not json", MAX).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::MalformedArgument { verb: "ACTION", .. }
        ));
    }

    #[test]
    fn missing_argument_is_reported() {
        assert!(matches!(
            parse_command("RETR", MAX).unwrap_err(),
            ProtocolError::MissingArgument("RETR")
        ));
    }

    #[test]
    fn unknown_verb_is_reported() {
        assert!(matches!(
            parse_command("STOR file.txt", MAX).unwrap_err(),
            ProtocolError::UnknownCommand(verb) if verb == "STOR"
        ));
    }

    #[test]
    fn overlong_line_rejected() {
        let line = format!("RETR {}", "a".repeat(100));
        assert!(matches!(
            parse_command(&line, 64).unwrap_err(),
            ProtocolError::CommandTooLong
        ));
    }
}
