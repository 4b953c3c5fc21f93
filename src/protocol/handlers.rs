//! Command handlers
//!
//! Dispatches parsed commands to the authentication layer or the file engine
//! and turns the outcome into a response line. Engine calls run on the
//! blocking thread pool.

use log::{error, info, warn};
use serde::Serialize;
use std::io;
use std::path::PathBuf;

use crate::auth;
use crate::client::Client;
use crate::config::ServerConfig;
use crate::error::handlers::{auth_error_code, file_error_code};
use crate::error::{AuthError, FileActionError};
use crate::protocol::responses::{
    FILE_STATUS_OK, GOODBYE, LOGIN_SUCCESS, OK, PASSWORD_REQUIRED, format_json_response,
    format_response,
};
use crate::protocol::{Command, CommandData, CommandResult, CommandStatus};
use crate::storage::{self, ActionRequest, ActionResult, FileEntry};
use crate::transfer;

/// Dispatches a command from an authenticated session.
///
/// Falls back to the authentication handler if the client is not (or no
/// longer) logged in.
pub async fn handle_command(
    client: &mut Client,
    command: Command,
    config: &ServerConfig,
) -> CommandResult {
    if !client.is_logged_in() {
        return handle_auth_command(client, &command, config);
    }

    let root = config.server_root_path();
    match command {
        Command::QUIT => handle_cmd_quit(client),
        Command::NOOP => handle_cmd_noop(),
        Command::USER(_) | Command::PASS(_) => handle_auth_command(client, &command, config),
        Command::LIST(directory) => handle_cmd_list(root, directory).await,
        Command::ACTION(request) => handle_cmd_action(root, request).await,
        Command::STAT(entry) => handle_cmd_stat(root, entry).await,
        Command::SPACE(path) => handle_cmd_space(root, path).await,
        Command::RETR(path) => handle_cmd_retr(root, path).await,
    }
}

/// Handles commands before login: only USER, PASS, NOOP and QUIT are served.
pub fn handle_auth_command(
    client: &mut Client,
    command: &Command,
    config: &ServerConfig,
) -> CommandResult {
    match command {
        Command::USER(username) => handle_cmd_user(client, username, config),
        Command::PASS(password) => handle_cmd_pass(client, password, config),
        Command::NOOP => handle_cmd_noop(),
        Command::QUIT => handle_cmd_quit(client),
        _ => auth_failure(&AuthError::NotLoggedIn),
    }
}

fn auth_failure(err: &AuthError) -> CommandResult {
    CommandResult::failure(
        err.to_string(),
        format_response(auth_error_code(err), &err.to_string()),
    )
}

/// Handles the QUIT command: logs out the client and signals connection close.
fn handle_cmd_quit(client: &mut Client) -> CommandResult {
    client.logout();

    CommandResult {
        status: CommandStatus::CloseConnection,
        message: Some(format_response(GOODBYE, "Goodbye")),
        data: None,
    }
}

fn handle_cmd_noop() -> CommandResult {
    CommandResult::success(format_response(OK, "NOOP ok"))
}

/// Handles the USER command: validates username and sets client state accordingly.
fn handle_cmd_user(client: &mut Client, username: &str, config: &ServerConfig) -> CommandResult {
    match auth::validate_user(username, config) {
        Ok(()) => {
            client.set_user(Some(username.to_string()));
            CommandResult::success(format_response(
                PASSWORD_REQUIRED,
                &format!("Password required for {}", username),
            ))
        }
        Err(e) => {
            warn!("Rejected username: {}", e);
            client.set_user(None);
            auth_failure(&e)
        }
    }
}

/// Handles the PASS command: validates password if username was previously validated.
fn handle_cmd_pass(client: &mut Client, password: &str, config: &ServerConfig) -> CommandResult {
    let username = match client.username() {
        Some(username) if client.is_user_valid() => username.to_string(),
        _ => return auth_failure(&AuthError::UsernameRequired),
    };

    match auth::validate_password(&username, password, config) {
        Ok(()) => {
            client.set_logged_in(true);
            info!("User {} logged in", username);
            CommandResult::success(format_response(LOGIN_SUCCESS, "Login successful"))
        }
        Err(e) => {
            warn!("Failed login: {}", e);
            client.set_logged_in(false);
            auth_failure(&e)
        }
    }
}

async fn handle_cmd_list(root: PathBuf, directory: FileEntry) -> CommandResult {
    let outcome = run_blocking(move || storage::list_directory(&root, &directory)).await;
    engine_response(outcome)
}

/// ACTION always answers 200; the payload says whether it worked.
async fn handle_cmd_action(root: PathBuf, request: ActionRequest) -> CommandResult {
    let result = run_blocking(move || Ok(storage::perform(&root, &request)))
        .await
        .unwrap_or_else(|e| ActionResult::failure(&e));

    let status = if result.is_error {
        CommandStatus::Failure(result.message.clone())
    } else {
        CommandStatus::Success
    };

    CommandResult {
        status,
        message: Some(format_json_response(OK, &result)),
        data: None,
    }
}

async fn handle_cmd_stat(root: PathBuf, entry: FileEntry) -> CommandResult {
    let outcome = run_blocking(move || storage::stat_entry(&root, &entry)).await;
    engine_response(outcome)
}

async fn handle_cmd_space(root: PathBuf, path: String) -> CommandResult {
    let outcome = run_blocking(move || storage::query_volume_space(&root, &path)).await;
    engine_response(outcome)
}

/// Handles RETR: validates the path and hands the plan to the session loop,
/// which streams the bytes right after the 150 header.
async fn handle_cmd_retr(root: PathBuf, path: String) -> CommandResult {
    match run_blocking(move || transfer::prepare_download(&root, &path)).await {
        Ok(plan) => CommandResult {
            status: CommandStatus::Success,
            message: Some(format_json_response(FILE_STATUS_OK, &plan)),
            data: Some(CommandData::Download(plan)),
        },
        Err(e) => {
            warn!("Download rejected: {}", e);
            engine_failure(&e)
        }
    }
}

fn engine_response<T: Serialize>(outcome: Result<T, FileActionError>) -> CommandResult {
    match outcome {
        Ok(payload) => CommandResult::success(format_json_response(OK, &payload)),
        Err(e) => {
            warn!("Request failed: {}", e);
            engine_failure(&e)
        }
    }
}

fn engine_failure(err: &FileActionError) -> CommandResult {
    CommandResult::failure(
        err.to_string(),
        format_json_response(file_error_code(err), &ActionResult::failure(err)),
    )
}

/// Run filesystem work off the async executor.
async fn run_blocking<T, F>(work: F) -> Result<T, FileActionError>
where
    F: FnOnce() -> Result<T, FileActionError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Blocking task failed: {}", e);
            Err(FileActionError::Io {
                path: PathBuf::new(),
                source: io::Error::other(e),
            })
        }
    }
}
