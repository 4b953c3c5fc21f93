use chrono::Utc;
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;

use crate::client::{Client, ClientRegistry};
use crate::config::ServerConfig;
use crate::error::handlers::protocol_error_code;
use crate::error::{ProtocolError, ServerError};
use crate::protocol::responses::{READY, format_response};
use crate::protocol::{CommandData, CommandStatus, handle_command, parse_command};
use crate::transfer::stream_download;

/// Handles one client session on the Tokio runtime.
///
/// - Greets, then reads one command line at a time.
/// - Dispatches commands using `handle_command`.
/// - Streams downloads inline on the same connection.
/// - Removes the client from `registry` when the session ends, however it ends.
pub async fn handle_client(
    stream: TcpStream,
    client_addr: SocketAddr,
    registry: Arc<Mutex<ClientRegistry>>,
    config: Arc<ServerConfig>,
) {
    if let Err(e) = run_session(stream, client_addr, &registry, &config).await {
        warn!("Session with {} ended with error: {}", client_addr, e);
    }

    let mut registry_guard = registry.lock().await;
    let record = registry_guard.remove(&client_addr);
    let user = record
        .as_ref()
        .and_then(|r| r.username.as_deref())
        .unwrap_or("anonymous");
    let connected_for = record
        .as_ref()
        .map(|r| (Utc::now() - r.connected_at).num_seconds())
        .unwrap_or_default();
    info!(
        "Client {} ({}) disconnected after {}s ({}/{} clients)",
        client_addr,
        user,
        connected_for,
        registry_guard.len(),
        registry_guard.max_clients()
    );
}

async fn run_session(
    stream: TcpStream,
    client_addr: SocketAddr,
    registry: &Mutex<ClientRegistry>,
    config: &ServerConfig,
) -> Result<(), ServerError> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();
    let mut client = Client::default();

    write_half
        .write_all(format_response(READY, "Welcome to FileHub Server").as_bytes())
        .await?;
    write_half.flush().await?;

    // Room for the longest allowed command plus CRLF
    let line_limit = config.max_command_length.saturating_add(2) as u64;

    loop {
        line.clear();
        let n = (&mut reader).take(line_limit).read_line(&mut line).await?;
        if n == 0 {
            info!("Connection closed by client {}", client_addr);
            return Ok(());
        }

        if !line.ends_with('\n') && n as u64 >= line_limit {
            // The rest of the line is still in flight; no way to resync
            let err = ProtocolError::CommandTooLong;
            warn!("Closing {}: {}", client_addr, err);
            send(&mut write_half, &format_response(protocol_error_code(&err), &err.to_string()))
                .await?;
            return Ok(());
        }

        let trimmed = line.trim_end_matches(['\r', '\n']);
        let command = match parse_command(trimmed, config.max_command_length) {
            Ok(command) => command,
            Err(e) => {
                debug!("Bad request from {}: {}", client_addr, e);
                send(&mut write_half, &format_response(protocol_error_code(&e), &e.to_string()))
                    .await?;
                continue;
            }
        };
        info!("Received from {}: {:?}", client_addr, command);

        let was_logged_in = client.is_logged_in();
        let result = handle_command(&mut client, command, config).await;

        if client.is_logged_in() && !was_logged_in {
            let username = client.username().map(str::to_string);
            registry.lock().await.set_username(&client_addr, username);
        }

        if let Some(msg) = &result.message {
            send(&mut write_half, msg).await?;
        }

        match result.status {
            CommandStatus::CloseConnection => {
                info!("Client {} requested to quit", client_addr);
                return Ok(());
            }
            CommandStatus::Failure(reason) => {
                debug!("Command from {} failed: {}", client_addr, reason);
            }
            CommandStatus::Success => {}
        }

        if let Some(CommandData::Download(plan)) = result.data {
            if let Err(e) = stream_download(&mut write_half, &plan, config.buffer_size).await {
                // The byte count is already promised; the connection can't be reused
                error!(
                    "Download of {} to {} aborted: {}",
                    plan.file_path.display(),
                    client_addr,
                    e
                );
                return Err(e.into());
            }
        }
    }
}

async fn send(writer: &mut OwnedWriteHalf, msg: &str) -> Result<(), ServerError> {
    writer.write_all(msg.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
