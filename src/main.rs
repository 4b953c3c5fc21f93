//! FileHub Server - Entry Point

use log::{error, info};
use std::process::ExitCode;

use filehub_server::{Server, ServerConfig};

#[tokio::main]
async fn main() -> ExitCode {
    // RUST_LOG overrides the default level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Launching FileHub server...");

    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if config.users.is_empty() {
        error!("No users configured; every login will be refused");
    }

    match Server::bind(config).await {
        Ok(server) => {
            server.start().await;
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Server startup failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
