use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use crate::client::{ClientRegistry, handle_client};
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::protocol::responses::{TOO_MANY_CONNECTIONS, format_response};

pub struct Server {
    client_registry: Arc<Mutex<ClientRegistry>>,
    listener: TcpListener,
    config: Arc<ServerConfig>,
}

impl Server {
    /// Prepares the server root and binds the control listener.
    ///
    /// The root is created if missing and stored in canonical form; request
    /// paths are compared against it lexically.
    pub async fn bind(mut config: ServerConfig) -> Result<Self, ServerError> {
        let root = config.server_root_path();
        std::fs::create_dir_all(&root)
            .map_err(|e| ServerError::ServerRoot(format!("{}: {}", root.display(), e)))?;
        let root = std::fs::canonicalize(&root)
            .map_err(|e| ServerError::ServerRoot(format!("{}: {}", root.display(), e)))?;
        config.server_root = root.to_string_lossy().to_string();
        info!("Server root directory: {}", config.server_root);

        let addr = config.control_socket();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        info!("Server bound to {}", addr);

        Ok(Self {
            client_registry: Arc::new(Mutex::new(ClientRegistry::new(config.max_clients))),
            listener,
            config: Arc::new(config),
        })
    }

    /// Address the listener actually bound, useful with port 0.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until the task is dropped.
    pub async fn start(&self) {
        info!(
            "Starting FileHub server on {} (max {} clients)",
            self.config.control_socket(),
            self.config.max_clients
        );

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let client_registry = Arc::clone(&self.client_registry);
                    let config = Arc::clone(&self.config);

                    // Spawn a task for each client so accept loop doesn't block
                    tokio::spawn(async move {
                        if let Err(e) = handle_new_client(stream, addr, client_registry, config).await
                        {
                            warn!("Failed to handle client {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }
}

/// Registers a new client, refusing it with 421 when the server is full.
async fn handle_new_client(
    mut stream: TcpStream,
    client_addr: SocketAddr,
    client_registry: Arc<Mutex<ClientRegistry>>,
    config: Arc<ServerConfig>,
) -> Result<(), ServerError> {
    {
        let mut registry = client_registry.lock().await;
        if !registry.try_register(client_addr) {
            warn!(
                "Refusing {}: {} of {} slots in use",
                client_addr,
                registry.len(),
                registry.max_clients()
            );
            drop(registry);
            stream
                .write_all(
                    format_response(TOO_MANY_CONNECTIONS, "Too many connections. Try again later.")
                        .as_bytes(),
                )
                .await?;
            stream.shutdown().await?;
            return Ok(());
        }

        info!(
            "Accepted client {} ({}/{} clients)",
            client_addr,
            registry.len(),
            registry.max_clients()
        );
    }

    handle_client(stream, client_addr, client_registry, config).await;
    Ok(())
}
