//! Client registry
//!
//! Tracks active connections so the server can enforce `max_clients`.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::net::SocketAddr;

/// What the registry knows about one connection
#[derive(Debug, Clone)]
pub struct ClientRecord {
    pub username: Option<String>,
    pub connected_at: DateTime<Utc>,
}

/// Registry for tracking active clients
#[derive(Debug)]
pub struct ClientRegistry {
    clients: HashMap<SocketAddr, ClientRecord>,
    max_clients: usize,
}

impl ClientRegistry {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            max_clients,
        }
    }

    /// Registers `addr` unless the registry is full.
    pub fn try_register(&mut self, addr: SocketAddr) -> bool {
        if self.clients.len() >= self.max_clients {
            return false;
        }
        self.clients.insert(
            addr,
            ClientRecord {
                username: None,
                connected_at: Utc::now(),
            },
        );
        true
    }

    pub fn set_username(&mut self, addr: &SocketAddr, username: Option<String>) {
        if let Some(record) = self.clients.get_mut(addr) {
            record.username = username;
        }
    }

    pub fn remove(&mut self, addr: &SocketAddr) -> Option<ClientRecord> {
        self.clients.remove(addr)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn max_clients(&self) -> usize {
        self.max_clients
    }
}
