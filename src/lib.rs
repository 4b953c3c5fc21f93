//! FileHub Server
//!
//! A file action engine for a single rooted directory tree: listing, copy,
//! move, rename, delete, directory creation and streamed downloads, served
//! over a line-based TCP control protocol.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod storage;
pub mod transfer;

pub use config::ServerConfig;
pub use server::Server;
