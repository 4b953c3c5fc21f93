//! Server core functionality
//!
//! Owns the listener, the shared configuration and the client registry.

pub mod core;

pub use core::Server;
