//! Configuration management for the file server
//!
//! Settings come from `config.toml` layered with `FILEHUB_*` environment
//! overrides. Everything here is read once at startup.

use config::{Config, Environment, File};
use log::warn;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Locations searched for `config.toml`, first match wins.
const CONFIG_PATHS: [&str; 2] = [
    "config",                // Local development: ./config.toml
    "filehub-server/config", // Container layout: /app/filehub-server/config.toml
];

/// Upper bound for `max_command_length` (1 MiB)
const MAX_COMMAND_LENGTH_LIMIT: usize = 1024 * 1024;

/// Complete server configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    // ═══ NETWORK (Environment Override Supported) ═══
    /// IP address to bind the control listener
    pub bind_address: String,

    /// Port for the control listener
    pub control_port: u16,

    /// Root directory every request path must stay inside
    pub server_root: String,

    // ═══ LIMITS ═══
    /// Maximum concurrent sessions
    pub max_clients: usize,

    /// Maximum request line length in bytes
    pub max_command_length: usize,

    pub max_username_length: usize,

    /// Chunk size used when streaming downloads
    pub buffer_size: usize,

    // ═══ AUTHENTICATION (TOML Only) ═══
    /// username -> password
    pub users: HashMap<String, String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            control_port: 2121,
            server_root: "./server_root".to_string(),
            max_clients: 10,
            max_command_length: 4096,
            max_username_length: 32,
            buffer_size: 8192,
            users: HashMap::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from config.toml with environment overrides.
    ///
    /// A missing file is not an error: defaults plus environment are used.
    pub fn load() -> Result<Self, config::ConfigError> {
        for config_path in CONFIG_PATHS {
            match Self::load_from(config_path) {
                Ok(config) => return Ok(config),
                Err(config::ConfigError::NotFound(_)) => continue,
                Err(config::ConfigError::Foreign(e)) => {
                    // File source reports a missing file as a foreign io error
                    warn!("Skipping config at {config_path}: {e}");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        warn!("No config.toml found (tried {CONFIG_PATHS:?}), using defaults");
        let settings = Config::builder()
            .add_source(Self::environment())
            .build()?;
        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific file (extension optional) plus environment.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(config_path))
            .add_source(Self::environment())
            .build()?;
        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn environment() -> Environment {
        Environment::with_prefix("FILEHUB").try_parsing(true)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.control_port == 0 {
            return Err(config::ConfigError::Message(
                "control_port cannot be 0".into(),
            ));
        }

        if self.server_root.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "server_root cannot be empty".into(),
            ));
        }

        if self.max_clients == 0 {
            return Err(config::ConfigError::Message(
                "max_clients must be greater than 0".into(),
            ));
        }

        if self.buffer_size == 0 {
            return Err(config::ConfigError::Message(
                "buffer_size must be greater than 0".into(),
            ));
        }

        if !(64..=MAX_COMMAND_LENGTH_LIMIT).contains(&self.max_command_length) {
            return Err(config::ConfigError::Message(format!(
                "max_command_length must be between 64 and {MAX_COMMAND_LENGTH_LIMIT}"
            )));
        }

        Ok(())
    }

    /// Bind address and control port as a socket address string
    pub fn control_socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.control_port)
    }

    /// Server root as PathBuf
    pub fn server_root_path(&self) -> PathBuf {
        PathBuf::from(&self.server_root)
    }
}
