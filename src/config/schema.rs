//! Configuration schema definitions.
//!
//! This module defines the server configuration structure. All types derive
//! Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind (e.g. "localhost").
    pub host: String,

    /// Port to bind (e.g. "3000").
    pub port: String,

    /// Maximum accepted size of a request head in bytes.
    pub max_header_bytes: usize,

    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,

    /// How long a keep-alive connection may sit idle, in seconds.
    pub idle_timeout_secs: u64,

    /// Deadline for reading a request head, in seconds.
    pub read_timeout_secs: u64,

    /// Deadline for producing a response, in seconds.
    pub write_timeout_secs: u64,

    /// Credential for the shutdown endpoint. A random one is generated at
    /// server construction when this is left empty.
    pub shutdown_key: String,
}

impl ServerConfig {
    /// Listen address joined from the current host and port.
    ///
    /// Derived on demand so it can never go stale when host or port change.
    pub fn listen_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: "8080".to_string(),
            max_header_bytes: 1024 * 1024,
            max_body_bytes: 2 * 1024 * 1024,
            idle_timeout_secs: 10,
            read_timeout_secs: 5,
            write_timeout_secs: 10,
            shutdown_key: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.max_header_bytes, 1024 * 1024);
        assert_eq!(config.idle_timeout_secs, 10);
        assert_eq!(config.read_timeout_secs, 5);
        assert_eq!(config.write_timeout_secs, 10);
        assert!(config.shutdown_key.is_empty());
    }

    #[test]
    fn test_listen_addr_joins_host_and_port() {
        let config = ServerConfig {
            host: "localhost".to_string(),
            port: "3000".to_string(),
            ..Default::default()
        };
        assert_eq!(config.listen_addr(), "localhost:3000");
    }

    #[test]
    fn test_listen_addr_tracks_field_changes() {
        let mut config = ServerConfig::default();
        config.host = "localhost".to_string();
        config.port = "3000".to_string();
        assert_eq!(config.listen_addr(), "localhost:3000");

        config.port = "3001".to_string();
        assert_eq!(config.listen_addr(), "localhost:3001");
    }

    #[test]
    fn test_listen_addr_brackets_ipv6_hosts() {
        let config = ServerConfig {
            host: "::1".to_string(),
            port: "3000".to_string(),
            ..Default::default()
        };
        assert_eq!(config.listen_addr(), "[::1]:3000");
    }

    #[test]
    fn test_minimal_toml_keeps_defaults() {
        let config: ServerConfig =
            toml::from_str("host = \"localhost\"\nport = \"3000\"").unwrap();
        assert_eq!(config.listen_addr(), "localhost:3000");
        assert_eq!(config.read_timeout_secs, 5);
        assert_eq!(config.max_header_bytes, 1024 * 1024);
    }
}
