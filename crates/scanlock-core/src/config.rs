//! Configuration types for Scanlock

use serde::{Deserialize, Serialize};

/// Main configuration for Scanlock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address to bind the HTTP listener to
    pub addr: String,
    /// Server port
    pub port: u16,
    /// How long a long-poll waits for a login event, in seconds
    pub poll_timeout_secs: u64,
    /// How long a registered token stays valid without a poller, in seconds
    pub token_ttl_secs: i64,
    /// Rendered QR code edge length in pixels
    pub qr_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1".to_string(),
            port: 8080,
            poll_timeout_secs: 10,
            token_ttl_secs: 60,
            qr_size: 200,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: set bind address
    pub fn with_addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    /// Builder pattern: set port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Builder pattern: set long-poll timeout in seconds
    pub fn with_poll_timeout_secs(mut self, secs: u64) -> Self {
        self.poll_timeout_secs = secs;
        self
    }

    /// Builder pattern: set token time-to-live in seconds
    pub fn with_token_ttl_secs(mut self, secs: i64) -> Self {
        self.token_ttl_secs = secs;
        self
    }

    /// Builder pattern: set QR code size in pixels
    pub fn with_qr_size(mut self, size: u32) -> Self {
        self.qr_size = size;
        self
    }

    /// Long-poll wait bound as a [`std::time::Duration`]
    pub fn poll_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_timeout_secs)
    }

    /// Validity window for a registered token before a poller attaches
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.token_ttl_secs)
    }

    /// Socket address string for the listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}
