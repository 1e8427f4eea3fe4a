//! Server configuration

use super::extensions::BIG_REQUESTS_MAX_LENGTH;
use crate::error::ConfigError;
use crate::protocol::DEFAULT_MAX_REQUEST_LENGTH;

/// TCP port of display 0
pub const X_TCP_PORT: u16 = 6000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub display: u16,
    pub listen_address: String,
    pub port_base: u16,
    /// Reply writers kept for reuse between requests
    pub max_idle_writers: usize,
    /// Initial capacity of a reply writer, in bytes
    pub writer_capacity: usize,
    pub vendor: String,
    pub release_number: u32,
    /// Offer BIG-REQUESTS to clients
    pub big_requests: bool,
    /// Limit published by BigReqEnable, in 4-byte units
    pub big_request_length: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            display: 0,
            listen_address: "0.0.0.0".to_string(),
            port_base: X_TCP_PORT,
            max_idle_writers: 64,
            writer_capacity: 4096,
            vendor: "xwire".to_string(),
            release_number: 1,
            big_requests: true,
            big_request_length: BIG_REQUESTS_MAX_LENGTH,
        }
    }
}

impl ServerConfig {
    /// TCP port for the configured display
    pub fn port(&self) -> Option<u16> {
        self.port_base.checked_add(self.display)
    }

    pub fn bind_address(&self) -> Result<String, ConfigError> {
        let port = self.port().ok_or_else(|| {
            ConfigError::Invalid(format!(
                "display {} overflows port base {}",
                self.display, self.port_base
            ))
        })?;
        Ok(format!("{}:{}", self.listen_address, port))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_idle_writers == 0 {
            return Err(ConfigError::Invalid("writer pool size must be positive".into()));
        }
        if self.writer_capacity == 0 {
            return Err(ConfigError::Invalid("writer capacity must be positive".into()));
        }
        if self.big_request_length < DEFAULT_MAX_REQUEST_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "big request length {} is below the core limit {}",
                self.big_request_length, DEFAULT_MAX_REQUEST_LENGTH
            )));
        }
        if self.vendor.len() > u16::MAX as usize {
            return Err(ConfigError::Invalid("vendor string too long".into()));
        }
        self.bind_address().map(|_| ())
    }
}
